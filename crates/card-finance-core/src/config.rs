//! Policy constants for the engine, grouped so a host can override them from a
//! configuration file. Every field has a default; a partial file only replaces
//! the values it names.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Money, Rate};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub prepayment: PrepaymentConfig,
    pub budget: BudgetConfig,
    pub suggestions: SuggestionConfig,
    pub spending: SpendingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepaymentConfig {
    /// Smallest prepayment accepted, in currency units
    pub min_amount: Money,
}

impl Default for PrepaymentConfig {
    fn default() -> Self {
        Self {
            min_amount: dec!(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Quiet period before a pending limit is committed
    pub quiet_window_ms: u64,
    pub step: Money,
    pub floor: Money,
    pub preset_low: Decimal,
    pub preset_medium: Decimal,
    pub preset_high: Decimal,
}

impl BudgetConfig {
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: 700,
            step: dec!(500),
            floor: dec!(500),
            preset_low: dec!(0.75),
            preset_medium: dec!(1.0),
            preset_high: dec!(1.6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub high_outstanding_threshold: Money,
    /// Share of outstanding shown as the convert-to-EMI impact
    pub emi_balance_share: Rate,
    pub top_category_threshold: Money,
    pub autopay_balance_share: Rate,
    /// Lump sum offered by the per-plan suggestion
    pub lump_sum_amount: Money,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            high_outstanding_threshold: dec!(20000),
            emi_balance_share: dec!(0.15),
            top_category_threshold: dec!(2000),
            autopay_balance_share: dec!(0.02),
            lump_sum_amount: dec!(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingConfig {
    pub top_merchants: usize,
}

impl Default for SpendingConfig {
    fn default() -> Self {
        Self { top_merchants: 6 }
    }
}
