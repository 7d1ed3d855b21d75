use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::plans::InstallmentPlan;
use crate::config::PrepaymentConfig;
use crate::error::CardFinanceError;
use crate::types::{round_currency, Money};
use crate::CardFinanceResult;

/// Bounds on out-of-schedule payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentPolicy {
    pub min_amount: Money,
}

impl Default for PrepaymentPolicy {
    fn default() -> Self {
        Self::from(&PrepaymentConfig::default())
    }
}

impl From<&PrepaymentConfig> for PrepaymentPolicy {
    fn from(cfg: &PrepaymentConfig) -> Self {
        Self {
            min_amount: cfg.min_amount,
        }
    }
}

impl PrepaymentPolicy {
    /// Inclusive bounds for a prepayment against `plan`.
    ///
    /// When less than the minimum remains, the only acceptable amount is the
    /// remaining balance itself.
    pub fn bounds(&self, plan: &InstallmentPlan) -> (Money, Money) {
        (self.min_amount.min(plan.remaining), plan.remaining)
    }

    /// Strict check applied before any mutation.
    pub fn validate(&self, amount: Money, plan: &InstallmentPlan) -> CardFinanceResult<()> {
        let (min, max) = self.bounds(plan);
        if amount <= Decimal::ZERO || amount < min || amount > max {
            return Err(CardFinanceError::OutOfRange {
                field: "prepayment_amount".into(),
                value: amount,
                min,
                max,
            });
        }
        Ok(())
    }

    /// The prepay drawer's confirm step: reject below the minimum, otherwise
    /// round to whole units and cap at the remaining balance.
    pub fn clamp(&self, amount: Money, plan: &InstallmentPlan) -> CardFinanceResult<Money> {
        if amount < self.min_amount {
            return Err(CardFinanceError::OutOfRange {
                field: "prepayment_amount".into(),
                value: amount,
                min: self.min_amount,
                max: plan.remaining,
            });
        }
        Ok(round_currency(amount).min(plan.remaining))
    }

    /// Amount pre-filled when the drawer opens: one installment, capped at remaining.
    pub fn default_amount(&self, plan: &InstallmentPlan) -> Money {
        plan.monthly_installment.min(plan.remaining)
    }

    /// The "pay two installments" shortcut.
    pub fn double_installment(&self, plan: &InstallmentPlan) -> Money {
        (plan.monthly_installment * dec!(2)).min(plan.remaining)
    }
}
