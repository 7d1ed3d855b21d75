use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// All monetary values, in whole currency units. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates and percentages. Annual interest is carried as a percentage (14.0 = 14%).
pub type Rate = Decimal;

/// Round to the nearest whole currency unit, halves away from zero.
pub fn round_currency(value: Money) -> Money {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Progress-bar percentage: round(used / limit * 100) clamped to [0, 100].
/// A non-positive limit yields 0.
pub fn progress_pct(used: Money, limit: Money) -> Decimal {
    if limit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_currency(used / limit * dec!(100)).clamp(Decimal::ZERO, dec!(100))
}

/// Parse a display label such as "₹48,500" into raw currency units.
///
/// Every character other than ASCII digits and the first decimal point is
/// stripped. Labels with no digits parse as zero.
pub fn parse_amount_label(label: &str) -> Money {
    let mut cleaned = String::with_capacity(label.len());
    let mut seen_point = false;
    for ch in label.chars() {
        if ch.is_ascii_digit() {
            cleaned.push(ch);
        } else if ch == '.' && !seen_point {
            seen_point = true;
            cleaned.push(ch);
        }
    }
    let digits = cleaned.trim_end_matches('.');
    if digits.trim_matches('.').is_empty() {
        return Decimal::ZERO;
    }
    let normalised = if digits.starts_with('.') {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    Decimal::from_str(&normalised).unwrap_or(Decimal::ZERO)
}

/// Render a whole-unit amount as a rupee label with thousands separators ("₹12,500").
pub fn format_amount_label(amount: Money) -> String {
    let rounded = round_currency(amount);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

// ---------------------------------------------------------------------------
// Boundary snapshots (read-only copies of caller-owned records)
// ---------------------------------------------------------------------------

/// A card as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outstanding_label: Option<String>,
}

impl CardSnapshot {
    /// Outstanding balance in currency units; a missing label counts as zero.
    pub fn outstanding(&self) -> Money {
        self.outstanding_label
            .as_deref()
            .map(parse_amount_label)
            .unwrap_or(Decimal::ZERO)
    }
}

/// An upcoming bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSnapshot {
    pub id: String,
    pub title: String,
    pub amount_label: String,
    pub due_date: NaiveDate,
}

impl BillSnapshot {
    pub fn amount(&self) -> Money {
        parse_amount_label(&self.amount_label)
    }
}

/// A posted card transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Card the transaction was made on
    pub owner_id: String,
    pub merchant: String,
    pub category: String,
    pub amount: Money,
    pub date: NaiveDate,
}

/// Simulated, non-binding effect of acting on a suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionImpact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_delta: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months_delta: Option<i32>,
    /// Projected change in credit utilisation, in percentage points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_delta_pct: Option<Rate>,
}

impl SuggestionImpact {
    pub fn balance(delta: Money) -> Self {
        Self {
            balance_delta: Some(delta),
            ..Self::default()
        }
    }

    /// True when applying the impact cannot move a balance or a term.
    pub fn is_neutral(&self) -> bool {
        self.balance_delta.unwrap_or(Decimal::ZERO).is_zero() && self.months_delta.unwrap_or(0) == 0
    }
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_currency_half_up() {
        assert_eq!(round_currency(dec!(1077.5)), dec!(1078));
        assert_eq!(round_currency(dec!(1077.49)), dec!(1077));
        assert_eq!(round_currency(dec!(2.5)), dec!(3));
    }

    #[test]
    fn test_parse_rupee_label() {
        assert_eq!(parse_amount_label("₹48,500"), dec!(48500));
        assert_eq!(parse_amount_label("₹ 1,299.50"), dec!(1299.50));
        assert_eq!(parse_amount_label("n/a"), Decimal::ZERO);
        assert_eq!(parse_amount_label(""), Decimal::ZERO);
    }

    #[test]
    fn test_format_amount_label() {
        assert_eq!(format_amount_label(dec!(48500)), "₹48,500");
        assert_eq!(format_amount_label(dec!(999)), "₹999");
        assert_eq!(format_amount_label(dec!(1234567)), "₹1,234,567");
        assert_eq!(format_amount_label(dec!(-2000)), "-₹2,000");
    }

    #[test]
    fn test_progress_pct_clamped() {
        assert_eq!(progress_pct(dec!(1500), dec!(3000)), dec!(50));
        assert_eq!(progress_pct(dec!(4500), dec!(3000)), dec!(100));
        assert_eq!(progress_pct(dec!(10), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_card_without_label_has_zero_outstanding() {
        let card = CardSnapshot {
            id: "card-1".into(),
            title: "Millennia".into(),
            outstanding_label: None,
        };
        assert_eq!(card.outstanding(), Decimal::ZERO);
    }
}
