use log::warn;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CardFinanceError;
use crate::types::*;
use crate::CardFinanceResult;

/// Longest tenure the validating entry points accept.
pub const MAX_TERM_MONTHS: u32 = 360;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmiQuoteInput {
    pub principal: Money,
    /// Annual interest rate as a percentage (14.0 for 14%)
    pub annual_rate_pct: Rate,
    pub term_months: u32,
    #[serde(default)]
    pub processing_fee_pct: Rate,
}

/// Projection of converting a principal into equal monthly installments.
///
/// With a non-zero rate `monthly_installment` is already rounded to a whole
/// unit. With a zero rate it is the exact even split; totals are always
/// derived from the rounded installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiQuote {
    pub principal: Money,
    pub term_months: u32,
    pub monthly_installment: Money,
    pub total_payable: Money,
    pub total_interest_and_fees: Money,
    pub processing_fee: Money,
}

impl EmiQuote {
    /// Quote returned for an unusable term: nothing payable.
    pub fn zero(principal: Money) -> Self {
        EmiQuote {
            principal,
            term_months: 0,
            monthly_installment: Decimal::ZERO,
            total_payable: Decimal::ZERO,
            total_interest_and_fees: Decimal::ZERO,
            processing_fee: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub opening_balance: Money,
    pub installment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub quote: EmiQuote,
    pub rows: Vec<AmortizationRow>,
    pub total_interest: Money,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

fn monthly_rate(annual_rate_pct: Rate) -> Rate {
    annual_rate_pct / dec!(12) / dec!(100)
}

/// Installment, processing fee and total payable, or `None` when any step
/// leaves the representable range.
fn annuity_terms(
    principal: Money,
    r: Rate,
    term_months: u32,
    processing_fee_pct: Rate,
) -> Option<(Money, Money, Money)> {
    let n = Decimal::from(term_months);
    let installment = if r.is_zero() {
        principal.checked_div(n)?
    } else {
        let growth = (Decimal::ONE + r).checked_powu(u64::from(term_months))?;
        let factor = growth.checked_div(growth - Decimal::ONE)?;
        round_currency(principal.checked_mul(r)?.checked_mul(factor)?)
    };
    let processing_fee = round_currency((processing_fee_pct / dec!(100)).checked_mul(principal)?);
    let total_payable = round_currency(installment)
        .checked_mul(n)?
        .checked_add(processing_fee)?;
    Some((installment, processing_fee, total_payable))
}

/// Reducing-balance annuity installment and cost breakdown.
///
/// EMI = P * r * (1 + r)^n / ((1 + r)^n - 1), r = annual% / 12 / 100.
/// Inputs are assumed sanitised; a zero term yields [`EmiQuote::zero`].
pub fn compute_installment(
    principal: Money,
    annual_rate_pct: Rate,
    term_months: u32,
    processing_fee_pct: Rate,
) -> EmiQuote {
    if term_months == 0 {
        warn!("zero-term EMI quote requested for principal {principal}; returning zero quote");
        return EmiQuote::zero(principal);
    }

    let r = monthly_rate(annual_rate_pct);
    let Some((installment, processing_fee, total_payable)) =
        annuity_terms(principal, r, term_months, processing_fee_pct)
    else {
        warn!(
            "EMI arithmetic overflowed for {principal} over {term_months} months at {annual_rate_pct}%; \
             returning zero quote"
        );
        return EmiQuote::zero(principal);
    };

    EmiQuote {
        principal,
        term_months,
        monthly_installment: installment,
        total_payable,
        total_interest_and_fees: total_payable - principal,
        processing_fee,
    }
}

/// Month-by-month split of each installment into interest and principal.
///
/// Uses the rounded installment; the final month absorbs any residual so the
/// balance closes at exactly zero.
pub fn amortization_rows(principal: Money, annual_rate_pct: Rate, term_months: u32) -> Vec<AmortizationRow> {
    let quote = compute_installment(principal, annual_rate_pct, term_months, Decimal::ZERO);
    if quote.term_months == 0 || principal <= Decimal::ZERO {
        return Vec::new();
    }

    let r = monthly_rate(annual_rate_pct);
    let installment = round_currency(quote.monthly_installment);
    let mut balance = principal;
    let mut rows = Vec::with_capacity(term_months as usize);

    for month in 1..=term_months {
        let opening = balance;
        let interest = (opening * r).round_dp(2);
        let principal_part = if month == term_months {
            opening
        } else {
            (installment - interest).clamp(Decimal::ZERO, opening)
        };
        balance = opening - principal_part;

        rows.push(AmortizationRow {
            month,
            opening_balance: opening,
            installment: principal_part + interest,
            interest,
            principal: principal_part,
            closing_balance: balance,
        });
    }

    rows
}

// ---------------------------------------------------------------------------
// Validating entry points
// ---------------------------------------------------------------------------

fn validate(input: &EmiQuoteInput, warnings: &mut Vec<String>) -> CardFinanceResult<()> {
    if input.principal < Decimal::ZERO {
        return Err(CardFinanceError::InvalidInput {
            field: "principal".into(),
            reason: "Principal cannot be negative".into(),
        });
    }
    if input.annual_rate_pct < Decimal::ZERO {
        return Err(CardFinanceError::InvalidInput {
            field: "annual_rate_pct".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    if input.processing_fee_pct < Decimal::ZERO {
        return Err(CardFinanceError::InvalidInput {
            field: "processing_fee_pct".into(),
            reason: "Processing fee cannot be negative".into(),
        });
    }
    if input.term_months > MAX_TERM_MONTHS {
        return Err(CardFinanceError::InvalidInput {
            field: "term_months".into(),
            reason: format!("Tenure cannot exceed {MAX_TERM_MONTHS} months"),
        });
    }
    if input.term_months == 0 {
        warnings.push("Tenure is zero; returning a zero quote".into());
    }
    Ok(())
}

/// Quote an EMI conversion, wrapped in the computation envelope.
pub fn quote_emi(input: &EmiQuoteInput) -> CardFinanceResult<ComputationOutput<EmiQuote>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input, &mut warnings)?;

    let quote = compute_installment(
        input.principal,
        input.annual_rate_pct,
        input.term_months,
        input.processing_fee_pct,
    );
    if quote.term_months == 0 && input.term_months > 0 {
        warnings.push("Quote exceeds representable amounts; returning a zero quote".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reducing-balance annuity EMI (installment rounded to whole units)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate_pct": input.annual_rate_pct.to_string(),
            "term_months": input.term_months,
            "processing_fee_pct": input.processing_fee_pct.to_string(),
        }),
        warnings,
        elapsed,
        quote,
    ))
}

/// Full amortization schedule for an EMI conversion.
pub fn build_schedule(input: &EmiQuoteInput) -> CardFinanceResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input, &mut warnings)?;

    let quote = compute_installment(
        input.principal,
        input.annual_rate_pct,
        input.term_months,
        input.processing_fee_pct,
    );
    if quote.term_months == 0 && input.term_months > 0 {
        warnings.push("Quote exceeds representable amounts; returning a zero quote".into());
    }
    let rows = amortization_rows(input.principal, input.annual_rate_pct, input.term_months);
    let total_interest = rows.iter().map(|r| r.interest).sum();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "EMI amortization schedule",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate_pct": input.annual_rate_pct.to_string(),
            "term_months": input.term_months,
        }),
        warnings,
        elapsed,
        AmortizationSchedule {
            quote,
            rows,
            total_interest,
        },
    ))
}
