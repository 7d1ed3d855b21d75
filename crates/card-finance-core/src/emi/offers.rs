use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::amortization::{compute_installment, EmiQuote};
use crate::types::{Money, Rate};

/// A lender's EMI conversion offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiOffer {
    pub id: String,
    pub lender: String,
    pub tenure_months: u32,
    pub annual_rate_pct: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_fee_pct: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EmiOffer {
    /// Project a principal through this offer's rate and fee over `tenure_months`.
    pub fn quote(&self, principal: Money, tenure_months: u32) -> EmiQuote {
        compute_installment(
            principal,
            self.annual_rate_pct,
            tenure_months,
            self.processing_fee_pct.unwrap_or(Decimal::ZERO),
        )
    }
}

fn offer(id: &str, lender: &str, tenure: u32, rate: Rate, fee: Rate, description: &str) -> EmiOffer {
    EmiOffer {
        id: id.into(),
        lender: lender.into(),
        tenure_months: tenure,
        annual_rate_pct: rate,
        processing_fee_pct: Some(fee),
        description: Some(description.into()),
    }
}

/// The three standard offers shown on the conversion screen.
pub fn default_catalog() -> Vec<EmiOffer> {
    vec![
        offer("plan-1", "FastBank", 6, dec!(12.5), dec!(1.0), "Low-rate short tenure"),
        offer("plan-2", "FlexiFinance", 12, dec!(14.0), dec!(0.75), "Balanced tenure"),
        offer("plan-3", "NoHassle", 24, dec!(16.5), dec!(0.5), "Longer tenure, lower fee"),
    ]
}

/// Offers whose tenure matches exactly, or the whole catalog when none do.
pub fn offers_for_tenure(catalog: &[EmiOffer], tenure_months: u32) -> Vec<EmiOffer> {
    let exact: Vec<EmiOffer> = catalog
        .iter()
        .filter(|o| o.tenure_months == tenure_months)
        .cloned()
        .collect();
    if exact.is_empty() {
        catalog.to_vec()
    } else {
        exact
    }
}

pub fn find_offer<'a>(catalog: &'a [EmiOffer], offer_id: &str) -> Option<&'a EmiOffer> {
    catalog.iter().find(|o| o.id == offer_id)
}
