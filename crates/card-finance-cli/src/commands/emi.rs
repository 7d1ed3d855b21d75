use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use card_finance_core::emi::amortization::{self, EmiQuote, EmiQuoteInput};
use card_finance_core::emi::offers::{self, EmiOffer};
use card_finance_core::with_metadata;

use crate::input;

/// Arguments for an EMI quote or schedule
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct EmiQuoteArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount to convert
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (14 for 14%)
    #[arg(long, alias = "rate")]
    pub annual_rate_pct: Option<Decimal>,

    /// Tenure in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,

    /// Processing fee in percent of principal
    #[arg(long, alias = "fee")]
    pub processing_fee_pct: Option<Decimal>,
}

/// Arguments for comparing the offer catalog
#[derive(Args)]
pub struct EmiOffersArgs {
    /// Amount to convert
    #[arg(long)]
    pub principal: Decimal,

    /// Only show offers for this tenure (all offers when none match)
    #[arg(long)]
    pub tenure: Option<u32>,
}

#[derive(Serialize)]
struct OfferQuote {
    offer: EmiOffer,
    quote: EmiQuote,
}

fn quote_input(args: EmiQuoteArgs) -> Result<EmiQuoteInput, Box<dyn std::error::Error>> {
    if let Some(req) = input::read_request(args.input.as_deref())? {
        return Ok(req);
    }
    Ok(EmiQuoteInput {
        principal: args
            .principal
            .ok_or("--principal is required (or provide --input)")?,
        annual_rate_pct: args
            .annual_rate_pct
            .ok_or("--annual-rate-pct is required (or provide --input)")?,
        term_months: args
            .term_months
            .ok_or("--term-months is required (or provide --input)")?,
        processing_fee_pct: args.processing_fee_pct.unwrap_or(Decimal::ZERO),
    })
}

pub fn run_quote(args: EmiQuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req = quote_input(args)?;
    let result = amortization::quote_emi(&req)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: EmiQuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req = quote_input(args)?;
    let result = amortization::build_schedule(&req)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_offers(args: EmiOffersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    if args.principal <= Decimal::ZERO {
        return Err("--principal must be positive".into());
    }

    let catalog = offers::default_catalog();
    let candidates = match args.tenure {
        Some(t) => offers::offers_for_tenure(&catalog, t),
        None => catalog,
    };
    let mut warnings = Vec::new();
    if let Some(t) = args.tenure {
        if candidates.iter().all(|o| o.tenure_months != t) {
            warnings.push(format!("No offer for {t} months; showing the full catalog"));
        }
    }

    let rows: Vec<OfferQuote> = candidates
        .into_iter()
        .map(|offer| {
            let tenure = args.tenure.unwrap_or(offer.tenure_months);
            let quote = offer.quote(args.principal, tenure);
            OfferQuote { offer, quote }
        })
        .collect();

    let output = with_metadata(
        "Lender catalog quoted through the reducing-balance annuity",
        &serde_json::json!({
            "principal": args.principal.to_string(),
            "tenure": args.tenure,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        rows,
    );
    Ok(serde_json::to_value(output)?)
}
