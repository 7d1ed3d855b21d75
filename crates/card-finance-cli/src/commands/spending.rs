use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::Value;

use card_finance_core::repository::{AccountRepository, InMemoryRepository};
use card_finance_core::spending::aggregation::{self, SpendFilter, SpendInput, SpendRange};
use card_finance_core::{EngineConfig, Transaction};

use crate::input;

/// Arguments for spend aggregation
#[derive(Args)]
pub struct SpendArgs {
    /// Path to a JSON SpendInput (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON file with a transaction array or a full dataset
    #[arg(long)]
    pub transactions: Option<String>,

    /// Window: 30d, 90d or 6m
    #[arg(long, default_value = "30d")]
    pub range: SpendRange,

    /// Reference date (defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Only transactions in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only transactions at this merchant
    #[arg(long)]
    pub merchant: Option<String>,

    /// Restrict to one card
    #[arg(long)]
    pub card: Option<String>,
}

/// A bare array of transactions or a dataset object holding one.
fn load_transactions(path: &str, card: Option<&str>) -> Result<Vec<Transaction>, Box<dyn std::error::Error>> {
    let raw: Value = input::file::read_json(path)?;
    let repo = if raw.is_array() {
        InMemoryRepository::new(Vec::new(), Vec::new(), serde_json::from_value(raw)?)
    } else {
        serde_json::from_value::<InMemoryRepository>(raw)?
    };
    Ok(match card {
        Some(id) => repo.transactions_for(id),
        None => repo.transactions(),
    })
}

pub fn run_spend(args: SpendArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let spend_input: SpendInput = if let Some(ref path) = args.transactions {
        SpendInput {
            transactions: load_transactions(path, args.card.as_deref())?,
            range: args.range,
            reference_date: args.as_of.unwrap_or_else(|| Local::now().date_naive()),
            filter: SpendFilter {
                category: args.category,
                merchant: args.merchant,
            },
        }
    } else if let Some(req) = input::read_request(args.input.as_deref())? {
        req
    } else {
        return Err("--transactions or --input is required".into());
    };

    let result = aggregation::aggregate_spending_with(&config.spending, &spend_input)?;
    Ok(serde_json::to_value(result)?)
}
