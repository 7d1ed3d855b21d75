use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use card_finance_core::insights::suggestions::{self, InsightInput, TopCategory};
use card_finance_core::repository::InMemoryRepository;
use card_finance_core::EngineConfig;

use crate::input;

/// Arguments for dashboard suggestions
#[derive(Args)]
pub struct SuggestionsArgs {
    /// Path to a JSON InsightInput (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON dataset of cards, bills and transactions
    #[arg(long)]
    pub dataset: Option<String>,

    /// Total outstanding across cards
    #[arg(long)]
    pub outstanding: Option<Decimal>,

    /// Highest-spend category
    #[arg(long)]
    pub top_category: Option<String>,

    /// Spend in the top category
    #[arg(long)]
    pub top_amount: Option<Decimal>,

    /// Number of upcoming bills
    #[arg(long, default_value_t = 0)]
    pub bills: usize,

    /// Installment to quote in the EMI rationale
    #[arg(long)]
    pub installment: Option<Decimal>,
}

pub fn run_suggestions(args: SuggestionsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let insight_input: InsightInput = if let Some(ref path) = args.dataset {
        let repo: InMemoryRepository = input::file::read_json(path)?;
        InsightInput {
            monthly_installment: args.installment,
            ..InsightInput::from_repository(&repo)
        }
    } else if let Some(req) = input::read_request(args.input.as_deref())? {
        req
    } else {
        let top_category = match (args.top_category, args.top_amount) {
            (Some(category), Some(amount)) => Some(TopCategory { category, amount }),
            (None, None) => None,
            _ => return Err("--top-category and --top-amount must be given together".into()),
        };
        InsightInput {
            total_outstanding: args
                .outstanding
                .ok_or("--outstanding is required (or provide --input / --dataset)")?,
            top_category,
            bill_count: args.bills,
            monthly_installment: args.installment,
        }
    };

    let result = suggestions::generate_insights_with(&config.suggestions, &insight_input)?;
    Ok(serde_json::to_value(result)?)
}
