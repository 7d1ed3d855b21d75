use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

use card_finance_core::budget::simulation::{self, BudgetScript};
use card_finance_core::budget::tracker::{self, default_limits, BudgetInput};
use card_finance_core::EngineConfig;

use crate::input;

/// Arguments for budget usage
#[derive(Args)]
pub struct BudgetArgs {
    /// Path to a JSON BudgetInput (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Committed limit, CATEGORY=VALUE (repeatable; defaults to the standard set)
    #[arg(long = "limit", value_parser = parse_category_amount)]
    pub limits: Vec<(String, Decimal)>,

    /// In-progress limit edit, CATEGORY=VALUE (repeatable)
    #[arg(long = "pending", value_parser = parse_category_amount)]
    pub pending: Vec<(String, Decimal)>,

    /// Spend so far, CATEGORY=VALUE (repeatable)
    #[arg(long = "spent", value_parser = parse_category_amount)]
    pub spent: Vec<(String, Decimal)>,
}

/// Arguments for replaying budget edits
#[derive(Args)]
pub struct BudgetSimArgs {
    /// Path to a JSON BudgetScript (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Stop the clock at this many milliseconds
    #[arg(long)]
    pub until_ms: Option<u64>,
}

/// Parse "Food=3000" into a category and amount.
fn parse_category_amount(raw: &str) -> Result<(String, Decimal), String> {
    let (category, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=VALUE, got '{raw}'"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("missing category in '{raw}'"));
    }
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount in '{raw}': {e}"))?;
    Ok((category.to_string(), amount))
}

pub fn run_budget(args: BudgetArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let budget_input: BudgetInput = if let Some(req) = input::read_request(args.input.as_deref())? {
        req
    } else {
        let limits: BTreeMap<String, Decimal> = if args.limits.is_empty() {
            default_limits()
        } else {
            args.limits.into_iter().collect()
        };
        BudgetInput {
            limits,
            pending: (!args.pending.is_empty()).then(|| args.pending.into_iter().collect()),
            spent: args.spent.into_iter().collect(),
        }
    };

    let result = tracker::evaluate_budgets_with(&config.budget, &budget_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_budget_sim(args: BudgetSimArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut script: BudgetScript = input::read_request(args.input.as_deref())?
        .ok_or("--input is required (or pipe a script on stdin)")?;
    if args.until_ms.is_some() {
        script.until_ms = args.until_ms;
    }

    let result = simulation::simulate_edits_with(&config.budget, &script)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_category_amount() {
        assert_eq!(
            parse_category_amount("Food=3000").unwrap(),
            ("Food".to_string(), dec!(3000))
        );
        assert_eq!(
            parse_category_amount(" Travel = 12500.5 ").unwrap(),
            ("Travel".to_string(), dec!(12500.5))
        );
        assert!(parse_category_amount("Food").is_err());
        assert!(parse_category_amount("=100").is_err());
        assert!(parse_category_amount("Food=lots").is_err());
    }

    #[test]
    fn test_run_budget_uses_engine_config() {
        let path = std::env::temp_dir().join(format!("cardfin-budget-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"pending": {"Food": "1000"}, "spent": {"Food": "1200"}}"#,
        )
        .unwrap();

        let mut config = EngineConfig::default();
        config.budget.quiet_window_ms = 250;
        let args = BudgetArgs {
            input: Some(path.to_string_lossy().into_owned()),
            limits: Vec::new(),
            pending: Vec::new(),
            spent: Vec::new(),
        };
        let value = run_budget(args, &config).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(value["assumptions"]["quiet_window_ms"], 250);
        assert_eq!(value["result"][0]["category"], "Food");
        assert_eq!(value["result"][0]["over_budget"], true);
    }
}
