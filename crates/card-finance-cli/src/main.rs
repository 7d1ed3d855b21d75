mod commands;
mod config;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::budget::{BudgetArgs, BudgetSimArgs};
use commands::emi::{EmiOffersArgs, EmiQuoteArgs};
use commands::insights::SuggestionsArgs;
use commands::plans::{ApplyImpactArgs, ConvertArgs, PlanSuggestionsArgs, PrepayArgs};
use commands::spending::SpendArgs;

/// Credit-card EMI, spend and budget calculations
#[derive(Parser)]
#[command(
    name = "cardfin",
    version,
    about = "Credit-card EMI, spend and budget calculations",
    long_about = "A CLI for credit-card finance calculations with decimal precision. \
                  Supports EMI quotes and schedules, balance conversion, prepayment, \
                  suggestions, spend aggregation and debounced budget limits."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote an EMI conversion (installment, fee, total payable)
    EmiQuote(EmiQuoteArgs),
    /// Compare the lender offer catalog for a principal
    EmiOffers(EmiOffersArgs),
    /// Month-by-month amortization schedule
    EmiSchedule(EmiQuoteArgs),
    /// Convert a card balance into a new installment plan
    Convert(ConvertArgs),
    /// Apply a prepayment to an installment plan
    Prepay(PrepayArgs),
    /// Apply a suggestion's simulated impact to an installment plan
    ApplyImpact(ApplyImpactArgs),
    /// Per-plan suggestions (prepay, lump sum, balance transfer)
    PlanSuggestions(PlanSuggestionsArgs),
    /// Dashboard suggestions from balances, bills and transactions
    Suggestions(SuggestionsArgs),
    /// Aggregate spending by category, merchant and month
    Spend(SpendArgs),
    /// Compare spend against budget limits
    Budget(BudgetArgs),
    /// Replay timed budget edits through the debounced tracker
    BudgetSim(BudgetSimArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine_config = match config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::EmiQuote(args) => commands::emi::run_quote(args),
        Commands::EmiOffers(args) => commands::emi::run_offers(args),
        Commands::EmiSchedule(args) => commands::emi::run_schedule(args),
        Commands::Convert(args) => commands::plans::run_convert(args, &engine_config),
        Commands::Prepay(args) => commands::plans::run_prepay(args, &engine_config),
        Commands::ApplyImpact(args) => commands::plans::run_apply_impact(args, &engine_config),
        Commands::PlanSuggestions(args) => commands::plans::run_plan_suggestions(args, &engine_config),
        Commands::Suggestions(args) => commands::insights::run_suggestions(args, &engine_config),
        Commands::Spend(args) => commands::spending::run_spend(args, &engine_config),
        Commands::Budget(args) => commands::budget::run_budget(args, &engine_config),
        Commands::BudgetSim(args) => commands::budget::run_budget_sim(args, &engine_config),
        Commands::Version => {
            println!("cardfin {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
