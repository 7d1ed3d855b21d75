use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use card_finance_core::emi::offers;
use card_finance_core::emi::plans::{InstallmentPlan, InstallmentPlanStore, PlanStatus};
use card_finance_core::emi::prepayment::PrepaymentPolicy;
use card_finance_core::insights::suggestions::{plan_suggestions, Suggestion};
use card_finance_core::{with_metadata, CardSnapshot, EngineConfig, SuggestionImpact};

use crate::input;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Arguments for converting a card balance to EMI
#[derive(Args)]
pub struct ConvertArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON file holding the current plans (empty when omitted)
    #[arg(long)]
    pub plans: Option<String>,

    /// Card the balance is converted from
    #[arg(long)]
    pub card: Option<String>,

    /// Amount to convert, as a number or label ("₹48,500")
    #[arg(long)]
    pub amount: Option<String>,

    /// Offer id from the catalog (plan-1, plan-2, plan-3)
    #[arg(long, default_value = "plan-2")]
    pub offer: String,

    /// Tenure in months (defaults to the offer's tenure)
    #[arg(long)]
    pub tenure: Option<u32>,

    /// Date the plan starts (YYYY-MM-DD)
    #[arg(long)]
    pub started_on: Option<NaiveDate>,
}

/// Arguments for a prepayment
#[derive(Args)]
pub struct PrepayArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON file holding the current plans
    #[arg(long)]
    pub plans: Option<String>,

    #[arg(long)]
    pub plan_id: Option<String>,

    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Reject the update unless the plan is still at this version
    #[arg(long)]
    pub expected_version: Option<u64>,

    /// Round the amount and cap it at the remaining balance before applying
    #[arg(long)]
    pub clamp: bool,
}

/// Arguments for applying a suggestion's impact
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ApplyImpactArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON file holding the current plans
    #[arg(long)]
    pub plans: Option<String>,

    #[arg(long)]
    pub plan_id: Option<String>,

    /// Per-plan suggestion id (e.g. emi-1-pay-more); overrides the deltas
    #[arg(long)]
    pub suggestion: Option<String>,

    #[arg(long)]
    pub balance_delta: Option<Decimal>,

    #[arg(long)]
    pub months_delta: Option<i32>,

    #[arg(long)]
    pub expected_version: Option<u64>,
}

/// Arguments for listing per-plan suggestions
#[derive(Args)]
pub struct PlanSuggestionsArgs {
    /// JSON file holding the current plans
    #[arg(long)]
    pub plans: String,

    /// Only this plan
    #[arg(long)]
    pub plan_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ConvertRequest {
    #[serde(default)]
    plans: Vec<InstallmentPlan>,
    card: CardSnapshot,
    /// Defaults to the card's outstanding balance
    #[serde(default)]
    principal: Option<Decimal>,
    offer_id: String,
    #[serde(default)]
    tenure_months: Option<u32>,
    #[serde(default)]
    started_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct PrepayRequest {
    plans: Vec<InstallmentPlan>,
    plan_id: String,
    amount: Decimal,
    #[serde(default)]
    expected_version: Option<u64>,
    #[serde(default)]
    clamp: bool,
}

#[derive(Deserialize)]
struct ImpactRequest {
    plans: Vec<InstallmentPlan>,
    plan_id: String,
    #[serde(default)]
    suggestion_id: Option<String>,
    #[serde(default)]
    impact: SuggestionImpact,
    #[serde(default)]
    expected_version: Option<u64>,
}

/// The touched plan plus the full working set, so the caller can persist it.
#[derive(Serialize)]
struct PlanUpdate {
    #[serde(flatten)]
    plan: InstallmentPlan,
    status: PlanStatus,
    paid_pct: Decimal,
    plans: Vec<InstallmentPlan>,
}

#[derive(Serialize)]
struct PlanSuggestions {
    plan_id: String,
    suggestions: Vec<Suggestion>,
}

fn load_plans(path: Option<&str>) -> Result<Vec<InstallmentPlan>, Box<dyn std::error::Error>> {
    input::file::read_json_or_default(path)
}

fn update_output(
    methodology: &str,
    store: &InstallmentPlanStore,
    plan: InstallmentPlan,
    warnings: Vec<String>,
    start: Instant,
) -> Result<Value, Box<dyn std::error::Error>> {
    let update = PlanUpdate {
        status: plan.status(),
        paid_pct: plan.paid_pct(),
        plan,
        plans: store.list(),
    };
    let output = with_metadata(
        methodology,
        &serde_json::json!({ "plans": store.len() }),
        warnings,
        start.elapsed().as_micros() as u64,
        update,
    );
    Ok(serde_json::to_value(output)?)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn run_convert(args: ConvertArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let req = match input::read_request::<ConvertRequest>(args.input.as_deref())? {
        Some(req) => req,
        None => {
            let title = args.card.ok_or("--card is required (or provide --input)")?;
            let label = args.amount.ok_or("--amount is required (or provide --input)")?;
            ConvertRequest {
                plans: load_plans(args.plans.as_deref())?,
                card: CardSnapshot {
                    id: title.clone(),
                    title,
                    outstanding_label: Some(label),
                },
                principal: None,
                offer_id: args.offer,
                tenure_months: args.tenure,
                started_on: args.started_on,
            }
        }
    };

    let catalog = offers::default_catalog();
    let offer = offers::find_offer(&catalog, &req.offer_id)
        .ok_or_else(|| format!("Unknown offer '{}'", req.offer_id))?;
    let tenure = req.tenure_months.unwrap_or(offer.tenure_months);
    let principal = req.principal.unwrap_or_else(|| req.card.outstanding());

    let mut warnings = Vec::new();
    if tenure != offer.tenure_months {
        warnings.push(format!(
            "{} is offered for {} months; quoting {} months at its rate",
            offer.lender, offer.tenure_months, tenure
        ));
    }

    let mut store = InstallmentPlanStore::from_plans(req.plans, PrepaymentPolicy::from(&config.prepayment))?;
    let plan = store.convert_balance(&req.card, principal, offer, tenure, req.started_on)?;
    update_output("Balance converted at the offer's annuity installment", &store, plan, warnings, start)
}

pub fn run_prepay(args: PrepayArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let req = match input::read_request::<PrepayRequest>(args.input.as_deref())? {
        Some(req) => req,
        None => PrepayRequest {
            plans: load_plans(Some(
                args.plans.as_deref().ok_or("--plans is required (or provide --input)")?,
            ))?,
            plan_id: args.plan_id.ok_or("--plan-id is required (or provide --input)")?,
            amount: args.amount.ok_or("--amount is required (or provide --input)")?,
            expected_version: args.expected_version,
            clamp: args.clamp,
        },
    };

    let policy = PrepaymentPolicy::from(&config.prepayment);
    let mut store = InstallmentPlanStore::from_plans(req.plans, policy)?;
    let mut warnings = Vec::new();

    let amount = if req.clamp {
        let current = store.get(&req.plan_id)?;
        let clamped = store.policy().clamp(req.amount, &current)?;
        if clamped != req.amount {
            warnings.push(format!("Amount adjusted from {} to {}", req.amount, clamped));
        }
        clamped
    } else {
        req.amount
    };

    let plan = match req.expected_version {
        Some(v) => store.apply_prepayment_if(&req.plan_id, v, amount)?,
        None => store.apply_prepayment(&req.plan_id, amount)?,
    };
    update_output(
        "Prepayment: remaining reduced, months re-derived from the existing installment",
        &store,
        plan,
        warnings,
        start,
    )
}

pub fn run_apply_impact(args: ApplyImpactArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let req = match input::read_request::<ImpactRequest>(args.input.as_deref())? {
        Some(req) => req,
        None => ImpactRequest {
            plans: load_plans(Some(
                args.plans.as_deref().ok_or("--plans is required (or provide --input)")?,
            ))?,
            plan_id: args.plan_id.ok_or("--plan-id is required (or provide --input)")?,
            suggestion_id: args.suggestion,
            impact: SuggestionImpact {
                balance_delta: args.balance_delta,
                months_delta: args.months_delta,
                utilization_delta_pct: None,
            },
            expected_version: args.expected_version,
        },
    };

    let mut store = InstallmentPlanStore::from_plans(req.plans, PrepaymentPolicy::from(&config.prepayment))?;
    let impact = match &req.suggestion_id {
        Some(id) => {
            let plan = store.get(&req.plan_id)?;
            let suggestion = plan_suggestions(&plan, &config.suggestions)
                .into_iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| format!("Suggestion '{}' not found for plan {}", id, req.plan_id))?;
            suggestion.impact.unwrap_or_default()
        }
        None => req.impact,
    };

    let mut warnings = Vec::new();
    if impact.is_neutral() {
        warnings.push("Impact is neutral; plan unchanged".to_string());
    }

    let plan = match req.expected_version {
        Some(v) => store.apply_suggestion_impact_if(&req.plan_id, v, &impact)?,
        None => store.apply_suggestion_impact(&req.plan_id, &impact)?,
    };
    update_output(
        "Suggestion impact applied; remaining and months floored at zero",
        &store,
        plan,
        warnings,
        start,
    )
}

pub fn run_plan_suggestions(
    args: PlanSuggestionsArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let store = InstallmentPlanStore::from_plans(
        load_plans(Some(args.plans.as_str()))?,
        PrepaymentPolicy::from(&config.prepayment),
    )?;
    let targets = match &args.plan_id {
        Some(id) => vec![store.get(id)?],
        None => store.list(),
    };

    let rows: Vec<PlanSuggestions> = targets
        .iter()
        .map(|plan| PlanSuggestions {
            plan_id: plan.id.clone(),
            suggestions: plan_suggestions(plan, &config.suggestions),
        })
        .collect();

    let output = with_metadata(
        "Fixed per-plan suggestion triple with heuristic impacts",
        &serde_json::json!({ "lump_sum_amount": config.suggestions.lump_sum_amount.to_string() }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        rows,
    );
    Ok(serde_json::to_value(output)?)
}
