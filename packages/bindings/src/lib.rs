use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use card_finance_core::emi::plans::{InstallmentPlan, InstallmentPlanStore};
use card_finance_core::emi::prepayment::PrepaymentPolicy;
use card_finance_core::{EngineConfig, SuggestionImpact};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// EMI
// ---------------------------------------------------------------------------

#[napi]
pub fn quote_emi(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::emi::amortization::EmiQuoteInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = card_finance_core::emi::amortization::quote_emi(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn emi_schedule(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::emi::amortization::EmiQuoteInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        card_finance_core::emi::amortization::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn emi_offers() -> NapiResult<String> {
    serde_json::to_string(&card_finance_core::emi::offers::default_catalog()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Installment plans (copy-in / copy-out)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PrepayRequest {
    plans: Vec<InstallmentPlan>,
    plan_id: String,
    amount: Decimal,
    #[serde(default)]
    expected_version: Option<u64>,
    #[serde(default)]
    config: EngineConfig,
}

#[derive(Deserialize)]
struct ImpactRequest {
    plans: Vec<InstallmentPlan>,
    plan_id: String,
    impact: SuggestionImpact,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Deserialize)]
struct PlanSuggestionsRequest {
    plan: InstallmentPlan,
    #[serde(default)]
    config: EngineConfig,
}

#[derive(Serialize)]
struct PlanUpdate {
    plan: InstallmentPlan,
    plans: Vec<InstallmentPlan>,
}

#[napi]
pub fn prepay_plan(input_json: String) -> NapiResult<String> {
    let req: PrepayRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let policy = PrepaymentPolicy::from(&req.config.prepayment);
    let mut store = InstallmentPlanStore::from_plans(req.plans, policy).map_err(to_napi_error)?;
    let plan = match req.expected_version {
        Some(v) => store.apply_prepayment_if(&req.plan_id, v, req.amount),
        None => store.apply_prepayment(&req.plan_id, req.amount),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&PlanUpdate {
        plan,
        plans: store.list(),
    })
    .map_err(to_napi_error)
}

#[napi]
pub fn apply_plan_impact(input_json: String) -> NapiResult<String> {
    let req: ImpactRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut store = InstallmentPlanStore::from_plans(req.plans, PrepaymentPolicy::default())
        .map_err(to_napi_error)?;
    let plan = match req.expected_version {
        Some(v) => store.apply_suggestion_impact_if(&req.plan_id, v, &req.impact),
        None => store.apply_suggestion_impact(&req.plan_id, &req.impact),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&PlanUpdate {
        plan,
        plans: store.list(),
    })
    .map_err(to_napi_error)
}

#[napi]
pub fn plan_suggestions(input_json: String) -> NapiResult<String> {
    let req: PlanSuggestionsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        card_finance_core::insights::suggestions::plan_suggestions(&req.plan, &req.config.suggestions);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_insights(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::insights::suggestions::InsightInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = card_finance_core::insights::suggestions::generate_insights(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Spending
// ---------------------------------------------------------------------------

#[napi]
pub fn aggregate_spending(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::spending::aggregation::SpendInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = card_finance_core::spending::aggregation::aggregate_spending(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_budgets(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::budget::tracker::BudgetInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        card_finance_core::budget::tracker::evaluate_budgets(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_budget_edits(input_json: String) -> NapiResult<String> {
    let input: card_finance_core::budget::simulation::BudgetScript =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        card_finance_core::budget::simulation::simulate_edits(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Parse a display label such as "₹48,500"; returns the amount as a decimal string.
#[napi]
pub fn parse_amount_label(label: String) -> String {
    card_finance_core::parse_amount_label(&label).to_string()
}
