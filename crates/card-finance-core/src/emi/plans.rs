use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::amortization::{EmiQuote, MAX_TERM_MONTHS};
use super::offers::EmiOffer;
use super::prepayment::PrepaymentPolicy;
use crate::error::CardFinanceError;
use crate::types::*;
use crate::CardFinanceResult;

// ---------------------------------------------------------------------------
// Plan record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Active,
    Cleared,
}

/// An active EMI conversion of a card balance.
///
/// Invariants: `remaining <= original_amount`, `remaining >= 0`, and
/// `monthly_installment > 0` unless `months_left == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub id: String,
    /// Card the balance was converted from
    pub source_label: String,
    pub original_amount: Money,
    pub remaining: Money,
    pub months_left: u32,
    pub monthly_installment: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<NaiveDate>,
    /// Bumped on every mutation that changes the record
    #[serde(default)]
    pub version: u64,
}

impl InstallmentPlan {
    pub fn status(&self) -> PlanStatus {
        if self.months_left == 0 || self.remaining.is_zero() {
            PlanStatus::Cleared
        } else {
            PlanStatus::Active
        }
    }

    /// Share of the original amount already repaid, as a whole percentage.
    pub fn paid_pct(&self) -> Decimal {
        progress_pct(self.original_amount - self.remaining, self.original_amount)
    }

    /// State after an out-of-schedule payment, without validation.
    ///
    /// The term is re-derived from the existing installment
    /// (`round(remaining / monthly)`), not by re-running the annuity formula.
    pub fn after_prepayment(&self, amount: Money) -> InstallmentPlan {
        let remaining = (self.remaining - amount).max(Decimal::ZERO);
        let divisor = if self.monthly_installment > Decimal::ZERO {
            self.monthly_installment
        } else {
            Decimal::ONE
        };
        let months_left = round_currency(remaining / divisor)
            .max(Decimal::ZERO)
            .to_u32()
            .unwrap_or(u32::MAX);

        InstallmentPlan {
            remaining,
            months_left,
            ..self.clone()
        }
    }

    /// State after applying a suggestion's simulated impact. Missing deltas
    /// count as zero; both fields are floored at zero.
    pub fn after_impact(&self, impact: &SuggestionImpact) -> InstallmentPlan {
        let balance_delta = impact.balance_delta.unwrap_or(Decimal::ZERO);
        let months_delta = i64::from(impact.months_delta.unwrap_or(0));

        let mut remaining = (self.remaining + balance_delta).max(Decimal::ZERO);
        if remaining > self.original_amount {
            warn!(
                "plan {}: impact would raise remaining above original amount; capped at {}",
                self.id, self.original_amount
            );
            remaining = self.original_amount;
        }
        let months_left = (i64::from(self.months_left) + months_delta).clamp(0, i64::from(u32::MAX)) as u32;

        InstallmentPlan {
            remaining,
            months_left,
            ..self.clone()
        }
    }

    fn check_invariants(&self) -> CardFinanceResult<()> {
        if self.original_amount < Decimal::ZERO || self.remaining < Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: format!("plans[{}]", self.id),
                reason: "Amounts cannot be negative".into(),
            });
        }
        if self.remaining > self.original_amount {
            return Err(CardFinanceError::InvalidInput {
                field: format!("plans[{}].remaining", self.id),
                reason: "Remaining cannot exceed the original amount".into(),
            });
        }
        if self.months_left > 0 && self.monthly_installment <= Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: format!("plans[{}].monthly_installment", self.id),
                reason: "Installment must be positive while months remain".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory working set of installment plans, kept in creation order.
///
/// Reads return copies. Applying the same suggestion twice is not prevented
/// here; the caller tracks which suggestion ids it has applied.
#[derive(Debug, Clone, Default)]
pub struct InstallmentPlanStore {
    plans: Vec<InstallmentPlan>,
    next_seq: u64,
    policy: PrepaymentPolicy,
}

impl InstallmentPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PrepaymentPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Seed the store with existing plans, rejecting duplicates and records
    /// that break the plan invariants.
    pub fn from_plans(plans: Vec<InstallmentPlan>, policy: PrepaymentPolicy) -> CardFinanceResult<Self> {
        let mut seen = HashSet::new();
        for plan in &plans {
            plan.check_invariants()?;
            if !seen.insert(plan.id.clone()) {
                return Err(CardFinanceError::InvalidInput {
                    field: "plans".into(),
                    reason: format!("Duplicate plan id '{}'", plan.id),
                });
            }
        }
        Ok(Self {
            next_seq: plans.len() as u64,
            plans,
            policy,
        })
    }

    pub fn policy(&self) -> &PrepaymentPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn list(&self) -> Vec<InstallmentPlan> {
        self.plans.clone()
    }

    pub fn get(&self, id: &str) -> CardFinanceResult<InstallmentPlan> {
        self.find(id).cloned()
    }

    pub fn total_remaining(&self) -> Money {
        self.plans.iter().map(|p| p.remaining).sum()
    }

    fn find(&self, id: &str) -> CardFinanceResult<&InstallmentPlan> {
        self.plans
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn find_mut(&mut self, id: &str) -> CardFinanceResult<&mut InstallmentPlan> {
        self.plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn next_id(&mut self) -> String {
        loop {
            self.next_seq += 1;
            let candidate = format!("emi-{}", self.next_seq);
            if !self.plans.iter().any(|p| p.id == candidate) {
                return candidate;
            }
        }
    }

    /// Record a new plan from a quote. `remaining` starts at the principal.
    pub fn create_plan(
        &mut self,
        source_label: &str,
        principal: Money,
        quote: &EmiQuote,
        term_months: u32,
    ) -> CardFinanceResult<InstallmentPlan> {
        self.create_plan_on(source_label, principal, quote, term_months, None)
    }

    pub fn create_plan_on(
        &mut self,
        source_label: &str,
        principal: Money,
        quote: &EmiQuote,
        term_months: u32,
        started_on: Option<NaiveDate>,
    ) -> CardFinanceResult<InstallmentPlan> {
        if term_months > 0 && quote.monthly_installment <= Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: "quote.monthly_installment".into(),
                reason: format!(
                    "a {term_months}-month plan needs a positive installment (got {})",
                    quote.monthly_installment
                ),
            });
        }
        let plan = InstallmentPlan {
            id: self.next_id(),
            source_label: source_label.to_string(),
            original_amount: principal,
            remaining: principal,
            months_left: term_months,
            monthly_installment: quote.monthly_installment,
            started_on,
            version: 0,
        };
        debug!(
            "created plan {} for '{}': {} over {} months at {}/month",
            plan.id, plan.source_label, principal, term_months, plan.monthly_installment
        );
        self.plans.push(plan.clone());
        Ok(plan)
    }

    /// Convert part of a card's balance under a lender offer.
    pub fn convert_balance(
        &mut self,
        card: &CardSnapshot,
        principal: Money,
        offer: &EmiOffer,
        tenure_months: u32,
        started_on: Option<NaiveDate>,
    ) -> CardFinanceResult<InstallmentPlan> {
        let principal = round_currency(principal);
        if principal <= Decimal::ZERO {
            return Err(CardFinanceError::InvalidInput {
                field: "principal".into(),
                reason: "Enter a positive amount to convert".into(),
            });
        }
        if tenure_months == 0 {
            return Err(CardFinanceError::InvalidInput {
                field: "tenure_months".into(),
                reason: "Tenure must be at least one month".into(),
            });
        }
        if tenure_months > MAX_TERM_MONTHS {
            return Err(CardFinanceError::InvalidInput {
                field: "tenure_months".into(),
                reason: format!("Tenure cannot exceed {MAX_TERM_MONTHS} months"),
            });
        }
        let quote = offer.quote(principal, tenure_months);
        self.create_plan_on(&card.title, principal, &quote, tenure_months, started_on)
    }

    /// Apply an out-of-schedule payment. The amount must lie within the
    /// policy's bounds; nothing is mutated otherwise.
    pub fn apply_prepayment(&mut self, id: &str, amount: Money) -> CardFinanceResult<InstallmentPlan> {
        let policy = self.policy.clone();
        let plan = self.find_mut(id)?;
        policy.validate(amount, plan)?;
        let updated = plan.after_prepayment(amount);
        Ok(commit(plan, updated, "prepayment"))
    }

    pub fn apply_prepayment_if(
        &mut self,
        id: &str,
        expected_version: u64,
        amount: Money,
    ) -> CardFinanceResult<InstallmentPlan> {
        check_version(self.find(id)?, expected_version)?;
        self.apply_prepayment(id, amount)
    }

    /// Apply a suggestion's simulated impact. Not reversible.
    pub fn apply_suggestion_impact(
        &mut self,
        id: &str,
        impact: &SuggestionImpact,
    ) -> CardFinanceResult<InstallmentPlan> {
        let plan = self.find_mut(id)?;
        let updated = plan.after_impact(impact);
        Ok(commit(plan, updated, "suggestion impact"))
    }

    pub fn apply_suggestion_impact_if(
        &mut self,
        id: &str,
        expected_version: u64,
        impact: &SuggestionImpact,
    ) -> CardFinanceResult<InstallmentPlan> {
        check_version(self.find(id)?, expected_version)?;
        self.apply_suggestion_impact(id, impact)
    }

    /// Remove and return every plan that has reached the Cleared state.
    pub fn discard_cleared(&mut self) -> Vec<InstallmentPlan> {
        let (cleared, active): (Vec<_>, Vec<_>) = self
            .plans
            .drain(..)
            .partition(|p| p.status() == PlanStatus::Cleared);
        self.plans = active;
        cleared
    }
}

fn not_found(id: &str) -> CardFinanceError {
    CardFinanceError::NotFound {
        entity: "installment plan".into(),
        id: id.to_string(),
    }
}

fn check_version(plan: &InstallmentPlan, expected: u64) -> CardFinanceResult<()> {
    if plan.version != expected {
        return Err(CardFinanceError::VersionConflict {
            id: plan.id.clone(),
            expected,
            actual: plan.version,
        });
    }
    Ok(())
}

/// Store `updated` in place, bumping the version only if something changed.
fn commit(slot: &mut InstallmentPlan, mut updated: InstallmentPlan, what: &str) -> InstallmentPlan {
    if updated != *slot {
        updated.version = slot.version + 1;
        debug!(
            "{what} on {}: remaining {} -> {}, months left {} -> {}",
            slot.id, slot.remaining, updated.remaining, slot.months_left, updated.months_left
        );
        *slot = updated;
    }
    slot.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn demo_plan() -> InstallmentPlan {
        InstallmentPlan {
            id: "emi-1".into(),
            source_label: "Platinum Rewards".into(),
            original_amount: dec!(24000),
            remaining: dec!(12000),
            months_left: 6,
            monthly_installment: dec!(2000),
            started_on: NaiveDate::from_ymd_opt(2025, 4, 1),
            version: 0,
        }
    }

    fn demo_store() -> InstallmentPlanStore {
        InstallmentPlanStore::from_plans(vec![demo_plan()], PrepaymentPolicy::default()).unwrap()
    }

    #[test]
    fn test_prepayment_recomputes_months_from_installment() {
        let mut store = demo_store();
        let p = store.apply_prepayment("emi-1", dec!(2000)).unwrap();
        assert_eq!(p.remaining, dec!(10000));
        assert_eq!(p.months_left, 5);
        assert_eq!(p.version, 1);
    }

    #[test]
    fn test_prepayment_out_of_range_leaves_plan() {
        let mut store = demo_store();
        assert!(store.apply_prepayment("emi-1", dec!(50)).is_err());
        assert!(store.apply_prepayment("emi-1", dec!(12001)).is_err());
        assert_eq!(store.get("emi-1").unwrap(), demo_plan());
    }

    #[test]
    fn test_unknown_plan_is_not_found() {
        let mut store = demo_store();
        assert!(matches!(
            store.apply_prepayment("emi-9", dec!(500)),
            Err(CardFinanceError::NotFound { .. })
        ));
        assert!(store
            .apply_suggestion_impact("emi-9", &SuggestionImpact::default())
            .is_err());
    }

    #[test]
    fn test_neutral_impact_is_noop() {
        let mut store = demo_store();
        let impact = SuggestionImpact {
            balance_delta: Some(Decimal::ZERO),
            months_delta: Some(0),
            utilization_delta_pct: None,
        };
        let p = store.apply_suggestion_impact("emi-1", &impact).unwrap();
        assert_eq!(p, demo_plan());
    }

    #[test]
    fn test_impacts_compound_and_floor_at_zero() {
        let mut store = demo_store();
        let impact = SuggestionImpact {
            balance_delta: Some(dec!(-7000)),
            months_delta: Some(-4),
            utilization_delta_pct: None,
        };
        store.apply_suggestion_impact("emi-1", &impact).unwrap();
        let p = store.apply_suggestion_impact("emi-1", &impact).unwrap();
        assert_eq!(p.remaining, Decimal::ZERO);
        assert_eq!(p.months_left, 0);
        assert_eq!(p.status(), PlanStatus::Cleared);
    }

    #[test]
    fn test_positive_delta_capped_at_original() {
        let mut store = demo_store();
        let p = store
            .apply_suggestion_impact("emi-1", &SuggestionImpact::balance(dec!(50000)))
            .unwrap();
        assert_eq!(p.remaining, dec!(24000));
    }

    #[test]
    fn test_stale_version_rejected() {
        let mut store = demo_store();
        store.apply_prepayment_if("emi-1", 0, dec!(1000)).unwrap();
        let err = store.apply_prepayment_if("emi-1", 0, dec!(1000)).unwrap_err();
        assert!(matches!(
            err,
            CardFinanceError::VersionConflict { expected: 0, actual: 1, .. }
        ));
    }

    #[test]
    fn test_seed_rejects_broken_invariants() {
        let mut bad = demo_plan();
        bad.remaining = dec!(30000);
        assert!(InstallmentPlanStore::from_plans(vec![bad], PrepaymentPolicy::default()).is_err());

        let dup = vec![demo_plan(), demo_plan()];
        assert!(InstallmentPlanStore::from_plans(dup, PrepaymentPolicy::default()).is_err());
    }

    #[test]
    fn test_new_ids_skip_seeded() {
        let mut store = demo_store();
        let quote = crate::emi::amortization::compute_installment(dec!(6000), dec!(12), 6, Decimal::ZERO);
        let p = store.create_plan("Gold Cashback", dec!(6000), &quote, 6).unwrap();
        assert_eq!(p.id, "emi-2");
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_remaining(), dec!(18000));
    }

    #[test]
    fn test_discard_cleared() {
        let mut store = demo_store();
        store.apply_prepayment("emi-1", dec!(12000)).unwrap();
        let cleared = store.discard_cleared();
        assert_eq!(cleared.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_paid_pct() {
        assert_eq!(demo_plan().paid_pct(), dec!(50));
    }
}
