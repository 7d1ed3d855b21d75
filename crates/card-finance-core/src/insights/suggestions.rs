use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::SuggestionConfig;
use crate::emi::plans::InstallmentPlan;
use crate::error::CardFinanceError;
use crate::repository::AccountRepository;
use crate::spending::aggregation::category_totals;
use crate::types::*;
use crate::CardFinanceResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// A recommended action. Regenerated on every read; the caller tracks which
/// ids have been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    /// Confidence in [0, 1]
    pub confidence_score: Decimal,
    pub rationale: String,
    pub action_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<SuggestionImpact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCategory {
    pub category: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightInput {
    pub total_outstanding: Money,
    #[serde(default)]
    pub top_category: Option<TopCategory>,
    #[serde(default)]
    pub bill_count: usize,
    /// Installment quoted in the convert-to-EMI rationale, if known
    #[serde(default)]
    pub monthly_installment: Option<Money>,
}

impl InsightInput {
    /// Derive the engine inputs from dashboard snapshots: outstanding is the
    /// sum of parsed card labels, the top category is the largest
    /// transaction-category sum across all history.
    pub fn from_snapshots(
        cards: &[CardSnapshot],
        bills: &[BillSnapshot],
        transactions: &[Transaction],
    ) -> Self {
        let total_outstanding = cards.iter().map(CardSnapshot::outstanding).sum();
        let top_category = category_totals(transactions)
            .into_iter()
            .next()
            .map(|c| TopCategory {
                category: c.category,
                amount: c.total,
            });
        Self {
            total_outstanding,
            top_category,
            bill_count: bills.len(),
            monthly_installment: None,
        }
    }

    pub fn from_repository(repo: &impl AccountRepository) -> Self {
        Self::from_snapshots(&repo.cards(), &repo.bills(), &repo.transactions())
    }
}

// ---------------------------------------------------------------------------
// Dashboard suggestions
// ---------------------------------------------------------------------------

/// Dashboard suggestions with default thresholds.
pub fn generate_suggestions(
    total_outstanding: Money,
    top_category: Option<&TopCategory>,
    bill_count: usize,
    monthly_installment: Option<Money>,
) -> Vec<Suggestion> {
    generate_suggestions_with(
        &SuggestionConfig::default(),
        total_outstanding,
        top_category,
        bill_count,
        monthly_installment,
    )
}

/// Rules run in a fixed priority order and the "on track" baseline is always
/// appended last, so the list is never empty.
pub fn generate_suggestions_with(
    config: &SuggestionConfig,
    total_outstanding: Money,
    top_category: Option<&TopCategory>,
    bill_count: usize,
    monthly_installment: Option<Money>,
) -> Vec<Suggestion> {
    let mut items: Vec<Suggestion> = Vec::with_capacity(4);

    if total_outstanding > config.high_outstanding_threshold {
        let rationale = match monthly_installment {
            Some(inst) => format!(
                "Splitting {} into 3 payments of about {} eases monthly pressure and avoids missed payments.",
                format_amount_label(total_outstanding),
                format_amount_label(inst)
            ),
            None => "Large outstanding can be split to reduce monthly pressure and avoid missed payments."
                .to_string(),
        };
        items.push(Suggestion {
            id: "emi-3mo".into(),
            title: "Convert high outstanding to EMI (3 mo)".into(),
            confidence_score: dec!(0.86),
            rationale,
            action_label: "Preview EMI".into(),
            impact: Some(SuggestionImpact {
                balance_delta: Some(-round_currency(total_outstanding * config.emi_balance_share)),
                months_delta: None,
                utilization_delta_pct: Some(dec!(-8)),
            }),
        });
    }

    if let Some(top) = top_category.filter(|t| t.amount > config.top_category_threshold) {
        items.push(Suggestion {
            id: "budget-cat".into(),
            title: format!("Set budget for {}", top.category),
            confidence_score: dec!(0.78),
            rationale: format!(
                "You've spent {} on {}. A budget reduces leak.",
                format_amount_label(top.amount),
                top.category
            ),
            action_label: "Create Budget".into(),
            impact: Some(SuggestionImpact {
                utilization_delta_pct: Some(dec!(-6)),
                ..SuggestionImpact::default()
            }),
        });
    }

    if bill_count > 0 {
        items.push(Suggestion {
            id: "autopay".into(),
            title: "Enable auto-pay for upcoming bills".into(),
            confidence_score: dec!(0.72),
            rationale: "Auto-pay avoids late payments and protects credit history.".into(),
            action_label: "Enable Auto-pay".into(),
            impact: Some(SuggestionImpact::balance(-round_currency(
                total_outstanding * config.autopay_balance_share,
            ))),
        });
    }

    items.push(Suggestion {
        id: "keep-going".into(),
        title: "You're on track, small wins".into(),
        confidence_score: dec!(0.65),
        rationale: "Patterns look steady. Keep paying on time to gradually raise your score.".into(),
        action_label: "View Progress".into(),
        impact: None,
    });

    debug!(
        "generated {} suggestions for outstanding {}",
        items.len(),
        total_outstanding
    );
    items
}

// ---------------------------------------------------------------------------
// Per-plan suggestions
// ---------------------------------------------------------------------------

/// The fixed triple shown next to each installment plan. Ids are prefixed
/// with the plan id so applied-state can be tracked per plan.
pub fn plan_suggestions(plan: &InstallmentPlan, config: &SuggestionConfig) -> Vec<Suggestion> {
    let lump = config.lump_sum_amount;
    let lump_label = format_amount_label(lump);
    // A lump sum of at least one installment takes a month off the term.
    let lump_months = if lump >= plan.monthly_installment { -1 } else { 0 };

    vec![
        Suggestion {
            id: format!("{}-pay-more", plan.id),
            title: "Prepay 1 month to reduce interest".into(),
            confidence_score: dec!(0.82),
            rationale: "Small prepayment reduces interest applied monthly and shortens tenor.".into(),
            action_label: "Prepay 1 month".into(),
            impact: Some(SuggestionImpact {
                balance_delta: Some(-plan.monthly_installment),
                months_delta: Some(-1),
                utilization_delta_pct: None,
            }),
        },
        Suggestion {
            id: format!("{}-lump-suggest", plan.id),
            title: format!("Make a {lump_label} lump-sum payment"),
            confidence_score: dec!(0.74),
            rationale: "Reduces principal quickly and may reduce future interest.".into(),
            action_label: format!("Pay {lump_label}"),
            impact: Some(SuggestionImpact {
                balance_delta: Some(-lump),
                months_delta: Some(lump_months),
                utilization_delta_pct: None,
            }),
        },
        Suggestion {
            id: format!("{}-balance-transfer", plan.id),
            title: "Consider balance transfer (0% intro)".into(),
            confidence_score: dec!(0.56),
            rationale: "If eligible, moving to a 0% promo could save interest for a short period.".into(),
            action_label: "Explore transfer".into(),
            impact: None,
        },
    ]
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

pub fn generate_insights(input: &InsightInput) -> CardFinanceResult<ComputationOutput<Vec<Suggestion>>> {
    generate_insights_with(&SuggestionConfig::default(), input)
}

pub fn generate_insights_with(
    config: &SuggestionConfig,
    input: &InsightInput,
) -> CardFinanceResult<ComputationOutput<Vec<Suggestion>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.total_outstanding < Decimal::ZERO {
        return Err(CardFinanceError::InvalidInput {
            field: "total_outstanding".into(),
            reason: "Outstanding balance cannot be negative".into(),
        });
    }
    if let Some(inst) = input.monthly_installment {
        if inst <= Decimal::ZERO {
            warnings.push(format!("Ignoring non-positive monthly installment {inst}"));
        }
    }
    let installment = input.monthly_installment.filter(|i| *i > Decimal::ZERO);

    let suggestions = generate_suggestions_with(
        config,
        input.total_outstanding,
        input.top_category.as_ref(),
        input.bill_count,
        installment,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rule-based suggestions in fixed priority order with heuristic impacts",
        &serde_json::json!({
            "high_outstanding_threshold": config.high_outstanding_threshold.to_string(),
            "emi_balance_share": config.emi_balance_share.to_string(),
            "top_category_threshold": config.top_category_threshold.to_string(),
            "autopay_balance_share": config.autopay_balance_share.to_string(),
        }),
        warnings,
        elapsed,
        suggestions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ids(items: &[Suggestion]) -> Vec<&str> {
        items.iter().map(|s| s.id.as_str()).collect()
    }

    fn plan(monthly: Money) -> InstallmentPlan {
        InstallmentPlan {
            id: "emi-1".into(),
            source_label: "Platinum Rewards".into(),
            original_amount: dec!(24000),
            remaining: dec!(12000),
            months_left: 6,
            monthly_installment: monthly,
            started_on: None,
            version: 0,
        }
    }

    #[test]
    fn test_all_rules_fire_in_priority_order() {
        let top = TopCategory {
            category: "Shopping".into(),
            amount: dec!(5400),
        };
        let items = generate_suggestions(dec!(48500), Some(&top), 2, None);
        assert_eq!(ids(&items), vec!["emi-3mo", "budget-cat", "autopay", "keep-going"]);

        let emi = items[0].impact.as_ref().unwrap();
        assert_eq!(emi.balance_delta, Some(dec!(-7275)));
        assert_eq!(emi.utilization_delta_pct, Some(dec!(-8)));
        assert_eq!(items[1].title, "Set budget for Shopping");
        assert_eq!(items[2].impact.as_ref().unwrap().balance_delta, Some(dec!(-970)));
        assert!(items[3].impact.is_none());
    }

    #[test]
    fn test_baseline_only_when_nothing_applies() {
        let items = generate_suggestions(dec!(20000), None, 0, None);
        assert_eq!(ids(&items), vec!["keep-going"]);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let top = TopCategory {
            category: "Food".into(),
            amount: dec!(2000),
        };
        let items = generate_suggestions(dec!(20000), Some(&top), 0, None);
        assert_eq!(ids(&items), vec!["keep-going"]);
    }

    #[test]
    fn test_rationale_mentions_installment() {
        let items = generate_suggestions(dec!(30000), None, 0, Some(dec!(10150)));
        assert!(items[0].rationale.contains("₹10,150"));
    }

    #[test]
    fn test_plan_suggestion_triple() {
        let items = plan_suggestions(&plan(dec!(2000)), &SuggestionConfig::default());
        assert_eq!(
            ids(&items),
            vec!["emi-1-pay-more", "emi-1-lump-suggest", "emi-1-balance-transfer"]
        );
        let pay_more = items[0].impact.as_ref().unwrap();
        assert_eq!(pay_more.balance_delta, Some(dec!(-2000)));
        assert_eq!(pay_more.months_delta, Some(-1));
        assert_eq!(items[1].impact.as_ref().unwrap().months_delta, Some(-1));
        assert!(items[2].impact.is_none());
    }

    #[test]
    fn test_lump_sum_smaller_than_installment_keeps_term() {
        let items = plan_suggestions(&plan(dec!(4000)), &SuggestionConfig::default());
        assert_eq!(items[1].impact.as_ref().unwrap().months_delta, Some(0));
    }

    #[test]
    fn test_input_from_snapshots() {
        let cards = vec![
            CardSnapshot {
                id: "c1".into(),
                title: "Millennia".into(),
                outstanding_label: Some("₹18,250".into()),
            },
            CardSnapshot {
                id: "c2".into(),
                title: "Regalia".into(),
                outstanding_label: None,
            },
        ];
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let txn = |id: &str, category: &str, amount: Money| Transaction {
            id: id.into(),
            owner_id: "c1".into(),
            merchant: "Store".into(),
            category: category.into(),
            amount,
            date,
        };
        let txns = vec![
            txn("t1", "Food", dec!(900)),
            txn("t2", "Travel", dec!(2500)),
            txn("t3", "Food", dec!(700)),
        ];
        let input = InsightInput::from_snapshots(&cards, &[], &txns);
        assert_eq!(input.total_outstanding, dec!(18250));
        assert_eq!(input.bill_count, 0);
        assert_eq!(input.top_category.unwrap().category, "Travel");
    }

    #[test]
    fn test_negative_outstanding_rejected() {
        let input = InsightInput {
            total_outstanding: dec!(-1),
            ..InsightInput::default()
        };
        assert!(matches!(
            generate_insights(&input),
            Err(CardFinanceError::InvalidInput { .. })
        ));
    }
}
