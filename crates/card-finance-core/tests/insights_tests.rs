use card_finance_core::config::SuggestionConfig;
use card_finance_core::emi::plans::{InstallmentPlan, InstallmentPlanStore};
use card_finance_core::emi::prepayment::PrepaymentPolicy;
use card_finance_core::insights::suggestions::{self, InsightInput, TopCategory};
use card_finance_core::repository::InMemoryRepository;
use card_finance_core::{BillSnapshot, CardSnapshot, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Dashboard suggestions
// ===========================================================================

fn ids(items: &[suggestions::Suggestion]) -> Vec<String> {
    items.iter().map(|s| s.id.clone()).collect()
}

#[test]
fn test_baseline_always_last_and_present() {
    let top = TopCategory {
        category: "Travel".into(),
        amount: dec!(6400),
    };
    let scenarios = [
        (dec!(0), None, 0usize),
        (dec!(25000), None, 0),
        (dec!(0), Some(&top), 0),
        (dec!(0), None, 3),
        (dec!(90000), Some(&top), 1),
    ];
    for (outstanding, top_category, bills) in scenarios {
        let items = suggestions::generate_suggestions(outstanding, top_category, bills, None);
        assert_eq!(items.last().unwrap().id, "keep-going");
        assert_eq!(items.iter().filter(|s| s.id == "keep-going").count(), 1);
    }
}

#[test]
fn test_priority_order_is_fixed() {
    let top = TopCategory {
        category: "Shopping".into(),
        amount: dec!(2001),
    };
    let items = suggestions::generate_suggestions(dec!(20001), Some(&top), 1, None);
    assert_eq!(ids(&items), vec!["emi-3mo", "budget-cat", "autopay", "keep-going"]);

    let items = suggestions::generate_suggestions(dec!(5000), Some(&top), 1, None);
    assert_eq!(ids(&items), vec!["budget-cat", "autopay", "keep-going"]);
}

#[test]
fn test_confidence_scores_within_unit_interval() {
    let top = TopCategory {
        category: "Food".into(),
        amount: dec!(4000),
    };
    let items = suggestions::generate_suggestions(dec!(50000), Some(&top), 2, Some(dec!(4512)));
    for s in &items {
        assert!(s.confidence_score >= Decimal::ZERO && s.confidence_score <= Decimal::ONE);
    }
    let scores: Vec<Decimal> = items.iter().map(|s| s.confidence_score).collect();
    assert_eq!(scores, vec![dec!(0.86), dec!(0.78), dec!(0.72), dec!(0.65)]);
}

#[test]
fn test_impacts_rounded_to_whole_units() {
    let items = suggestions::generate_suggestions(dec!(33333), None, 1, None);
    let emi = items[0].impact.as_ref().unwrap();
    // 33333 * 0.15 = 4999.95
    assert_eq!(emi.balance_delta, Some(dec!(-5000)));
    let autopay = items[1].impact.as_ref().unwrap();
    // 33333 * 0.02 = 666.66
    assert_eq!(autopay.balance_delta, Some(dec!(-667)));
}

#[test]
fn test_custom_thresholds() {
    let cfg = SuggestionConfig {
        high_outstanding_threshold: dec!(1000),
        ..SuggestionConfig::default()
    };
    let items = suggestions::generate_suggestions_with(&cfg, dec!(1500), None, 0, None);
    assert_eq!(ids(&items), vec!["emi-3mo", "keep-going"]);
}

// ===========================================================================
// Snapshot inputs
// ===========================================================================

#[test]
fn test_insights_from_repository() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let repo = InMemoryRepository::new(
        vec![
            CardSnapshot {
                id: "card-1".into(),
                title: "Platinum Rewards".into(),
                outstanding_label: Some("₹48,500".into()),
            },
            CardSnapshot {
                id: "card-2".into(),
                title: "Millennia".into(),
                outstanding_label: Some("₹2,300".into()),
            },
        ],
        vec![BillSnapshot {
            id: "bill-1".into(),
            title: "Electricity".into(),
            amount_label: "₹1,240".into(),
            due_date: date,
        }],
        vec![Transaction {
            id: "t1".into(),
            owner_id: "card-1".into(),
            merchant: "IndiGo".into(),
            category: "Travel".into(),
            amount: dec!(6400),
            date,
        }],
    );

    let input = InsightInput::from_repository(&repo);
    assert_eq!(input.total_outstanding, dec!(50800));
    assert_eq!(input.bill_count, 1);

    let out = suggestions::generate_insights(&input).unwrap();
    assert_eq!(
        ids(&out.result),
        vec!["emi-3mo", "budget-cat", "autopay", "keep-going"]
    );
    assert_eq!(out.result[1].title, "Set budget for Travel");
}

// ===========================================================================
// Per-plan suggestions applied through the store
// ===========================================================================

#[test]
fn test_plan_suggestion_applied_through_store() {
    let plan = InstallmentPlan {
        id: "emi-1".into(),
        source_label: "Platinum Rewards".into(),
        original_amount: dec!(24000),
        remaining: dec!(12000),
        months_left: 6,
        monthly_installment: dec!(2000),
        started_on: None,
        version: 0,
    };
    let mut store = InstallmentPlanStore::from_plans(vec![plan.clone()], PrepaymentPolicy::default()).unwrap();

    let triple = suggestions::plan_suggestions(&plan, &SuggestionConfig::default());
    let pay_more = triple[0].impact.as_ref().unwrap();
    let updated = store.apply_suggestion_impact("emi-1", pay_more).unwrap();
    assert_eq!(updated.remaining, dec!(10000));
    assert_eq!(updated.months_left, 5);

    // Balance transfer carries no impact; applying an empty one changes nothing
    assert!(triple[2].impact.is_none());
    let unchanged = store
        .apply_suggestion_impact("emi-1", &Default::default())
        .unwrap();
    assert_eq!(unchanged, updated);
}
