use card_finance_core::spending::aggregation::{self, SpendFilter, SpendInput, SpendRange};
use card_finance_core::Transaction;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Helpers
// ===========================================================================

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn txn(id: &str, merchant: &str, category: &str, amount: Decimal, date: NaiveDate) -> Transaction {
    Transaction {
        id: id.into(),
        owner_id: "card-1".into(),
        merchant: merchant.into(),
        category: category.into(),
        amount,
        date,
    }
}

/// A few months of activity ending mid-March 2025.
fn sample_transactions() -> Vec<Transaction> {
    vec![
        txn("t1", "Swiggy", "Food", dec!(450), d(2025, 3, 12)),
        txn("t2", "Amazon", "Shopping", dec!(3200), d(2025, 3, 2)),
        txn("t3", "Zomato", "Food", dec!(780), d(2025, 2, 27)),
        txn("t4", "IndiGo", "Travel", dec!(6400), d(2025, 1, 20)),
        txn("t5", "BigBasket", "Groceries", dec!(1850), d(2024, 12, 28)),
        txn("t6", "Swiggy", "Food", dec!(620), d(2024, 11, 3)),
        txn("t7", "Myntra", "Shopping", dec!(2100), d(2024, 8, 15)),
    ]
}

// ===========================================================================
// Range and ordering
// ===========================================================================

#[test]
fn test_thirty_day_window() {
    let now = d(2025, 3, 15);
    let window = aggregation::aggregate(&sample_transactions(), SpendRange::Last30Days, now, None).unwrap();

    assert_eq!(window.range_cutoff, d(2025, 2, 13));
    let categories: Vec<(&str, Decimal)> = window
        .category_totals
        .iter()
        .map(|c| (c.category.as_str(), c.total))
        .collect();
    assert_eq!(categories, vec![("Shopping", dec!(3200)), ("Food", dec!(1230))]);
    assert_eq!(window.visible_total, dec!(4430));
    assert_eq!(window.visible_count, 3);

    // Outside six-month mode only months with activity appear, ascending
    let months: Vec<NaiveDate> = window.monthly_totals.iter().map(|m| m.month).collect();
    assert_eq!(months, vec![d(2025, 2, 1), d(2025, 3, 1)]);
}

#[test]
fn test_ninety_day_window_includes_cutoff_day() {
    let now = d(2025, 3, 15);
    let mut txns = sample_transactions();
    txns.push(txn("edge-in", "Uber", "Travel", dec!(500), d(2024, 12, 15)));
    txns.push(txn("edge-out", "Uber", "Travel", dec!(999), d(2024, 12, 14)));

    let window = aggregation::aggregate(&txns, SpendRange::Last90Days, now, None).unwrap();

    assert_eq!(window.range_cutoff, d(2024, 12, 15));
    assert_eq!(window.visible_count, 6);
    assert_eq!(window.visible_total, dec!(13180));

    let monthly: Vec<(NaiveDate, Decimal)> = window.monthly_totals.iter().map(|m| (m.month, m.total)).collect();
    assert_eq!(
        monthly,
        vec![
            (d(2024, 12, 1), dec!(2350)),
            (d(2025, 1, 1), dec!(6400)),
            (d(2025, 2, 1), dec!(780)),
            (d(2025, 3, 1), dec!(3650)),
        ]
    );
}

#[test]
fn test_category_totals_descending() {
    let now = d(2025, 3, 15);
    let window = aggregation::aggregate(&sample_transactions(), SpendRange::LastSixMonths, now, None).unwrap();
    for pair in window.category_totals.windows(2) {
        assert!(pair[0].total >= pair[1].total);
    }
    assert_eq!(window.category_totals[0].category, "Travel");
}

#[test]
fn test_merchant_totals_capped_at_six() {
    let now = d(2025, 3, 15);
    let txns: Vec<Transaction> = (1..=9)
        .map(|i| txn(&format!("m{i}"), &format!("Store {i}"), "Shopping", Decimal::from(i * 100), now))
        .collect();
    let window = aggregation::aggregate(&txns, SpendRange::Last30Days, now, None).unwrap();
    assert_eq!(window.merchant_totals.len(), 6);
    assert_eq!(window.merchant_totals[0].merchant, "Store 9");
    assert_eq!(window.merchant_totals[5].merchant, "Store 4");
}

// ===========================================================================
// Six-month back-fill
// ===========================================================================

#[test]
fn test_six_months_zero_filled_without_transactions() {
    let now = d(2025, 3, 15);
    let window = aggregation::aggregate(&[], SpendRange::LastSixMonths, now, None).unwrap();

    let labels: Vec<&str> = window.monthly_totals.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
    assert!(window.monthly_totals.iter().all(|m| m.total.is_zero()));
    assert_eq!(window.monthly_totals[0].month, d(2024, 10, 1));
    assert_eq!(window.monthly_totals[5].month, d(2025, 3, 1));
}

#[test]
fn test_six_months_sums_per_month() {
    let now = d(2025, 3, 15);
    let window = aggregation::aggregate(&sample_transactions(), SpendRange::LastSixMonths, now, None).unwrap();
    let totals: Vec<Decimal> = window.monthly_totals.iter().map(|m| m.total).collect();
    assert_eq!(
        totals,
        vec![dec!(0), dec!(620), dec!(1850), dec!(6400), dec!(780), dec!(3650)]
    );
}

// ===========================================================================
// Filters
// ===========================================================================

#[test]
fn test_filter_hides_from_categories_but_not_months() {
    let now = d(2025, 3, 15);
    let filter = SpendFilter {
        category: Some("Food".into()),
        merchant: None,
    };
    let window =
        aggregation::aggregate(&sample_transactions(), SpendRange::LastSixMonths, now, Some(&filter)).unwrap();

    assert_eq!(window.category_totals.len(), 1);
    assert_eq!(window.visible_total, dec!(1850));
    let month_sum: Decimal = window.monthly_totals.iter().map(|m| m.total).sum();
    assert_eq!(month_sum, dec!(13300));
}

#[test]
fn test_category_and_merchant_filters_combine() {
    let now = d(2025, 3, 15);
    let filter = SpendFilter {
        category: Some("Food".into()),
        merchant: Some("Swiggy".into()),
    };
    let window =
        aggregation::aggregate(&sample_transactions(), SpendRange::LastSixMonths, now, Some(&filter)).unwrap();
    assert_eq!(window.visible_total, dec!(1070));
    assert_eq!(window.merchant_totals.len(), 1);
}

#[test]
fn test_envelope_warns_on_empty_filter_result() {
    let input = SpendInput {
        transactions: sample_transactions(),
        range: SpendRange::Last30Days,
        reference_date: d(2025, 3, 15),
        filter: SpendFilter {
            category: Some("Travel".into()),
            merchant: None,
        },
    };
    let out = aggregation::aggregate_spending(&input).unwrap();
    assert_eq!(out.result.visible_count, 0);
    assert!(out.warnings.iter().any(|w| w.contains("no transactions")));
}

#[test]
fn test_envelope_warns_on_future_dates() {
    let input = SpendInput {
        transactions: vec![txn("f1", "Amazon", "Shopping", dec!(999), d(2025, 4, 2))],
        range: SpendRange::Last90Days,
        reference_date: d(2025, 3, 15),
        filter: SpendFilter::default(),
    };
    let out = aggregation::aggregate_spending(&input).unwrap();
    assert_eq!(out.result.visible_total, dec!(999));
    assert_eq!(out.warnings.len(), 1);
}
