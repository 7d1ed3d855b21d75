use card_finance_core::emi::{amortization, offers, plans, prepayment};
use card_finance_core::{CardFinanceError, CardSnapshot, SuggestionImpact};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Amortization tests
// ===========================================================================

#[test]
fn test_quote_twelve_months_at_fourteen_percent() {
    let quote = amortization::compute_installment(dec!(12000), dec!(14.0), 12, dec!(0.75));

    // r = 14 / 12 / 100; EMI ≈ 1077.44 rounds to 1077
    assert_eq!(quote.monthly_installment, dec!(1077));
    // 0.75% of 12000
    assert_eq!(quote.processing_fee, dec!(90));
    assert_eq!(quote.total_payable, dec!(1077) * dec!(12) + dec!(90));
    assert_eq!(quote.total_interest_and_fees, quote.total_payable - dec!(12000));
}

#[test]
fn test_total_payable_is_exact_multiple_of_rounded_installment() {
    let cases = [
        (dec!(48500), dec!(16.5), 24u32, dec!(0.5)),
        (dec!(9999), dec!(12.5), 6, dec!(1.0)),
        (dec!(100000), dec!(18), 36, Decimal::ZERO),
        (dec!(0), dec!(14), 12, dec!(0.75)),
        (dec!(7000), dec!(0), 3, dec!(2)),
    ];
    for (principal, rate, term, fee_pct) in cases {
        let q = amortization::compute_installment(principal, rate, term, fee_pct);
        let expected = card_finance_core::round_currency(q.monthly_installment) * Decimal::from(term)
            + q.processing_fee;
        assert_eq!(q.total_payable, expected, "principal {principal}, rate {rate}, term {term}");
    }
}

#[test]
fn test_zero_rate_even_split_without_rounding() {
    let q = amortization::compute_installment(dec!(10000), Decimal::ZERO, 3, Decimal::ZERO);
    assert_eq!(q.monthly_installment, dec!(10000) / dec!(3));
    // Totals use the rounded installment
    assert_eq!(q.total_payable, dec!(9999));
}

#[test]
fn test_zero_term_yields_zero_quote() {
    let q = amortization::compute_installment(dec!(5000), dec!(14), 0, dec!(1));
    assert_eq!(q.monthly_installment, Decimal::ZERO);
    assert_eq!(q.total_payable, Decimal::ZERO);
    assert_eq!(q.total_interest_and_fees, Decimal::ZERO);
}

#[test]
fn test_quote_emi_rejects_negative_principal() {
    let input = amortization::EmiQuoteInput {
        principal: dec!(-1),
        annual_rate_pct: dec!(14),
        term_months: 12,
        processing_fee_pct: Decimal::ZERO,
    };
    let err = amortization::quote_emi(&input).unwrap_err();
    assert!(matches!(err, CardFinanceError::InvalidInput { .. }));
}

#[test]
fn test_quote_emi_steep_rate_does_not_overflow() {
    let input = amortization::EmiQuoteInput {
        principal: dec!(1000000),
        annual_rate_pct: dec!(6000),
        term_months: 30,
        processing_fee_pct: Decimal::ZERO,
    };
    let out = amortization::quote_emi(&input).unwrap();
    assert_eq!(out.result.monthly_installment, dec!(5000000));
    assert!(out.warnings.is_empty());

    let schedule = amortization::build_schedule(&input).unwrap();
    assert_eq!(schedule.result.rows.len(), 30);
    assert_eq!(schedule.result.rows.last().unwrap().closing_balance, Decimal::ZERO);
}

#[test]
fn test_quote_emi_unrepresentable_amount_warns() {
    let input = amortization::EmiQuoteInput {
        principal: Decimal::MAX / dec!(2),
        annual_rate_pct: dec!(6000),
        term_months: 1,
        processing_fee_pct: Decimal::ZERO,
    };
    let out = amortization::quote_emi(&input).unwrap();
    assert_eq!(out.result.monthly_installment, Decimal::ZERO);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_schedule_closes_at_zero() {
    let input = amortization::EmiQuoteInput {
        principal: dec!(24000),
        annual_rate_pct: dec!(14),
        term_months: 12,
        processing_fee_pct: dec!(0.75),
    };
    let out = amortization::build_schedule(&input).unwrap();
    let schedule = &out.result;
    assert_eq!(schedule.rows.len(), 12);
    assert_eq!(schedule.rows.last().unwrap().closing_balance, Decimal::ZERO);
    let principal_paid: Decimal = schedule.rows.iter().map(|r| r.principal).sum();
    assert_eq!(principal_paid, dec!(24000));
    for pair in schedule.rows.windows(2) {
        assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
    }
}

// ===========================================================================
// Offer catalog tests
// ===========================================================================

#[test]
fn test_catalog_quotes_each_lender() {
    let catalog = offers::default_catalog();
    assert_eq!(catalog.len(), 3);
    let flexi = offers::find_offer(&catalog, "plan-2").unwrap();
    let quote = flexi.quote(dec!(12000), 12);
    assert_eq!(quote.monthly_installment, dec!(1077));
    assert_eq!(quote.processing_fee, dec!(90));
    assert!(offers::find_offer(&catalog, "plan-9").is_none());
}

// ===========================================================================
// Installment plan store tests
// ===========================================================================

fn seeded_store() -> plans::InstallmentPlanStore {
    let plan = plans::InstallmentPlan {
        id: "emi-1".into(),
        source_label: "Platinum Rewards".into(),
        original_amount: dec!(24000),
        remaining: dec!(12000),
        months_left: 6,
        monthly_installment: dec!(2000),
        started_on: NaiveDate::from_ymd_opt(2025, 1, 5),
        version: 0,
    };
    plans::InstallmentPlanStore::from_plans(vec![plan], prepayment::PrepaymentPolicy::default()).unwrap()
}

#[test]
fn test_prepayment_recomputes_months_from_installment() {
    let mut store = seeded_store();
    let updated = store.apply_prepayment("emi-1", dec!(2000)).unwrap();
    assert_eq!(updated.remaining, dec!(10000));
    assert_eq!(updated.months_left, 5);
    assert_eq!(updated.version, 1);
    assert_eq!(store.get("emi-1").unwrap(), updated);
}

#[test]
fn test_prepayment_never_increases_remaining() {
    let mut store = seeded_store();
    let mut previous = store.get("emi-1").unwrap().remaining;
    for amount in [dec!(100), dec!(2500), dec!(999), dec!(4000)] {
        let plan = store.apply_prepayment("emi-1", amount).unwrap();
        assert!(plan.remaining <= previous);
        assert!(plan.remaining >= Decimal::ZERO);
        previous = plan.remaining;
    }
}

#[test]
fn test_out_of_range_prepayment_rejected_before_mutation() {
    let mut store = seeded_store();
    let before = store.get("emi-1").unwrap();
    for amount in [dec!(50), dec!(12001), Decimal::ZERO] {
        let err = store.apply_prepayment("emi-1", amount).unwrap_err();
        assert!(matches!(err, CardFinanceError::OutOfRange { .. }));
    }
    assert_eq!(store.get("emi-1").unwrap(), before);
}

#[test]
fn test_unknown_plan_is_not_found() {
    let mut store = seeded_store();
    let err = store
        .apply_suggestion_impact("emi-404", &SuggestionImpact::balance(dec!(-100)))
        .unwrap_err();
    assert!(matches!(err, CardFinanceError::NotFound { .. }));
}

#[test]
fn test_neutral_impact_is_idempotent() {
    let mut store = seeded_store();
    let before = store.get("emi-1").unwrap();
    let neutral = SuggestionImpact {
        balance_delta: Some(Decimal::ZERO),
        months_delta: Some(0),
        utilization_delta_pct: None,
    };
    let after = store.apply_suggestion_impact("emi-1", &neutral).unwrap();
    assert_eq!(after, before);
}

#[test]
fn test_repeated_impacts_compound_to_cleared() {
    let mut store = seeded_store();
    let impact = SuggestionImpact {
        balance_delta: Some(dec!(-5000)),
        months_delta: Some(-3),
        utilization_delta_pct: None,
    };
    store.apply_suggestion_impact("emi-1", &impact).unwrap();
    let plan = store.apply_suggestion_impact("emi-1", &impact).unwrap();
    assert_eq!(plan.months_left, 0);
    assert_eq!(plan.remaining, dec!(2000));
    assert_eq!(plan.status(), plans::PlanStatus::Cleared);

    let plan = store.apply_suggestion_impact("emi-1", &impact).unwrap();
    assert_eq!(plan.remaining, Decimal::ZERO);
    assert_eq!(plan.months_left, 0);
}

#[test]
fn test_stale_version_conflicts() {
    let mut store = seeded_store();
    store.apply_prepayment_if("emi-1", 0, dec!(1000)).unwrap();
    let err = store.apply_prepayment_if("emi-1", 0, dec!(1000)).unwrap_err();
    assert!(matches!(
        err,
        CardFinanceError::VersionConflict {
            expected: 0,
            actual: 1,
            ..
        }
    ));
}

#[test]
fn test_convert_balance_appends_plan() {
    let mut store = seeded_store();
    let card = CardSnapshot {
        id: "card-2".into(),
        title: "Millennia".into(),
        outstanding_label: Some("₹48,500".into()),
    };
    let catalog = offers::default_catalog();
    let offer = offers::find_offer(&catalog, "plan-2").unwrap();
    let plan = store
        .convert_balance(&card, card.outstanding(), offer, 12, None)
        .unwrap();
    assert_eq!(plan.id, "emi-2");
    assert_eq!(plan.source_label, "Millennia");
    assert_eq!(plan.remaining, dec!(48500));
    assert_eq!(plan.months_left, 12);
    assert_eq!(store.len(), 2);
    assert_eq!(store.total_remaining(), dec!(60500));
}

#[test]
fn test_convert_balance_rejects_tenure_beyond_cap() {
    let mut store = seeded_store();
    let card = CardSnapshot {
        id: "card-2".into(),
        title: "Millennia".into(),
        outstanding_label: Some("₹48,500".into()),
    };
    let catalog = offers::default_catalog();
    let err = store
        .convert_balance(&card, dec!(48500), &catalog[2], 100000, None)
        .unwrap_err();
    assert!(matches!(err, CardFinanceError::InvalidInput { .. }));
    assert_eq!(store.len(), 1);

    // Every plan the store holds can be loaded back
    assert!(plans::InstallmentPlanStore::from_plans(store.list(), prepayment::PrepaymentPolicy::default()).is_ok());
}

#[test]
fn test_create_plan_refuses_zero_installment() {
    let mut store = seeded_store();
    let quote = amortization::EmiQuote::zero(dec!(5000));
    let err = store.create_plan("Millennia", dec!(5000), &quote, 12).unwrap_err();
    assert!(matches!(err, CardFinanceError::InvalidInput { .. }));
    assert_eq!(store.len(), 1);

    let quote = amortization::compute_installment(dec!(5000), dec!(14), 12, Decimal::ZERO);
    let plan = store.create_plan("Millennia", dec!(5000), &quote, 12).unwrap();
    assert!(plan.monthly_installment > Decimal::ZERO);
    assert_eq!(plan.months_left, 12);
}
