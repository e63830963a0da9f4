use super::common::*;
use crate::workflows::origination::domain::{ApplicationDraft, LoanSpecifics};
use crate::workflows::origination::metrics::{compute_metrics, monthly_payment};

#[test]
fn ltv_rounds_to_two_decimals() {
    let metrics = compute_metrics(&full_draft());
    assert_eq!(metrics.ltv.as_deref(), Some("75.00"));
}

#[test]
fn monthly_interest_is_first_month_interest_only() {
    // 3,000,000 at 5.5% annual -> 13,750 per month.
    let metrics = compute_metrics(&full_draft());
    assert_eq!(metrics.monthly_interest.as_deref(), Some("13750.00"));
}

#[test]
fn dscr_matches_amortization_reference() {
    let metrics = compute_metrics(&full_draft());

    let payment = monthly_payment(3_000_000.0, 5.5, 10.0);
    let expected = format!("{:.2}", 450_000.0 / (payment * 12.0));
    assert_eq!(metrics.dscr.as_deref(), Some(expected.as_str()));
    assert_eq!(expected, "1.15");
}

#[test]
fn metric_computation_is_deterministic() {
    let draft = full_draft();
    assert_eq!(compute_metrics(&draft), compute_metrics(&draft));
    assert_eq!(
        monthly_payment(3_000_000.0, 5.5, 10.0),
        monthly_payment(3_000_000.0, 5.5, 10.0)
    );
}

#[test]
fn zero_rate_degenerates_to_straight_line() {
    assert_eq!(monthly_payment(300_000.0, 0.0, 10.0), 2_500.0);
}

#[test]
fn non_numeric_inputs_omit_only_the_affected_metrics() {
    let mut draft = full_draft();
    draft.loan_amount = Some("three million".to_string());

    let metrics = compute_metrics(&draft);
    assert!(metrics.ltv.is_none());
    assert!(metrics.monthly_interest.is_none());
    assert!(metrics.dscr.is_none());

    // Property value broken, loan amount fine: interest survives.
    let mut draft = full_draft();
    if let Some(specifics) = draft.loan_specifics.as_mut() {
        specifics.property_value = Some("n/a".to_string());
    }
    let metrics = compute_metrics(&draft);
    assert!(metrics.ltv.is_none());
    assert_eq!(metrics.monthly_interest.as_deref(), Some("13750.00"));
    assert_eq!(metrics.dscr.as_deref(), Some("1.15"));
}

#[test]
fn zero_or_negative_inputs_omit_metrics() {
    let mut draft = full_draft();
    if let Some(specifics) = draft.loan_specifics.as_mut() {
        specifics.property_value = Some("0".to_string());
    }
    draft.annual_noi = Some("-1".to_string());

    let metrics = compute_metrics(&draft);
    assert!(metrics.ltv.is_none());
    assert!(metrics.dscr.is_none());
}

#[test]
fn comma_grouping_is_tolerated() {
    let mut draft = full_draft();
    draft.loan_amount = Some("3,000,000".to_string());
    if let Some(specifics) = draft.loan_specifics.as_mut() {
        specifics.property_value = Some("4,000,000".to_string());
    }

    let metrics = compute_metrics(&draft);
    assert_eq!(metrics.ltv.as_deref(), Some("75.00"));
}

#[test]
fn empty_draft_yields_no_metrics() {
    let metrics = compute_metrics(&ApplicationDraft::default());
    assert!(metrics.ltv.is_none());
    assert!(metrics.dscr.is_none());
    assert!(metrics.monthly_interest.is_none());

    let metrics = compute_metrics(&ApplicationDraft {
        loan_specifics: Some(LoanSpecifics::default()),
        ..ApplicationDraft::default()
    });
    assert!(metrics.ltv.is_none());
}
