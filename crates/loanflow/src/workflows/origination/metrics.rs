use serde::Serialize;

use super::domain::ApplicationDraft;

/// Derived underwriting ratios, formatted to two decimals for the wire.
/// Any member may be absent while the wizard is mid-flight; these values are
/// recomputed on every create and update and client copies are discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_interest: Option<String>,
}

/// Compute LTV, DSCR, and first-month interest from whatever fields are
/// present. A metric is emitted only when all of its inputs parse to positive
/// numbers; parse failures simply omit the metric.
pub fn compute_metrics(draft: &ApplicationDraft) -> LoanMetrics {
    let specifics = draft.loan_specifics.as_ref();

    let loan_amount = positive(parse_amount(draft.loan_amount.as_deref()));
    let property_value =
        positive(specifics.and_then(|s| parse_amount(s.property_value.as_deref())));
    let interest_rate = positive(specifics.and_then(|s| parse_amount(s.interest_rate.as_deref())));
    let term_years = positive(specifics.and_then(|s| parse_amount(s.loan_term.as_deref())));
    let annual_noi = positive(parse_amount(draft.annual_noi.as_deref()));

    let mut metrics = LoanMetrics::default();

    if let (Some(amount), Some(value)) = (loan_amount, property_value) {
        metrics.ltv = Some(format!("{:.2}", amount / value * 100.0));
    }

    if let (Some(amount), Some(rate)) = (loan_amount, interest_rate) {
        metrics.monthly_interest = Some(format!("{:.2}", amount * (rate / 100.0) / 12.0));
    }

    if let (Some(noi), Some(amount), Some(rate), Some(term)) =
        (annual_noi, loan_amount, interest_rate, term_years)
    {
        let annual_debt_service = monthly_payment(amount, rate, term) * 12.0;
        if annual_debt_service > 0.0 {
            metrics.dscr = Some(format!("{:.2}", noi / annual_debt_service));
        }
    }

    metrics
}

/// Standard amortizing-loan payment, `M = P·r·(1+r)^n / ((1+r)^n − 1)` with
/// the monthly rate `r` and payment count `n`. A zero rate degenerates to
/// straight-line principal. The amortized branch rounds to cents.
pub fn monthly_payment(principal: f64, annual_rate: f64, term_years: f64) -> f64 {
    let monthly_rate = annual_rate / 100.0 / 12.0;
    let payments = term_years * 12.0;

    if monthly_rate == 0.0 {
        return principal / payments;
    }

    let growth = (1.0 + monthly_rate).powf(payments);
    let payment = principal * monthly_rate * growth / (growth - 1.0);
    (payment * 100.0).round() / 100.0
}

fn parse_amount(raw: Option<&str>) -> Option<f64> {
    let cleaned = raw?.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| *value > 0.0)
}
