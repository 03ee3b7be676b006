use tracing::debug;

use super::payment::{monthly_rate, resolve_payment};
use super::types::{LoanParameters, ProjectionResult, ProjectionSummary, SchedulePoint};

/// Safety bound on schedule length (500 years). Reaching it truncates the
/// schedule rather than failing.
pub const MAX_SCHEDULE_MONTHS: u32 = 6000;

pub fn project(params: &LoanParameters) -> ProjectionResult {
    let payment = resolve_payment(params);
    simulate_schedule(params.principal, params.annual_rate_percent, payment)
}

pub fn simulate_schedule(
    principal: f64,
    annual_rate_percent: f64,
    effective_payment: f64,
) -> ProjectionResult {
    simulate_schedule_capped(
        principal,
        annual_rate_percent,
        effective_payment,
        MAX_SCHEDULE_MONTHS,
    )
}

pub fn simulate_schedule_capped(
    principal: f64,
    annual_rate_percent: f64,
    effective_payment: f64,
    max_months: u32,
) -> ProjectionResult {
    let r = monthly_rate(annual_rate_percent);

    // The balance never grows under a fixed rate, so the opening balance is
    // the worst case for interest accrual. NaN payments fail here as well.
    if effective_payment.is_nan() || effective_payment <= principal * r {
        debug!(
            principal,
            annual_rate_percent, effective_payment, "payment does not cover interest"
        );
        return ProjectionResult::payment_too_small();
    }

    let mut schedule = Vec::new();
    let mut balance = principal;
    let mut month = 0;
    let mut total_interest = 0.0;
    let mut total_principal = 0.0;

    while balance > 0.0 && month < max_months {
        month += 1;
        let interest = balance * r;
        let principal_portion = (effective_payment - interest).min(balance);
        balance = (balance - principal_portion).max(0.0);
        total_interest += interest;
        total_principal += principal_portion;
        schedule.push(SchedulePoint {
            month,
            balance,
            interest_portion: interest,
            principal_portion,
        });
    }

    debug!(
        months = schedule.len(),
        total_interest, total_principal, "simulated payoff schedule"
    );

    ProjectionResult {
        schedule,
        total_interest,
        total_principal,
        failure: None,
    }
}

pub fn summarize(result: &ProjectionResult) -> ProjectionSummary {
    let total_paid = result.total_interest + result.total_principal;
    let interest_percent = if total_paid > 0.0 {
        result.total_interest / total_paid * 100.0
    } else {
        0.0
    };
    ProjectionSummary {
        months_to_payoff: result.months_to_payoff(),
        total_interest: result.total_interest,
        total_principal: result.total_principal,
        total_paid,
        interest_percent,
    }
}
