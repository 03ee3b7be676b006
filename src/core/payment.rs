use super::LoanParameters;

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 12.0 / 100.0
}

/// Effective monthly payment for a projection.
///
/// A target payoff duration takes precedence over the stored payment and is
/// converted with the fixed-rate annuity formula. Degenerate combinations are
/// returned as-is; the simulator is responsible for rejecting them.
///
/// The discounted form keeps the result finite for any term: once
/// `(1 + r)^-n` underflows the payment settles at exactly the first month's
/// interest.
pub fn resolve_payment(params: &LoanParameters) -> f64 {
    let months = match params.target_months {
        Some(months) if months > 0 => months,
        _ => return params.monthly_payment,
    };

    let r = monthly_rate(params.annual_rate_percent);
    // Rates too small to move `1 + r` behave like an interest-free loan.
    if 1.0 + r == 1.0 {
        return params.principal / months as f64;
    }

    let discount = (1.0 + r).powf(-(months as f64));
    params.principal * r / (1.0 - discount)
}
