use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanParameters {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub monthly_payment: f64,
    /// When set, the payment is derived to retire the loan in exactly this many months.
    pub target_months: Option<u32>,
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            principal: 20_000.0,
            annual_rate_percent: 5.5,
            monthly_payment: 250.0,
            target_months: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePoint {
    pub month: u32,
    pub balance: f64,
    pub interest_portion: f64,
    pub principal_portion: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ProjectionFailure {
    PaymentTooSmall,
}

impl ProjectionFailure {
    pub fn message(self) -> &'static str {
        match self {
            ProjectionFailure::PaymentTooSmall => {
                "Monthly payment is too small to cover interest — increase payment or choose a shorter term."
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub schedule: Vec<SchedulePoint>,
    pub total_interest: f64,
    pub total_principal: f64,
    pub failure: Option<ProjectionFailure>,
}

impl ProjectionResult {
    pub fn payment_too_small() -> Self {
        Self {
            failure: Some(ProjectionFailure::PaymentTooSmall),
            ..Self::default()
        }
    }

    pub fn months_to_payoff(&self) -> u32 {
        self.schedule.last().map(|p| p.month).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub months_to_payoff: u32,
    pub total_interest: f64,
    pub total_principal: f64,
    pub total_paid: f64,
    pub interest_percent: f64,
}
