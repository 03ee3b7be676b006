use serde::{Deserialize, Serialize};

use super::chart::format_currency;

const MIN_EMERGENCY_FUND: f64 = 1_000.0;
const EMERGENCY_FUND_INCOME_SHARE: f64 = 0.5;
const RETIREMENT_REVIEW_AGE: u32 = 50;

/// Life-stage profile collected by the onboarding questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlanRequest {
    pub age: u32,
    /// Approximate annual income in USD.
    pub income: f64,
    pub has_children: bool,
    pub is_student: bool,
    pub is_graduating: bool,
    /// High-interest debt only.
    pub has_debt: bool,
}

impl PlanRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !self.income.is_finite() || self.income < 0.0 {
            return Err("income must be >= 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub title: String,
    pub description: String,
}

impl Advice {
    fn new(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResponse {
    pub steps: Vec<Advice>,
}

/// Ordered action list for a profile. Rules are fixed and deterministic.
pub fn generate_plan(request: &PlanRequest) -> PlanResponse {
    let mut steps = Vec::new();

    let emergency_fund = MIN_EMERGENCY_FUND.max(request.income * EMERGENCY_FUND_INCOME_SHARE);
    steps.push(Advice::new(
        "Build an emergency fund",
        format!(
            "Set aside a buffer of at least {} to handle unexpected expenses. \
             Aim for 3–6 months of living expenses if possible.",
            format_currency(emergency_fund)
        ),
    ));

    if request.has_debt {
        steps.push(Advice::new(
            "Pay down high‑interest debt",
            "Focus on paying off any debt with an interest rate above 7% \
             before investing heavily elsewhere. Consider the debt avalanche method: \
             list balances by interest rate and tackle the highest first.",
        ));
    }

    steps.push(Advice::new(
        "Contribute to retirement plan",
        "If your employer offers a 401(k) or similar plan with a match, \
         contribute at least enough to get the full match. It's essentially free money.",
    ));

    if request.is_student || request.is_graduating {
        steps.push(Advice::new(
            "Create a starter budget",
            "Develop a simple monthly budget to track expenses and avoid accumulating debt. \
             Use tools like the 50/30/20 rule to allocate needs, wants and savings.",
        ));
        steps.push(Advice::new(
            "Build credit responsibly",
            "Open a low‑fee credit card (if you don't have one) and pay the balance \
             in full each month. A strong credit history will help with future loans \
             and housing.",
        ));
    }

    if request.has_children {
        steps.push(Advice::new(
            "Purchase term life insurance",
            "If you have dependents, ensure they are protected by obtaining \
             affordable term life insurance. Choose coverage that can replace your \
             income for 10–15 years.",
        ));
    }

    if request.age >= RETIREMENT_REVIEW_AGE {
        steps.push(Advice::new(
            "Review retirement readiness",
            "Assess your progress towards retirement. Increase contributions \
             if you're behind and consider meeting with a professional for a detailed plan.",
        ));
    }

    PlanResponse { steps }
}
