use serde::Serialize;

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInput {
    pub capital: f64,
    pub monthly_fixed_income: f64,
    pub monthly_dividend_income: f64,
    pub monthly_target_spend: f64,
    pub tax_rate: f64,
    pub horizon_years: u32,
    pub inflation_rate: f64,
    pub dividend_growth_rate: f64,
    pub expected_return: f64,
}

impl ScenarioInput {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("capital", self.capital),
            ("monthly_fixed_income", self.monthly_fixed_income),
            ("monthly_dividend_income", self.monthly_dividend_income),
            ("monthly_target_spend", self.monthly_target_spend),
            ("inflation_rate", self.inflation_rate),
            ("dividend_growth_rate", self.dividend_growth_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidInput(format!(
                    "{name} must be a finite value >= 0, got {value}"
                )));
            }
        }

        if !self.expected_return.is_finite() {
            return Err(EngineError::InvalidInput(
                "expected_return must be finite".to_string(),
            ));
        }

        // Withdrawals are grossed up by 1 / (1 - tax_rate).
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(EngineError::InvalidInput(format!(
                "tax_rate must be in [0, 1), got {}",
                self.tax_rate
            )));
        }

        Ok(())
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_years * 12
    }

    /// Income gap for the first month, before any escalation.
    pub fn initial_monthly_gap(&self) -> f64 {
        self.monthly_target_spend - (self.monthly_fixed_income + self.monthly_dividend_income)
    }

    pub fn with_capital(&self, capital: f64) -> Self {
        Self { capital, ..*self }
    }
}

/// Temporary override of the expected return for the first `duration_years`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockParameters {
    pub annual_rate: f64,
    pub duration_years: u32,
}

impl ShockParameters {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.annual_rate.is_finite() {
            return Err(EngineError::InvalidInput(
                "shock annual_rate must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_active(&self, year: u32) -> bool {
        year <= self.duration_years
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub year: u32,
    pub net_expense: f64,
    pub gross_withdrawal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub trajectory: Vec<TrajectoryPoint>,
    pub is_solvent: bool,
    pub depletion_year: Option<u32>,
    pub status: String,
}

impl SimulationResult {
    pub fn final_balance(&self) -> f64 {
        self.trajectory.last().map(|p| p.balance).unwrap_or(0.0)
    }
}

pub fn solvency_status(depletion_year: Option<u32>) -> String {
    match depletion_year {
        None => "Solvent".to_string(),
        Some(year) => format!("Depleted at year {year}"),
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Secure,
    Excellent,
    Good,
    Risky,
    Danger,
    Critical,
}

impl RiskTier {
    pub const EXCELLENT_MAX_RATE: f64 = 0.035;
    pub const GOOD_MAX_RATE: f64 = 0.045;
    pub const RISKY_MAX_RATE: f64 = 0.06;

    /// Upper bounds are inclusive.
    pub fn for_rate(rate: f64) -> Self {
        if rate <= Self::EXCELLENT_MAX_RATE {
            RiskTier::Excellent
        } else if rate <= Self::GOOD_MAX_RATE {
            RiskTier::Good
        } else if rate <= Self::RISKY_MAX_RATE {
            RiskTier::Risky
        } else {
            RiskTier::Danger
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Secure => "SECURE",
            RiskTier::Excellent => "EXCELLENT (< 3.5%)",
            RiskTier::Good => "GOOD (Industry Std)",
            RiskTier::Risky => "RISKY (High Risk)",
            RiskTier::Danger => "DANGER (> 6.0%)",
            RiskTier::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub withdrawal_rate: f64,
    pub tier: RiskTier,
    pub label: &'static str,
}

impl ClassificationResult {
    pub fn new(withdrawal_rate: f64, tier: RiskTier) -> Self {
        Self {
            withdrawal_rate,
            tier,
            label: tier.label(),
        }
    }
}
