use super::error::EngineError;
use super::types::{ClassificationResult, RiskTier, ScenarioInput};

/// Rates the first year's gross funding need against starting capital.
///
/// Does not run a projection: escalation, growth and depletion are ignored.
pub fn classify_withdrawal_rate(
    input: &ScenarioInput,
) -> Result<ClassificationResult, EngineError> {
    input.validate()?;

    let gap = input.initial_monthly_gap();
    if gap <= 0.0 {
        return Ok(ClassificationResult::new(0.0, RiskTier::Secure));
    }

    let gross_annual_need = (gap * 12.0) / (1.0 - input.tax_rate);
    if input.capital <= 0.0 {
        return Ok(ClassificationResult::new(0.0, RiskTier::Critical));
    }

    let rate = gross_annual_need / input.capital;
    Ok(ClassificationResult::new(rate, RiskTier::for_rate(rate)))
}
