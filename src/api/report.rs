use serde::Serialize;

use super::allocation::ResolvedAllocation;
use crate::core::{
    CapitalSolveConfig, ClassificationResult, EngineError, ScenarioInput, ShockParameters,
    SimulationResult, classify_withdrawal_rate, simulate, solve_capital,
};

#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest {
    pub input: ScenarioInput,
    pub allocation: ResolvedAllocation,
    pub stress: Option<ShockParameters>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalRequirement {
    pub required_capital: f64,
    pub additional_capital_needed: f64,
    pub bound_verified: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub simulation: SimulationResult,
    /// Only reported for solvent runs.
    pub ending_balance: Option<f64>,
    /// Only solved for depleted runs.
    pub capital_requirement: Option<CapitalRequirement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressOutcome {
    pub shock: ShockParameters,
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPoint {
    pub year: u32,
    pub baseline_balance: f64,
    pub stressed_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub input: ScenarioInput,
    pub allocation: ResolvedAllocation,
    pub classification: ClassificationResult,
    pub baseline: ScenarioOutcome,
    pub stress: Option<StressOutcome>,
    pub comparison: Vec<ComparisonPoint>,
}

pub fn evaluate(request: &EvaluationRequest) -> Result<EvaluationReport, EngineError> {
    let input = &request.input;
    let classification = classify_withdrawal_rate(input)?;
    let baseline = run_scenario(input, None)?;

    let stress = match request.stress {
        Some(shock) => Some(StressOutcome {
            shock,
            outcome: run_scenario(input, Some(shock))?,
        }),
        None => None,
    };

    let comparison = stress
        .as_ref()
        .map(|stressed| compare_balances(&baseline.simulation, &stressed.outcome.simulation))
        .unwrap_or_default();

    log::info!(
        "evaluated scenario: rate={:.4} tier={:?} baseline={} stress={}",
        classification.withdrawal_rate,
        classification.tier,
        baseline.simulation.status,
        stress
            .as_ref()
            .map(|s| s.outcome.simulation.status.as_str())
            .unwrap_or("not run"),
    );

    Ok(EvaluationReport {
        input: *input,
        allocation: request.allocation,
        classification,
        baseline,
        stress,
        comparison,
    })
}

fn run_scenario(
    input: &ScenarioInput,
    shock: Option<ShockParameters>,
) -> Result<ScenarioOutcome, EngineError> {
    let simulation = simulate(input, shock)?;
    if simulation.is_solvent {
        return Ok(ScenarioOutcome {
            ending_balance: Some(simulation.final_balance()),
            capital_requirement: None,
            simulation,
        });
    }

    let solved = solve_capital(input, shock, CapitalSolveConfig::default())?;
    Ok(ScenarioOutcome {
        simulation,
        ending_balance: None,
        capital_requirement: Some(CapitalRequirement {
            required_capital: solved.required_capital,
            additional_capital_needed: solved.shortfall(input.capital),
            bound_verified: solved.bound_verified,
            message: solved.message,
        }),
    })
}

fn compare_balances(
    baseline: &SimulationResult,
    stressed: &SimulationResult,
) -> Vec<ComparisonPoint> {
    baseline
        .trajectory
        .iter()
        .zip(&stressed.trajectory)
        .map(|(base, stress)| ComparisonPoint {
            year: base.year,
            baseline_balance: base.balance,
            stressed_balance: stress.balance,
        })
        .collect()
}
