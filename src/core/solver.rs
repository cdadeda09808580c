use serde::Serialize;

use super::engine::is_solvent;
use super::error::EngineError;
use super::types::{ScenarioInput, ShockParameters};

#[derive(Debug, Clone, Copy)]
pub struct CapitalSolveConfig {
    /// Initial upper bound as a multiple of the starting capital.
    pub upper_bound_multiple: f64,
    pub bisection_iterations: u32,
    /// Double the upper bound while it is still insolvent.
    pub adaptive_upper_bound: bool,
    pub max_bound_expansions: u32,
}

impl Default for CapitalSolveConfig {
    fn default() -> Self {
        Self {
            upper_bound_multiple: 10.0,
            bisection_iterations: 30,
            adaptive_upper_bound: true,
            max_bound_expansions: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_capital: f64,
    pub solvent: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalSolveResult {
    pub required_capital: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub bound_expansions: u32,
    /// False when no solvent capital was found up to `search_max`; the
    /// required capital is then only a lower bound on the true answer.
    pub bound_verified: bool,
    #[serde(skip)]
    pub iterations: Vec<CapitalSolveIteration>,
    pub message: String,
}

impl CapitalSolveResult {
    pub fn shortfall(&self, capital: f64) -> f64 {
        self.required_capital - capital
    }
}

/// Minimum starting capital that stays solvent over the whole horizon.
///
/// Fails with `SearchBoundExceeded` when no solvent bound could be found.
pub fn solve_required_capital(
    input: &ScenarioInput,
    shock: Option<ShockParameters>,
) -> Result<f64, EngineError> {
    let result = solve_capital(input, shock, CapitalSolveConfig::default())?;
    if !result.bound_verified {
        return Err(EngineError::SearchBoundExceeded {
            bound: result.search_max,
        });
    }
    Ok(result.required_capital)
}

pub fn solve_capital(
    input: &ScenarioInput,
    shock: Option<ShockParameters>,
    config: CapitalSolveConfig,
) -> Result<CapitalSolveResult, EngineError> {
    input.validate()?;
    let shock = shock.unwrap_or_default();
    shock.validate()?;
    validate_config(input, config)?;

    let search_min = input.capital;
    let mut lo = search_min;
    let mut hi = input.capital * config.upper_bound_multiple;
    let mut bound_expansions = 0;
    let mut bound_verified = solvent_at(input, shock, hi);

    if config.adaptive_upper_bound {
        while !bound_verified && bound_expansions < config.max_bound_expansions {
            // The rejected bound is a valid insolvent lower bound.
            lo = hi;
            hi *= 2.0;
            bound_expansions += 1;
            log::debug!("capital search bound expanded to {hi:.2} (expansion {bound_expansions})");
            bound_verified = solvent_at(input, shock, hi);
        }
    }

    if !bound_verified {
        log::warn!(
            "no solvent capital found up to {hi:.2}; required capital is a lower bound only"
        );
    }

    let search_max = hi;
    let mut iterations = Vec::with_capacity(config.bisection_iterations as usize);
    for iteration in 1..=config.bisection_iterations {
        let mid = (lo + hi) * 0.5;
        let solvent = solvent_at(input, shock, mid);
        iterations.push(CapitalSolveIteration {
            iteration,
            lower_bound: lo,
            upper_bound: hi,
            candidate_capital: mid,
            solvent,
        });

        if solvent {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let message = if !bound_verified {
        format!("Search bound {search_max:.2} is still insufficient; result is a lower bound.")
    } else if bound_expansions > 0 {
        format!("Solved required capital after {bound_expansions} bound expansion(s).")
    } else {
        "Solved required capital.".to_string()
    };
    log::debug!(
        "capital search finished at {hi:.2} after {} bisection steps",
        iterations.len()
    );

    Ok(CapitalSolveResult {
        required_capital: hi,
        search_min,
        search_max,
        bound_expansions,
        bound_verified,
        iterations,
        message,
    })
}

fn solvent_at(base_input: &ScenarioInput, shock: ShockParameters, capital: f64) -> bool {
    is_solvent(&base_input.with_capital(capital), shock)
}

fn validate_config(input: &ScenarioInput, config: CapitalSolveConfig) -> Result<(), EngineError> {
    if input.capital <= 0.0 {
        return Err(EngineError::InvalidInput(
            "capital must be > 0 to bound the capital search".to_string(),
        ));
    }
    if !config.upper_bound_multiple.is_finite() || config.upper_bound_multiple <= 1.0 {
        return Err(EngineError::InvalidInput(
            "upper_bound_multiple must be > 1".to_string(),
        ));
    }
    if config.bisection_iterations == 0 {
        return Err(EngineError::InvalidInput(
            "bisection_iterations must be > 0".to_string(),
        ));
    }
    Ok(())
}
