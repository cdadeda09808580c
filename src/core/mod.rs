mod classifier;
mod engine;
mod error;
mod solver;
mod types;

pub use classifier::classify_withdrawal_rate;
pub use engine::{MONTHS_PER_YEAR, simulate};
pub use error::EngineError;
pub use solver::{
    CapitalSolveConfig, CapitalSolveIteration, CapitalSolveResult, solve_capital,
    solve_required_capital,
};
pub use types::{
    ClassificationResult, RiskTier, ScenarioInput, ShockParameters, SimulationResult,
    TrajectoryPoint,
};
