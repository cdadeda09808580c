use super::error::EngineError;
use super::types::{
    ScenarioInput, ShockParameters, SimulationResult, TrajectoryPoint, solvency_status,
};

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy)]
struct ProjectionOutcome {
    depletion_year: Option<u32>,
}

impl ProjectionOutcome {
    fn is_solvent(self) -> bool {
        self.depletion_year.is_none()
    }
}

#[derive(Debug)]
struct ProjectionState {
    balance: f64,
    dividend_income: f64,
    target_expense: f64,
    depletion_year: Option<u32>,
}

impl ProjectionState {
    fn new(input: &ScenarioInput) -> Self {
        Self {
            balance: input.capital,
            dividend_income: input.monthly_dividend_income,
            target_expense: input.monthly_target_spend,
            depletion_year: None,
        }
    }

    /// Year-boundary event: dividends and spending compound once per year.
    fn escalate(&mut self, input: &ScenarioInput) {
        self.dividend_income *= 1.0 + input.dividend_growth_rate;
        self.target_expense *= 1.0 + input.inflation_rate;
    }

    /// Runs one month and returns the gross withdrawal it called for.
    fn step_month(&mut self, input: &ScenarioInput, monthly_rate: f64, year: u32) -> f64 {
        let solvent = self.depletion_year.is_none();
        if solvent {
            self.balance += self.balance * monthly_rate;
        }

        let total_income = input.monthly_fixed_income + self.dividend_income;
        let net_shortfall = (self.target_expense - total_income).max(0.0);
        let gross_withdrawal = net_shortfall / (1.0 - input.tax_rate);

        // A depleted balance stays pinned at zero for the rest of the horizon.
        if solvent {
            self.balance -= gross_withdrawal;
            if self.balance <= 0.0 {
                self.depletion_year = Some(year);
                self.balance = 0.0;
            }
        }

        gross_withdrawal
    }
}

/// Runs one deterministic month-by-month projection and samples it yearly.
pub fn simulate(
    input: &ScenarioInput,
    shock: Option<ShockParameters>,
) -> Result<SimulationResult, EngineError> {
    input.validate()?;
    let shock = shock.unwrap_or_default();
    shock.validate()?;

    let mut trajectory = Vec::with_capacity(input.horizon_years as usize);
    let outcome = project(input, shock, Some(&mut trajectory));

    Ok(SimulationResult {
        trajectory,
        is_solvent: outcome.is_solvent(),
        depletion_year: outcome.depletion_year,
        status: solvency_status(outcome.depletion_year),
    })
}

/// Solvency check without building a trajectory. Inputs must already be
/// validated.
pub(crate) fn is_solvent(input: &ScenarioInput, shock: ShockParameters) -> bool {
    project(input, shock, None).is_solvent()
}

fn project(
    input: &ScenarioInput,
    shock: ShockParameters,
    mut trace: Option<&mut Vec<TrajectoryPoint>>,
) -> ProjectionOutcome {
    let mut state = ProjectionState::new(input);

    for year in 1..=input.horizon_years {
        if year > 1 {
            state.escalate(input);
        }

        let monthly_rate = monthly_growth_rate(input, shock, year);
        let mut gross_withdrawal = 0.0;
        for _ in 0..MONTHS_PER_YEAR {
            gross_withdrawal = state.step_month(input, monthly_rate, year);
        }

        if let Some(points) = trace.as_deref_mut() {
            points.push(TrajectoryPoint {
                year,
                net_expense: state.target_expense,
                gross_withdrawal,
                balance: state.balance,
            });
        }
    }

    ProjectionOutcome {
        depletion_year: state.depletion_year,
    }
}

fn monthly_growth_rate(input: &ScenarioInput, shock: ShockParameters, year: u32) -> f64 {
    let annual_rate = if shock.is_active(year) {
        shock.annual_rate
    } else {
        input.expected_return
    };
    annual_rate / MONTHS_PER_YEAR as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_input() -> ScenarioInput {
        ScenarioInput {
            capital: 500_000.0,
            monthly_fixed_income: 1_500.0,
            monthly_dividend_income: 500.0,
            monthly_target_spend: 4_000.0,
            tax_rate: 0.15,
            horizon_years: 25,
            inflation_rate: 0.025,
            dividend_growth_rate: 0.03,
            expected_return: 0.07,
        }
    }

    fn flat_input(capital: f64, monthly_spend: f64, years: u32) -> ScenarioInput {
        ScenarioInput {
            capital,
            monthly_fixed_income: 0.0,
            monthly_dividend_income: 0.0,
            monthly_target_spend: monthly_spend,
            tax_rate: 0.0,
            horizon_years: years,
            inflation_rate: 0.0,
            dividend_growth_rate: 0.0,
            expected_return: 0.0,
        }
    }

    #[test]
    fn golden_scenario_trajectory() {
        let result = simulate(&sample_input(), None).expect("valid input");

        assert_eq!(result.trajectory.len(), 25);
        for (idx, point) in result.trajectory.iter().enumerate() {
            assert_eq!(point.year, idx as u32 + 1);
        }

        let first = result.trajectory[0];
        assert_approx(first.net_expense, 4_000.0);
        assert_approx(first.gross_withdrawal, 2_000.0 / 0.85);
        assert_approx_tol(first.balance, 506_986.016_217, 1e-3);

        let second = result.trajectory[1];
        assert_approx(second.net_expense, 4_100.0);
        assert_approx(second.gross_withdrawal, (4_100.0 - 1_500.0 - 515.0) / 0.85);
        assert_approx_tol(second.balance, 513_237.793_583, 1e-3);

        let last = result.trajectory[24];
        assert_approx_tol(last.net_expense, 7_234.903_798, 1e-3);
        assert_approx_tol(last.gross_withdrawal, 5_551.184_406, 1e-3);
        assert_approx_tol(last.balance, 143_956.286_182, 1e-2);

        assert!(result.is_solvent);
        assert_eq!(result.depletion_year, None);
        assert_eq!(result.status, "Solvent");
    }

    #[test]
    fn golden_scenario_under_crash_depletes_in_year_fourteen() {
        let shock = ShockParameters {
            annual_rate: -0.20,
            duration_years: 2,
        };
        let result = simulate(&sample_input(), Some(shock)).expect("valid input");

        assert!(!result.is_solvent);
        assert_eq!(result.depletion_year, Some(14));
        assert_eq!(result.status, "Depleted at year 14");
        assert_eq!(result.trajectory.len(), 25);
        assert_approx_tol(result.trajectory[1].balance, 286_074.757_042, 1e-2);
    }

    #[test]
    fn zero_horizon_is_empty_and_solvent() {
        let mut input = sample_input();
        input.horizon_years = 0;

        let result = simulate(&input, None).expect("valid input");
        assert!(result.trajectory.is_empty());
        assert!(result.is_solvent);
        assert_eq!(result.status, "Solvent");
        assert_approx(result.final_balance(), 0.0);
    }

    #[test]
    fn zero_capital_with_shortfall_depletes_in_first_year() {
        let result = simulate(&flat_input(0.0, 100.0, 3), None).expect("valid input");
        assert!(!result.is_solvent);
        assert_eq!(result.depletion_year, Some(1));
        assert!(result.trajectory.iter().all(|p| p.balance == 0.0));
    }

    #[test]
    fn zero_balance_is_depleted_even_without_shortfall() {
        let mut input = flat_input(0.0, 100.0, 3);
        input.monthly_fixed_income = 100.0;

        let result = simulate(&input, None).expect("valid input");
        assert!(!result.is_solvent);
        assert_eq!(result.depletion_year, Some(1));
        assert!(result.trajectory.iter().all(|p| p.gross_withdrawal == 0.0));
    }

    #[test]
    fn exact_exhaustion_counts_as_depletion() {
        // 12 * 1000 drains 12_000 to exactly zero at the last month of year 1.
        let result = simulate(&flat_input(12_000.0, 1_000.0, 2), None).expect("valid input");
        assert_eq!(result.depletion_year, Some(1));
        assert_eq!(result.trajectory[0].balance, 0.0);
        assert_eq!(result.trajectory[1].balance, 0.0);
    }

    #[test]
    fn depleted_balance_does_not_recover_with_growth() {
        let mut input = flat_input(5_000.0, 1_000.0, 5);
        input.expected_return = 0.50;
        input.monthly_fixed_income = 0.0;

        let result = simulate(&input, None).expect("valid input");
        assert_eq!(result.depletion_year, Some(1));
        for point in &result.trajectory {
            assert_eq!(point.balance, 0.0);
            assert_approx(point.gross_withdrawal, 1_000.0);
        }
    }

    #[test]
    fn escalation_applies_once_per_year() {
        let mut input = flat_input(1_000_000.0, 1_000.0, 3);
        input.inflation_rate = 0.10;
        input.monthly_dividend_income = 100.0;
        input.dividend_growth_rate = 0.50;

        let result = simulate(&input, None).expect("valid input");
        assert_approx(result.trajectory[0].net_expense, 1_000.0);
        assert_approx(result.trajectory[1].net_expense, 1_100.0);
        assert_approx(result.trajectory[2].net_expense, 1_210.0);
        assert_approx(result.trajectory[1].gross_withdrawal, 1_100.0 - 150.0);
        assert_approx(result.trajectory[2].gross_withdrawal, 1_210.0 - 225.0);
    }

    #[test]
    fn tax_grosses_up_the_shortfall() {
        let mut input = flat_input(100_000.0, 1_000.0, 1);
        input.tax_rate = 0.20;

        let result = simulate(&input, None).expect("valid input");
        assert_approx(result.trajectory[0].gross_withdrawal, 1_250.0);
        assert_approx(result.trajectory[0].balance, 100_000.0 - 12.0 * 1_250.0);
    }

    #[test]
    fn zero_duration_shock_matches_baseline() {
        let shock = ShockParameters {
            annual_rate: -0.50,
            duration_years: 0,
        };
        let baseline = simulate(&sample_input(), None).expect("valid input");
        let shocked = simulate(&sample_input(), Some(shock)).expect("valid input");
        assert_eq!(baseline, shocked);
    }

    #[test]
    fn rejects_tax_rate_of_one() {
        let mut input = sample_input();
        input.tax_rate = 1.0;
        let err = simulate(&input, None).expect_err("must reject tax rate 1");
        assert!(matches!(err, EngineError::InvalidInput(msg) if msg.contains("tax_rate")));
    }

    #[test]
    fn rejects_non_finite_fields() {
        let mut input = sample_input();
        input.expected_return = f64::NAN;
        assert!(simulate(&input, None).is_err());

        let mut input = sample_input();
        input.monthly_target_spend = f64::INFINITY;
        assert!(simulate(&input, None).is_err());

        let shock = ShockParameters {
            annual_rate: f64::NEG_INFINITY,
            duration_years: 1,
        };
        assert!(simulate(&sample_input(), Some(shock)).is_err());
    }

    #[test]
    fn rejects_negative_income() {
        let mut input = sample_input();
        input.monthly_fixed_income = -1.0;
        let err = simulate(&input, None).expect_err("must reject negative income");
        assert!(err.to_string().contains("monthly_fixed_income"));
    }

    #[test]
    fn solvency_check_matches_full_simulation() {
        let shock = ShockParameters {
            annual_rate: -0.20,
            duration_years: 2,
        };
        let input = sample_input();
        assert!(is_solvent(&input, ShockParameters::default()));
        assert!(!is_solvent(&input, shock));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_simulation_is_deterministic(
            capital in 0u32..2_000_000,
            fixed in 0u32..5_000,
            dividend in 0u32..3_000,
            spend in 0u32..12_000,
            tax_bp in 0u32..6_000,
            years in 0u32..50,
            inflation_bp in 0u32..1_000,
            growth_bp in 0u32..1_000,
            return_bp in -3_000i32..1_500,
            shock_bp in -5_000i32..0,
            shock_years in 0u32..10
        ) {
            let input = ScenarioInput {
                capital: capital as f64,
                monthly_fixed_income: fixed as f64,
                monthly_dividend_income: dividend as f64,
                monthly_target_spend: spend as f64,
                tax_rate: tax_bp as f64 / 10_000.0,
                horizon_years: years,
                inflation_rate: inflation_bp as f64 / 10_000.0,
                dividend_growth_rate: growth_bp as f64 / 10_000.0,
                expected_return: return_bp as f64 / 10_000.0,
            };
            let shock = ShockParameters {
                annual_rate: shock_bp as f64 / 10_000.0,
                duration_years: shock_years,
            };

            let first = simulate(&input, Some(shock)).expect("valid input");
            let second = simulate(&input, Some(shock)).expect("valid input");
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.trajectory.len(), years as usize);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_more_capital_never_hurts(
            capital in 0u32..1_500_000,
            extra in 1_000u32..500_000,
            fixed in 0u32..3_000,
            spend in 0u32..10_000,
            tax_bp in 0u32..5_000,
            years in 1u32..40,
            inflation_bp in 0u32..800,
            return_bp in -5_000i32..1_500
        ) {
            let low = ScenarioInput {
                capital: capital as f64,
                monthly_fixed_income: fixed as f64,
                monthly_dividend_income: 0.0,
                monthly_target_spend: spend as f64,
                tax_rate: tax_bp as f64 / 10_000.0,
                horizon_years: years,
                inflation_rate: inflation_bp as f64 / 10_000.0,
                dividend_growth_rate: 0.0,
                expected_return: return_bp as f64 / 10_000.0,
            };
            let high = low.with_capital(low.capital + extra as f64);

            let low_result = simulate(&low, None).expect("valid input");
            let high_result = simulate(&high, None).expect("valid input");

            prop_assert!(high_result.final_balance() >= low_result.final_balance());
            if low_result.is_solvent {
                prop_assert!(high_result.is_solvent);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_depletion_is_permanent(
            capital in 0u32..200_000,
            spend in 500u32..8_000,
            years in 1u32..40,
            return_bp in -2_000i32..2_000,
            inflation_bp in 0u32..800
        ) {
            let mut input = flat_input(capital as f64, spend as f64, years);
            input.expected_return = return_bp as f64 / 10_000.0;
            input.inflation_rate = inflation_bp as f64 / 10_000.0;

            let result = simulate(&input, None).expect("valid input");
            if let Some(depleted) = result.depletion_year {
                prop_assert!(!result.is_solvent);
                for point in result.trajectory.iter().filter(|p| p.year >= depleted) {
                    prop_assert_eq!(point.balance, 0.0);
                }
            } else {
                prop_assert!(result.trajectory.iter().all(|p| p.balance > 0.0));
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_early_crash_lowers_year_two_balance(
            capital in 300_000u32..1_000_000,
            fixed in 0u32..2_000,
            spend in 0u32..3_000,
            tax_bp in 0u32..5_000,
            return_bp in 0i32..1_200,
            inflation_bp in 0u32..500
        ) {
            let input = ScenarioInput {
                capital: capital as f64,
                monthly_fixed_income: fixed as f64,
                monthly_dividend_income: 0.0,
                monthly_target_spend: spend as f64,
                tax_rate: tax_bp as f64 / 10_000.0,
                horizon_years: 5,
                inflation_rate: inflation_bp as f64 / 10_000.0,
                dividend_growth_rate: 0.0,
                expected_return: return_bp as f64 / 10_000.0,
            };
            let shock = ShockParameters {
                annual_rate: -0.20,
                duration_years: 2,
            };

            let baseline = simulate(&input, None).expect("valid input");
            let stressed = simulate(&input, Some(shock)).expect("valid input");
            prop_assert!(stressed.trajectory[1].balance < baseline.trajectory[1].balance);
        }
    }
}
