mod allocation;
mod report;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use allocation::{AllocationStrategy, AssetMix, ResolvedAllocation, resolve_allocation};
pub use report::{
    CapitalRequirement, ComparisonPoint, EvaluationReport, EvaluationRequest, ScenarioOutcome,
    StressOutcome, evaluate,
};

use crate::core::{ScenarioInput, ShockParameters};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAllocationStrategy {
    AggressiveGrowth,
    ConservativeIncome,
    Custom,
}

impl From<CliAllocationStrategy> for AllocationStrategy {
    fn from(value: CliAllocationStrategy) -> Self {
        match value {
            CliAllocationStrategy::AggressiveGrowth => AllocationStrategy::AggressiveGrowth,
            CliAllocationStrategy::ConservativeIncome => AllocationStrategy::ConservativeIncome,
            CliAllocationStrategy::Custom => AllocationStrategy::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAllocationStrategy {
    #[serde(alias = "aggressiveGrowth", alias = "aggressive_growth", alias = "aggressive")]
    AggressiveGrowth,
    #[serde(
        alias = "conservativeIncome",
        alias = "conservative_income",
        alias = "conservative"
    )]
    ConservativeIncome,
    Custom,
}

impl From<ApiAllocationStrategy> for CliAllocationStrategy {
    fn from(value: ApiAllocationStrategy) -> Self {
        match value {
            ApiAllocationStrategy::AggressiveGrowth => CliAllocationStrategy::AggressiveGrowth,
            ApiAllocationStrategy::ConservativeIncome => CliAllocationStrategy::ConservativeIncome,
            ApiAllocationStrategy::Custom => CliAllocationStrategy::Custom,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EvaluatePayload {
    capital: Option<f64>,
    fixed_income: Option<f64>,
    dividend_income: Option<f64>,
    target_spend: Option<f64>,
    tax_rate: Option<f64>,
    horizon_years: Option<u32>,

    inflation_rate: Option<f64>,
    dividend_growth_rate: Option<f64>,

    strategy: Option<ApiAllocationStrategy>,
    equity: Option<f64>,
    metals: Option<f64>,
    debt: Option<f64>,
    cash: Option<f64>,
    expected_return: Option<f64>,

    stress_test: Option<bool>,
    crash_rate: Option<f64>,
    crash_years: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "runway",
    about = "Deterministic capital runway check: solvency, required capital and withdrawal-rate risk"
)]
struct Cli {
    #[arg(long, default_value_t = 500_000.0, help = "Total starting capital")]
    capital: f64,
    #[arg(long, default_value_t = 1_500.0, help = "Fixed income per month")]
    fixed_income: f64,
    #[arg(long, default_value_t = 500.0, help = "Dividend income per month")]
    dividend_income: f64,
    #[arg(
        long,
        default_value_t = 4_000.0,
        help = "Target spend per month in today's money"
    )]
    target_spend: f64,
    #[arg(long, default_value_t = 15.0, help = "Flat tax rate on withdrawals in percent")]
    tax_rate: f64,
    #[arg(long, default_value_t = 25, help = "Years the capital must last")]
    horizon_years: u32,
    #[arg(long, default_value_t = 2.5, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual dividend growth in percent")]
    dividend_growth_rate: f64,
    #[arg(long, value_enum, default_value_t = CliAllocationStrategy::AggressiveGrowth)]
    strategy: CliAllocationStrategy,
    #[arg(long, default_value_t = 50.0, help = "Custom allocation: equity percent")]
    equity: f64,
    #[arg(long, default_value_t = 10.0, help = "Custom allocation: metals percent")]
    metals: f64,
    #[arg(long, default_value_t = 30.0, help = "Custom allocation: debt percent")]
    debt: f64,
    #[arg(long, default_value_t = 10.0, help = "Custom allocation: cash percent")]
    cash: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, defaults to the strategy's historical estimate"
    )]
    expected_return: Option<f64>,
    #[arg(long, help = "Also run the crash scenario")]
    stress_test: bool,
    #[arg(
        long,
        default_value_t = -20.0,
        allow_negative_numbers = true,
        help = "Annual return during the crash in percent"
    )]
    crash_rate: f64,
    #[arg(long, default_value_t = 2, help = "Crash duration in years from the start")]
    crash_years: u32,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<EvaluationRequest, String> {
    if !cli.capital.is_finite() || cli.capital <= 0.0 {
        return Err("--capital must be > 0".to_string());
    }

    for (name, value) in [
        ("--fixed-income", cli.fixed_income),
        ("--dividend-income", cli.dividend_income),
        ("--target-spend", cli.target_spend),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..100.0).contains(&cli.tax_rate) {
        return Err("--tax-rate must be >= 0 and < 100".to_string());
    }

    if cli.horizon_years == 0 || cli.horizon_years > 100 {
        return Err("--horizon-years must be between 1 and 100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.inflation_rate) {
        return Err("--inflation-rate must be between 0 and 100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.dividend_growth_rate) {
        return Err("--dividend-growth-rate must be between 0 and 100".to_string());
    }

    if let Some(rate) = cli.expected_return {
        if !rate.is_finite() || rate <= -100.0 {
            return Err("--expected-return must be > -100".to_string());
        }
    }

    if !(-100.0..=0.0).contains(&cli.crash_rate) {
        return Err("--crash-rate must be between -100 and 0".to_string());
    }

    if cli.crash_years > cli.horizon_years {
        return Err("--crash-years must be <= --horizon-years".to_string());
    }

    let allocation = resolve_allocation(
        cli.strategy.into(),
        AssetMix {
            equity: cli.equity,
            metals: cli.metals,
            debt: cli.debt,
            cash: cli.cash,
        },
    )?;
    let expected_return = cli
        .expected_return
        .map(|rate| rate / 100.0)
        .unwrap_or(allocation.estimated_return);

    let input = ScenarioInput {
        capital: cli.capital,
        monthly_fixed_income: cli.fixed_income,
        monthly_dividend_income: cli.dividend_income,
        monthly_target_spend: cli.target_spend,
        tax_rate: cli.tax_rate / 100.0,
        horizon_years: cli.horizon_years,
        inflation_rate: cli.inflation_rate / 100.0,
        dividend_growth_rate: cli.dividend_growth_rate / 100.0,
        expected_return,
    };
    let stress = cli.stress_test.then_some(ShockParameters {
        annual_rate: cli.crash_rate / 100.0,
        duration_years: cli.crash_years,
    });

    Ok(EvaluationRequest {
        input,
        allocation,
        stress,
    })
}

/// Parses command-line flags, evaluates the scenario and renders the report
/// as pretty JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let request = build_request(cli)?;
    let report = evaluate(&request).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to render report: {e}"))
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("runway HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/evaluate");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(Query(payload): Query<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_post_handler(Json(payload): Json<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_handler_impl(payload: EvaluatePayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            log::debug!("rejected evaluation request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match evaluate(&request) {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<EvaluationRequest, String> {
    let payload = serde_json::from_str::<EvaluatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: EvaluatePayload) -> Result<EvaluationRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.capital {
        cli.capital = v;
    }
    if let Some(v) = payload.fixed_income {
        cli.fixed_income = v;
    }
    if let Some(v) = payload.dividend_income {
        cli.dividend_income = v;
    }
    if let Some(v) = payload.target_spend {
        cli.target_spend = v;
    }
    if let Some(v) = payload.tax_rate {
        cli.tax_rate = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }

    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.dividend_growth_rate {
        cli.dividend_growth_rate = v;
    }

    if let Some(v) = payload.strategy {
        cli.strategy = v.into();
    }
    if let Some(v) = payload.equity {
        cli.equity = v;
    }
    if let Some(v) = payload.metals {
        cli.metals = v;
    }
    if let Some(v) = payload.debt {
        cli.debt = v;
    }
    if let Some(v) = payload.cash {
        cli.cash = v;
    }
    if let Some(v) = payload.expected_return {
        cli.expected_return = Some(v);
    }

    if let Some(v) = payload.stress_test {
        cli.stress_test = v;
    }
    if let Some(v) = payload.crash_rate {
        cli.crash_rate = v;
    }
    if let Some(v) = payload.crash_years {
        cli.crash_years = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        capital: 500_000.0,
        fixed_income: 1_500.0,
        dividend_income: 500.0,
        target_spend: 4_000.0,
        tax_rate: 15.0,
        horizon_years: 25,
        inflation_rate: 2.5,
        dividend_growth_rate: 3.0,
        strategy: CliAllocationStrategy::AggressiveGrowth,
        equity: 50.0,
        metals: 10.0,
        debt: 30.0,
        cash: 10.0,
        expected_return: None,
        stress_test: false,
        crash_rate: -20.0,
        crash_years: 2,
    }
}
