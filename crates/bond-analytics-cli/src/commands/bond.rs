use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bond_analytics_core::bond::current_yield::current_yield;
use bond_analytics_core::bond::metrics::{self, BatchValuationInput, BondValuationInput};
use bond_analytics_core::bond::schedule::{build_schedule, CashFlowSchedule};
use bond_analytics_core::bond::snapshot::BondSnapshot;
use bond_analytics_core::bond::ytm::{solve_ytm, SolverConfig, YieldSolution};
use bond_analytics_core::types::{Money, Percent};

use crate::input;

/// Arguments for cash-flow schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a bond snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Serialize)]
struct ScheduleOutput {
    ticker: String,
    undiscounted_total: Money,
    #[serde(flatten)]
    schedule: CashFlowSchedule,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: BondSnapshot = input::read_input(args.input.as_deref(), "schedule")?;
    let schedule = build_schedule(&snapshot)?;
    Ok(serde_json::to_value(ScheduleOutput {
        ticker: snapshot.ticker,
        undiscounted_total: schedule.undiscounted_total(),
        schedule,
    })?)
}

/// Arguments for single-bond valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to valuation input: snapshot, target_rate, optional solver
    #[arg(long)]
    pub input: Option<String>,
    /// Override the target rate from the input file (annual percent)
    #[arg(long)]
    pub target_rate: Option<Decimal>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut valuation: BondValuationInput = input::read_input(args.input.as_deref(), "valuation")?;
    if let Some(rate) = args.target_rate {
        valuation.target_rate = rate;
    }
    metrics::validate_target_rate(valuation.target_rate)?;
    let result = metrics::evaluate_bond(&valuation)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for valuing many bonds at one target rate
#[derive(Args)]
pub struct ValueBatchArgs {
    /// Path to batch input: snapshots, target_rate, optional solver
    #[arg(long)]
    pub input: Option<String>,
    /// Override the target rate from the input file (annual percent)
    #[arg(long)]
    pub target_rate: Option<Decimal>,
}

pub fn run_value_batch(args: ValueBatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut batch: BatchValuationInput = input::read_input(args.input.as_deref(), "batch valuation")?;
    if let Some(rate) = args.target_rate {
        batch.target_rate = rate;
    }
    metrics::validate_target_rate(batch.target_rate)?;

    let result = metrics::evaluate_batch(&batch);
    Ok(serde_json::to_value(result)?)
}

/// Arguments for yield-to-maturity only
#[derive(Args)]
pub struct YtmArgs {
    /// Path to input: snapshot and optional solver settings
    #[arg(long)]
    pub input: Option<String>,
    /// Price to solve against instead of the snapshot's market price
    #[arg(long)]
    pub price: Option<Decimal>,
}

#[derive(Deserialize)]
struct YtmRequest {
    snapshot: BondSnapshot,
    #[serde(default)]
    solver: SolverConfig,
}

#[derive(Serialize)]
struct YtmOutput {
    ticker: String,
    market_price: Money,
    current_yield: Percent,
    #[serde(flatten)]
    solution: YieldSolution,
}

pub fn run_ytm(args: YtmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: YtmRequest = input::read_input(args.input.as_deref(), "ytm")?;
    let snapshot = request.snapshot;
    let market_price = match args.price {
        Some(price) => price,
        None => snapshot.require_market_price()?,
    };

    let schedule = build_schedule(&snapshot)?;
    let solution = solve_ytm(&schedule, market_price, &request.solver)?;
    Ok(serde_json::to_value(YtmOutput {
        current_yield: current_yield(&snapshot, market_price)?,
        ticker: snapshot.ticker,
        market_price,
        solution,
    })?)
}
