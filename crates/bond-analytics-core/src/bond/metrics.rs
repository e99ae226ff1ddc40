use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::conclusion::{compose_conclusion, Conclusion};
use super::current_yield::current_yield;
use super::duration::calculate_duration;
use super::fair_value::fair_value;
use super::schedule::{build_schedule, CashFlowRegime};
use super::snapshot::BondSnapshot;
use super::ytm::{solve_ytm, SolverConfig};
use crate::error::BondAnalyticsError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Exclusive bounds a boundary layer should enforce on the target rate.
pub const MIN_TARGET_RATE: Percent = dec!(1);
pub const MAX_TARGET_RATE: Percent = dec!(50);

/// Bonds maturing within this many days get a short-maturity warning.
const SHORT_MATURITY_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a single bond valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationInput {
    pub snapshot: BondSnapshot,
    /// Investor's discount rate, annual percent.
    pub target_rate: Percent,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Valuation metrics for one bond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondMetrics {
    pub ticker: String,
    pub name: String,
    pub regime: CashFlowRegime,
    /// Price the metrics are anchored to.
    pub market_price: Money,
    /// Annual percent, four decimals.
    pub current_yield: Percent,
    /// Annual percent, four decimals.
    pub ytm: Percent,
    /// Present value at the target rate, four decimals.
    pub fair_value: Money,
    /// (fair value - market price) / market price, percent.
    pub fair_value_gap_pct: Percent,
    pub macaulay_duration: Years,
    pub modified_duration: Years,
    pub conclusion: Conclusion,
    /// Not individualized investment advice. Always true.
    pub disclaimer: bool,
}

/// Many bonds valued at one target rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValuationInput {
    pub snapshots: Vec<BondSnapshot>,
    pub target_rate: Percent,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Outcome for one bond of a batch. Exactly one of `metrics` and `error`
/// is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub ticker: String,
    pub metrics: Option<BondMetrics>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a bond: current yield, YTM, fair value at the target rate,
/// duration at the YTM and a qualitative conclusion.
pub fn evaluate_bond(
    input: &BondValuationInput,
) -> BondAnalyticsResult<ComputationOutput<BondMetrics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let snapshot = &input.snapshot;

    // A missing price is fatal before any computation runs.
    let market_price = snapshot.require_market_price()?;
    if input.target_rate <= dec!(-100) {
        return Err(BondAnalyticsError::InvalidInput {
            field: "target_rate".into(),
            reason: "Target rate must be greater than -100%".into(),
        });
    }

    let schedule = build_schedule(snapshot)?;
    let fair_value = fair_value(&schedule, input.target_rate)?;
    let solution = solve_ytm(&schedule, market_price, &input.solver)?;
    let current_yield = current_yield(snapshot, market_price)?;
    let duration = calculate_duration(&schedule, solution.rate)?;
    let conclusion = compose_conclusion(fair_value, market_price, solution.ytm, input.target_rate);

    if market_price > schedule.undiscounted_total() {
        warnings.push(format!(
            "Market price {market_price} exceeds the undiscounted cash flows {}; yield to maturity is negative",
            schedule.undiscounted_total()
        ));
    }
    if snapshot.days_to_maturity() <= SHORT_MATURITY_DAYS {
        warnings.push(format!(
            "Bond matures in {} days; annualized yields are highly sensitive to price",
            snapshot.days_to_maturity()
        ));
    }
    if !is_admissible_target_rate(input.target_rate) {
        warnings.push(format!(
            "Target rate {}% is outside the usual ({MIN_TARGET_RATE}%, {MAX_TARGET_RATE}%) range",
            input.target_rate
        ));
    }

    tracing::debug!(
        ticker = %snapshot.ticker,
        regime = ?schedule.regime,
        ytm = %solution.ytm,
        iterations = solution.iterations,
        "bond valued"
    );

    let output = BondMetrics {
        ticker: snapshot.ticker.clone(),
        name: snapshot.name.clone(),
        regime: schedule.regime,
        market_price,
        current_yield,
        ytm: solution.ytm,
        fair_value,
        fair_value_gap_pct: fair_value_gap_pct(fair_value, market_price),
        macaulay_duration: duration.macaulay_duration,
        modified_duration: duration.modified_duration,
        disclaimer: conclusion.disclaimer,
        conclusion,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "day_count": "Actual/365",
        "ytm_method": "safeguarded secant",
        "ytm_seeds": [input.solver.initial_guess, input.solver.initial_guess + input.solver.perturbation],
        "ytm_tolerance": input.solver.tolerance,
        "max_iterations": input.solver.max_iterations,
        "iterations_used": solution.iterations,
        "rounding": "half-even, 4 dp on final values",
        "price_type": "previous weighted average",
    });

    Ok(with_metadata(
        "Bond valuation: discounted cash flows, yield to maturity, current yield",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Value one bond of a batch, capturing the error instead of returning it.
fn evaluate_batch_item(
    snapshot: &BondSnapshot,
    target_rate: Percent,
    solver: &SolverConfig,
) -> BatchItem {
    let input = BondValuationInput {
        snapshot: snapshot.clone(),
        target_rate,
        solver: solver.clone(),
    };
    match evaluate_bond(&input) {
        Ok(out) => BatchItem {
            ticker: snapshot.ticker.clone(),
            metrics: Some(out.result),
            error: None,
            warnings: out.warnings,
        },
        Err(e) => {
            tracing::warn!(ticker = %snapshot.ticker, error = %e, "bond skipped in batch");
            BatchItem {
                ticker: snapshot.ticker.clone(),
                metrics: None,
                error: Some(e.to_string()),
                warnings: Vec::new(),
            }
        }
    }
}

/// Value every snapshot; one failing bond does not abort the others.
///
/// With the `parallel` feature the bonds are valued on the rayon pool.
/// Output order follows input order either way.
pub fn evaluate_batch(input: &BatchValuationInput) -> ComputationOutput<Vec<BatchItem>> {
    let start = Instant::now();

    #[cfg(feature = "parallel")]
    let snapshots = input.snapshots.par_iter();
    #[cfg(not(feature = "parallel"))]
    let snapshots = input.snapshots.iter();

    let items: Vec<BatchItem> = snapshots
        .map(|s| evaluate_batch_item(s, input.target_rate, &input.solver))
        .collect();
    let failed = items.iter().filter(|i| i.error.is_some()).count();
    tracing::info!(bonds = items.len(), failed, "batch valued");

    let mut warnings = Vec::new();
    if failed > 0 {
        warnings.push(format!("{failed} of {} bonds could not be valued", items.len()));
    }

    let assumptions = serde_json::json!({
        "target_rate": input.target_rate,
        "bonds": items.len(),
        "failed": failed,
        "parallel": cfg!(feature = "parallel"),
    });
    with_metadata(
        "Batch bond valuation",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        items,
    )
}

/// Whether a target rate lies in the open interval the API boundary accepts.
pub fn is_admissible_target_rate(rate: Percent) -> bool {
    rate > MIN_TARGET_RATE && rate < MAX_TARGET_RATE
}

/// Boundary-side check of a caller-supplied target rate.
pub fn validate_target_rate(rate: Percent) -> BondAnalyticsResult<()> {
    if is_admissible_target_rate(rate) {
        Ok(())
    } else {
        Err(BondAnalyticsError::InvalidInput {
            field: "target_rate".into(),
            reason: format!(
                "Target rate must lie strictly between {MIN_TARGET_RATE}% and {MAX_TARGET_RATE}%, got {rate}%"
            ),
        })
    }
}

/// Gap between fair value and price as a percentage of price. Zero when
/// there is no price to compare against.
pub fn fair_value_gap_pct(fair_value: Money, market_price: Money) -> Percent {
    if market_price.is_zero() {
        return Decimal::ZERO;
    }
    ((fair_value - market_price) / market_price * dec!(100)).round_dp(4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
