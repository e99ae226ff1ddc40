use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::fair_value::present_value_saturating;
use super::schedule::CashFlowSchedule;
use crate::error::BondAnalyticsError;
use crate::types::{Money, Percent};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning for the yield-to-maturity search. All rates are annual percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// First secant seed.
    pub initial_guess: Percent,
    /// Offset of the second seed from the first.
    pub perturbation: Percent,
    /// Acceptable |fair value - market price|, in currency units.
    pub tolerance: Money,
    pub max_iterations: u32,
    /// Lowest rate the search may visit.
    pub rate_floor: Percent,
    /// Highest rate the search may visit.
    pub rate_ceiling: Percent,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: dec!(5),
            perturbation: dec!(1),
            tolerance: dec!(0.0001),
            max_iterations: 50,
            rate_floor: dec!(-99),
            rate_ceiling: dec!(1000),
        }
    }
}

/// Outcome of a converged yield search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldSolution {
    /// Root as found, before rounding.
    pub rate: Percent,
    /// Root rounded to four decimal places.
    pub ytm: Percent,
    /// Present value at `rate` minus the market price.
    pub residual: Money,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Find the annual rate at which the schedule's present value equals
/// `market_price`.
///
/// Secant iteration seeded at `initial_guess` and `initial_guess +
/// perturbation`. Every evaluated point narrows a bracket around the root.
/// The next point is the bracket midpoint instead of the secant candidate
/// when the candidate leaves the bracket, or when the previous step failed
/// to halve the residual. The second rule stops the secant from creeping
/// along one end of a strongly convex present-value curve.
pub fn solve_ytm(
    schedule: &CashFlowSchedule,
    market_price: Money,
    config: &SolverConfig,
) -> BondAnalyticsResult<YieldSolution> {
    validate_config(config)?;
    if market_price <= Decimal::ZERO {
        return Err(BondAnalyticsError::InvalidInput {
            field: "market_price".into(),
            reason: "Market price must be positive to solve for yield".into(),
        });
    }

    let residual = |rate: Percent| -> BondAnalyticsResult<Decimal> {
        let pv = present_value_saturating(schedule, rate)?;
        Ok(pv.saturating_sub(market_price))
    };

    // Present value falls as the rate rises: the price must sit between the
    // values at the two ends of the admissible range.
    let at_floor = residual(config.rate_floor)?;
    if at_floor < Decimal::ZERO {
        tracing::warn!(%market_price, floor = %config.rate_floor, "market price above reachable fair-value range");
        return Err(BondAnalyticsError::NumericalDivergence {
            last_estimate: config.rate_floor,
            residual: at_floor,
            iterations: 0,
        });
    }
    let at_ceiling = residual(config.rate_ceiling)?;
    if at_ceiling > Decimal::ZERO {
        tracing::warn!(%market_price, ceiling = %config.rate_ceiling, "market price below reachable fair-value range");
        return Err(BondAnalyticsError::NumericalDivergence {
            last_estimate: config.rate_ceiling,
            residual: at_ceiling,
            iterations: 0,
        });
    }

    let mut lo = config.rate_floor;
    let mut hi = config.rate_ceiling;

    let mut r_prev = config.initial_guess.clamp(lo, hi);
    let mut f_prev = residual(r_prev)?;
    narrow(&mut lo, &mut hi, r_prev, f_prev);

    let mut r = (config.initial_guess + config.perturbation).clamp(lo, hi);
    let mut f = residual(r)?;
    // |residual| before the latest step; unset for the seed pair.
    let mut previous_gap: Option<Decimal> = None;

    for iteration in 1..=config.max_iterations {
        if f.abs() < config.tolerance {
            tracing::debug!(iterations = iteration, rate = %r, residual = %f, "yield search converged");
            return Ok(YieldSolution {
                rate: r,
                ytm: r.round_dp(4),
                residual: f,
                iterations: iteration,
            });
        }
        narrow(&mut lo, &mut hi, r, f);

        let stalled = previous_gap.is_some_and(|gap| {
            f.abs().checked_mul(dec!(2)).map_or(true, |doubled| doubled > gap)
        });
        previous_gap = Some(f.abs());

        let next = match secant_step(r_prev, f_prev, r, f) {
            Some(candidate) if !stalled && candidate > lo && candidate < hi => candidate,
            _ => (lo + hi) / dec!(2),
        };

        r_prev = r;
        f_prev = f;
        r = next;
        f = residual(r)?;
    }

    if f.abs() < config.tolerance {
        return Ok(YieldSolution {
            rate: r,
            ytm: r.round_dp(4),
            residual: f,
            iterations: config.max_iterations,
        });
    }

    tracing::warn!(
        iterations = config.max_iterations,
        last_estimate = %r,
        residual = %f,
        "yield search did not converge"
    );
    Err(BondAnalyticsError::NumericalDivergence {
        last_estimate: r.round_dp(4),
        residual: f,
        iterations: config.max_iterations,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_config(config: &SolverConfig) -> BondAnalyticsResult<()> {
    if config.rate_floor <= dec!(-100) {
        return Err(BondAnalyticsError::InvalidInput {
            field: "rate_floor".into(),
            reason: "Rate floor must be greater than -100%".into(),
        });
    }
    if config.rate_ceiling <= config.rate_floor {
        return Err(BondAnalyticsError::InvalidInput {
            field: "rate_ceiling".into(),
            reason: "Rate ceiling must exceed the rate floor".into(),
        });
    }
    if config.tolerance <= Decimal::ZERO {
        return Err(BondAnalyticsError::InvalidInput {
            field: "tolerance".into(),
            reason: "Tolerance must be positive".into(),
        });
    }
    if config.perturbation.is_zero() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "perturbation".into(),
            reason: "Seeds must differ".into(),
        });
    }
    if config.max_iterations == 0 {
        return Err(BondAnalyticsError::InvalidInput {
            field: "max_iterations".into(),
            reason: "At least one iteration is required".into(),
        });
    }
    Ok(())
}

/// Positive residual means the rate is still too low.
fn narrow(lo: &mut Decimal, hi: &mut Decimal, rate: Decimal, residual: Decimal) {
    if residual > Decimal::ZERO {
        if rate > *lo {
            *lo = rate;
        }
    } else if rate < *hi {
        *hi = rate;
    }
}

/// `None` when the secant is flat or the arithmetic overflows.
fn secant_step(r0: Decimal, f0: Decimal, r1: Decimal, f1: Decimal) -> Option<Decimal> {
    let slope_den = f1.checked_sub(f0)?;
    if slope_den.is_zero() {
        return None;
    }
    let step = f1.checked_mul(r1 - r0)?.checked_div(slope_den)?;
    r1.checked_sub(step)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::fair_value::present_value;
    use crate::bond::schedule::{CashFlowEvent, CashFlowRegime};
    use chrono::{Duration, NaiveDate};

    fn loading() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn schedule(flows: &[(i64, Decimal)]) -> CashFlowSchedule {
        CashFlowSchedule {
            regime: CashFlowRegime::MultiCoupon,
            loading_date: loading(),
            events: flows
                .iter()
                .map(|(d, a)| CashFlowEvent {
                    date: loading() + Duration::days(*d),
                    amount: *a,
                })
                .collect(),
        }
    }

    fn assert_root(s: &CashFlowSchedule, price: Decimal) -> YieldSolution {
        let sol = solve_ytm(s, price, &SolverConfig::default()).unwrap();
        let pv = present_value(s, sol.rate).unwrap();
        assert!(
            (pv - price).abs() < dec!(0.0001),
            "PV at {} is {pv}, price {price}",
            sol.rate
        );
        sol
    }

    #[test]
    fn test_zero_coupon_one_year() {
        let s = schedule(&[(365, dec!(1000))]);
        let sol = assert_root(&s, dec!(950));
        // 1000 / 950 - 1 = 5.2632%
        assert!((sol.ytm - dec!(5.2632)).abs() < dec!(0.0001), "ytm {}", sol.ytm);
    }

    #[test]
    fn test_coupon_schedule_roots() {
        let s = schedule(&[
            (60, dec!(35)),
            (242, dec!(35)),
            (424, dec!(35)),
            (606, dec!(35)),
            (788, dec!(1035)),
        ]);
        for price in [dec!(300), dec!(880.5), dec!(1000), dec!(1139.99)] {
            assert_root(&s, price);
        }
    }

    #[test]
    fn test_price_above_cash_flows_gives_negative_yield() {
        let s = schedule(&[(730, dec!(1000))]);
        let sol = assert_root(&s, dec!(1100));
        assert!(sol.ytm < Decimal::ZERO);
    }

    #[test]
    fn test_long_zero_deep_negative_yield() {
        let s = schedule(&[(365 * 30, dec!(1000))]);
        for price in [dec!(2070), dec!(3000)] {
            let sol = assert_root(&s, price);
            assert!(sol.ytm < Decimal::ZERO, "price {price}, ytm {}", sol.ytm);
        }
        // 1000 / 3000 = (1 + r)^30  =>  r = -3.5958%
        let sol = assert_root(&s, dec!(3000));
        assert!((sol.ytm - dec!(-3.5958)).abs() < dec!(0.001), "ytm {}", sol.ytm);
    }

    #[test]
    fn test_long_coupon_schedule_far_above_par() {
        let flows: Vec<(i64, Decimal)> = (1..=25)
            .map(|year| {
                let amount = if year == 25 { dec!(1070) } else { dec!(70) };
                (365 * year, amount)
            })
            .collect();
        let s = schedule(&flows);
        for price in [dec!(2400), dec!(3300)] {
            assert_root(&s, price);
        }
    }

    #[test]
    fn test_long_bond_high_yield() {
        let s = schedule(&[(365 * 25, dec!(1000))]);
        let sol = assert_root(&s, dec!(5));
        assert!(sol.ytm > dec!(20));
    }

    #[test]
    fn test_price_out_of_reach_diverges() {
        let s = schedule(&[(365, dec!(1000))]);
        // Even at the 1000% ceiling the bond is worth ~90.9.
        match solve_ytm(&s, dec!(1), &SolverConfig::default()) {
            Err(BondAnalyticsError::NumericalDivergence {
                last_estimate,
                residual,
                ..
            }) => {
                assert_eq!(last_estimate, dec!(1000));
                assert!(residual > Decimal::ZERO);
            }
            other => panic!("Expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let s = schedule(&[(90, dec!(20)), (270, dec!(20)), (450, dec!(1020))]);
        let config = SolverConfig {
            max_iterations: 1,
            tolerance: dec!(0.0000000001),
            ..SolverConfig::default()
        };
        assert!(matches!(
            solve_ytm(&s, dec!(871.23), &config),
            Err(BondAnalyticsError::NumericalDivergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let s = schedule(&[(365, dec!(1000))]);
        assert!(matches!(
            solve_ytm(&s, Decimal::ZERO, &SolverConfig::default()),
            Err(BondAnalyticsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"max_iterations": 20}"#).unwrap();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.initial_guess, dec!(5));
        assert_eq!(config.rate_ceiling, dec!(1000));
    }
}
