use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::schedule::CashFlowSchedule;
use crate::error::BondAnalyticsError;
use crate::types::{Money, Percent};
use crate::BondAnalyticsResult;

/// Actual/365 day-count denominator.
pub const DAYS_IN_YEAR: i64 = 365;

/// Decimal places kept on currency results.
pub const MONEY_DP: u32 = 4;

/// Discount multipliers below this are indistinguishable from zero at
/// 28-digit decimal precision.
const NEGLIGIBLE_MULTIPLIER: f64 = 1e-28;

/// Present value of a schedule at `rate` (annual percent), rounded to four
/// decimal places with banker's rounding applied to the final sum only.
pub fn fair_value(schedule: &CashFlowSchedule, rate: Percent) -> BondAnalyticsResult<Money> {
    let pv = present_value(schedule, rate)?;
    Ok(round_money(pv))
}

/// Unrounded present value of a schedule at `rate` (annual percent).
///
/// Each event at `t` days after the loading date is discounted by
/// `(1 + rate/100)^(t/365)`.
pub fn present_value(schedule: &CashFlowSchedule, rate: Percent) -> BondAnalyticsResult<Money> {
    discounted_sum(schedule, rate)?.ok_or_else(|| BondAnalyticsError::InvalidInput {
        field: "rate".into(),
        reason: format!("Discounting at {rate}% exceeds the decimal range"),
    })
}

/// Present value that saturates at `Decimal::MAX` instead of failing when
/// the discounted amounts exceed the decimal range (rates close to -100%).
pub(crate) fn present_value_saturating(
    schedule: &CashFlowSchedule,
    rate: Percent,
) -> BondAnalyticsResult<Money> {
    Ok(discounted_sum(schedule, rate)?.unwrap_or(Decimal::MAX))
}

/// Year fraction between the loading date and an event, Actual/365.
pub fn year_fraction(days: i64) -> Decimal {
    Decimal::from(days) / Decimal::from(DAYS_IN_YEAR)
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `None` signals overflow of the decimal range.
fn discounted_sum(schedule: &CashFlowSchedule, rate: Percent) -> BondAnalyticsResult<Option<Money>> {
    if rate <= dec!(-100) {
        return Err(BondAnalyticsError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if schedule.is_empty() {
        return Err(BondAnalyticsError::InvalidSchedule(
            "Cannot discount an empty cash-flow schedule".into(),
        ));
    }

    let growth = (Decimal::ONE + rate / dec!(100))
        .to_f64()
        .ok_or_else(|| BondAnalyticsError::InvalidInput {
            field: "rate".into(),
            reason: format!("Rate {rate} is not representable"),
        })?;

    let mut total = Decimal::ZERO;
    for event in &schedule.events {
        let days = (event.date - schedule.loading_date).num_days();
        if days < 1 {
            return Err(BondAnalyticsError::InvalidInput {
                field: "cash_flow_date".into(),
                reason: format!(
                    "Cash flow on {} is not after the loading date {}",
                    event.date, schedule.loading_date
                ),
            });
        }

        let Some(multiplier) = discount_multiplier(growth, days) else {
            return Ok(None);
        };
        let Some(pv) = event.amount.checked_mul(multiplier) else {
            return Ok(None);
        };
        let Some(sum) = total.checked_add(pv) else {
            return Ok(None);
        };
        total = sum;
    }

    Ok(Some(total))
}

/// `1 / (1 + r)^(days/365)` as a decimal.
fn discount_multiplier(growth: f64, days: i64) -> Option<Decimal> {
    let multiplier = growth.powf(-(days as f64) / DAYS_IN_YEAR as f64);
    if !multiplier.is_finite() {
        return None;
    }
    if multiplier < NEGLIGIBLE_MULTIPLIER {
        return Some(Decimal::ZERO);
    }
    Decimal::from_f64(multiplier)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_zero_rate_equals_undiscounted_sum() {
        let s = schedule(&[(90, dec!(40)), (270, dec!(40)), (450, dec!(1040))]);
        assert_eq!(fair_value(&s, Decimal::ZERO).unwrap(), dec!(1120));
    }

    #[test]
    fn test_one_year_zero_coupon() {
        let s = schedule(&[(365, dec!(1000))]);
        let fv = fair_value(&s, dec!(5)).unwrap();
        // 1000 / 1.05 = 952.3809...
        assert!((fv - dec!(952.3810)).abs() <= dec!(0.0001), "got {fv}");
    }

    #[test]
    fn test_strictly_decreasing_in_rate() {
        let s = schedule(&[(30, dec!(25)), (210, dec!(25)), (390, dec!(1025))]);
        let mut previous = fair_value(&s, dec!(-50)).unwrap();
        for rate in [dec!(-10), dec!(0), dec!(1), dec!(5), dec!(12.5), dec!(50), dec!(300)] {
            let fv = fair_value(&s, rate).unwrap();
            assert!(fv < previous, "FV({rate}) = {fv} not below {previous}");
            previous = fv;
        }
    }

    #[test]
    fn test_result_has_four_decimal_places() {
        let s = schedule(&[(100, dec!(1000))]);
        let fv = fair_value(&s, dec!(7.3)).unwrap();
        assert!(fv.scale() <= 4);
    }

    #[test]
    fn test_event_on_loading_date_is_rejected() {
        let s = schedule(&[(0, dec!(1000))]);
        assert!(matches!(
            fair_value(&s, dec!(5)),
            Err(BondAnalyticsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rate_at_minus_hundred_rejected() {
        let s = schedule(&[(365, dec!(1000))]);
        assert!(fair_value(&s, dec!(-100)).is_err());
    }

    #[test]
    fn test_banker_rounding() {
        assert_eq!(round_money(dec!(1.00005)), dec!(1.0000));
        assert_eq!(round_money(dec!(1.00015)), dec!(1.0002));
        assert_eq!(round_money(dec!(2.123449)), dec!(2.1234));
    }

    #[test]
    fn test_saturating_value_near_minus_hundred() {
        let s = schedule(&[(365 * 40, dec!(1000))]);
        let pv = present_value_saturating(&s, dec!(-99.9)).unwrap();
        assert_eq!(pv, Decimal::MAX);
        assert!(present_value(&s, dec!(-99.9)).is_err());
    }
}
