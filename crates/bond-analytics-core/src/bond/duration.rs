use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::fair_value::{present_value, year_fraction};
use super::schedule::{CashFlowEvent, CashFlowSchedule};
use crate::error::BondAnalyticsError;
use crate::types::{Percent, Years};
use crate::BondAnalyticsResult;

/// Interest-rate sensitivity of a schedule at a given yield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationOutput {
    /// PV-weighted average time to the cash flows, in years (Actual/365).
    pub macaulay_duration: Years,
    /// Macaulay duration / (1 + y), with y the annual yield as a fraction.
    pub modified_duration: Years,
}

/// Macaulay and modified duration of a schedule discounted at `rate`
/// (annual percent, annual compounding).
pub fn calculate_duration(
    schedule: &CashFlowSchedule,
    rate: Percent,
) -> BondAnalyticsResult<DurationOutput> {
    let price = present_value(schedule, rate)?;
    if price.is_zero() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "rate".into(),
            reason: "Present value is zero; duration is undefined".into(),
        });
    }

    let mut weighted_time = Decimal::ZERO;
    for event in &schedule.events {
        let days = (event.date - schedule.loading_date).num_days();
        let pv = present_value(&single_event(schedule, event), rate)?;
        weighted_time += year_fraction(days) * pv;
    }

    let macaulay = weighted_time / price;
    let modified = macaulay / (Decimal::ONE + rate / dec!(100));

    Ok(DurationOutput {
        macaulay_duration: macaulay.round_dp(4),
        modified_duration: modified.round_dp(4),
    })
}

fn single_event(schedule: &CashFlowSchedule, event: &CashFlowEvent) -> CashFlowSchedule {
    CashFlowSchedule {
        regime: schedule.regime,
        loading_date: schedule.loading_date,
        events: vec![event.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::schedule::CashFlowRegime;
    use chrono::{Duration, NaiveDate};

    fn loading() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_zero_coupon_duration_is_maturity() {
        let s = CashFlowSchedule {
            regime: CashFlowRegime::ZeroCoupon,
            loading_date: loading(),
            events: vec![CashFlowEvent {
                date: loading() + Duration::days(730),
                amount: dec!(1000),
            }],
        };
        let d = calculate_duration(&s, dec!(8)).unwrap();
        assert_eq!(d.macaulay_duration, dec!(2));
        // 2 / 1.08 = 1.85185...
        assert_eq!(d.modified_duration, dec!(1.8519));
    }

    #[test]
    fn test_coupons_shorten_duration() {
        let s = CashFlowSchedule {
            regime: CashFlowRegime::MultiCoupon,
            loading_date: loading(),
            events: vec![
                CashFlowEvent {
                    date: loading() + Duration::days(365),
                    amount: dec!(100),
                },
                CashFlowEvent {
                    date: loading() + Duration::days(730),
                    amount: dec!(1100),
                },
            ],
        };
        let d = calculate_duration(&s, dec!(10)).unwrap();
        assert!(d.macaulay_duration > dec!(1.9) && d.macaulay_duration < dec!(2));
        assert!(d.modified_duration < d.macaulay_duration);
    }
}
