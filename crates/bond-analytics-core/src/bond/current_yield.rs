use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::fair_value::DAYS_IN_YEAR;
use super::snapshot::BondSnapshot;
use crate::error::BondAnalyticsError;
use crate::types::{Money, Percent};
use crate::BondAnalyticsResult;

/// Annualized coupon income as a percentage of the market price, ignoring
/// time value: `coupon * (365 / period) / price * 100`, four decimals.
///
/// A zero-coupon bond yields exactly zero.
pub fn current_yield(snapshot: &BondSnapshot, market_price: Money) -> BondAnalyticsResult<Percent> {
    if snapshot.is_zero_coupon() {
        return Ok(Decimal::ZERO);
    }
    if market_price <= Decimal::ZERO {
        return Err(BondAnalyticsError::InvalidInput {
            field: "market_price".into(),
            reason: "Market price must be positive for current yield".into(),
        });
    }
    let period = match snapshot.coupon_period {
        Some(p) if p > 0 => Decimal::from(p),
        _ => {
            return Err(BondAnalyticsError::InvalidSchedule(format!(
                "{}: coupon period must be positive to annualize the coupon",
                snapshot.ticker
            )))
        }
    };

    let annual_coupon = snapshot.coupon_value * Decimal::from(DAYS_IN_YEAR) / period;
    Ok((annual_coupon / market_price * dec!(100)).round_dp(4))
}
