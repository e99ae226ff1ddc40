use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BondAnalyticsError;
use crate::types::Money;
use crate::BondAnalyticsResult;

/// Point-in-time terms of a bond as supplied by the data-access layer.
///
/// All amounts are in settlement currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondSnapshot {
    /// Exchange ticker (unique per bond).
    pub ticker: String,
    /// Human-readable security name.
    pub name: String,
    /// Face value repaid at maturity.
    pub nominal_value: Money,
    /// Amount of each coupon payment. Zero means a zero-coupon bond.
    #[serde(default)]
    pub coupon_value: Money,
    /// Days between coupon payments. Ignored when `coupon_value` is zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_period: Option<u32>,
    /// Date of the next coupon payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_coupon_date: Option<NaiveDate>,
    pub maturity_date: NaiveDate,
    /// Valuation date: the day the snapshot was loaded.
    pub loading_date: NaiveDate,
    /// Previous session's weighted-average price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Money>,
}

impl BondSnapshot {
    pub fn is_zero_coupon(&self) -> bool {
        self.coupon_value.is_zero()
    }

    /// The market price valuation is anchored to.
    ///
    /// Absence is fatal to a valuation request; a non-positive price is
    /// rejected as bad input.
    pub fn require_market_price(&self) -> BondAnalyticsResult<Money> {
        match self.market_price {
            None => Err(BondAnalyticsError::MissingMarketPrice {
                ticker: self.ticker.clone(),
            }),
            Some(price) if price <= Decimal::ZERO => Err(BondAnalyticsError::InvalidInput {
                field: "market_price".into(),
                reason: format!("Market price must be positive, got {price}"),
            }),
            Some(price) => Ok(price),
        }
    }

    /// Checks the amount fields. Date and coupon-period consistency is
    /// checked by the schedule builder, which knows which regime applies.
    pub fn validate(&self) -> BondAnalyticsResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(BondAnalyticsError::InvalidInput {
                field: "ticker".into(),
                reason: "Ticker must not be empty".into(),
            });
        }
        if self.nominal_value <= Decimal::ZERO {
            return Err(BondAnalyticsError::InvalidInput {
                field: "nominal_value".into(),
                reason: "Nominal value must be positive".into(),
            });
        }
        if self.coupon_value < Decimal::ZERO {
            return Err(BondAnalyticsError::InvalidInput {
                field: "coupon_value".into(),
                reason: "Coupon value cannot be negative".into(),
            });
        }
        Ok(())
    }

    /// Calendar days from the loading date to maturity.
    pub fn days_to_maturity(&self) -> i64 {
        (self.maturity_date - self.loading_date).num_days()
    }
}
