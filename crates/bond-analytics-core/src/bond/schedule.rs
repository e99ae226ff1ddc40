use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::snapshot::BondSnapshot;
use crate::error::BondAnalyticsError;
use crate::types::Money;
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Cash-flow shape of a bond. Chosen once per snapshot; everything
/// downstream works on the resulting schedule regardless of regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowRegime {
    /// No coupons; the nominal is repaid at maturity.
    ZeroCoupon,
    /// A single coupon paid together with the nominal at maturity.
    TerminalCoupon,
    /// Periodic coupons up to maturity, then redemption.
    MultiCoupon,
}

/// A single dated payment to the bondholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowEvent {
    pub date: NaiveDate,
    pub amount: Money,
}

/// Remaining cash flows of a bond, ascending by date. The last event falls
/// on the maturity date and includes the redemption of the nominal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowSchedule {
    pub regime: CashFlowRegime,
    /// Valuation date all event times are measured from.
    pub loading_date: NaiveDate,
    pub events: Vec<CashFlowEvent>,
}

impl CashFlowSchedule {
    /// Sum of all amounts without discounting. This is the fair value at a
    /// zero rate and the upper bound of prices with a positive yield.
    pub fn undiscounted_total(&self) -> Money {
        self.events.iter().map(|e| e.amount).sum()
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.events.last().map(|e| e.date)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Decide which cash-flow regime a bond falls into.
///
/// Priority: zero coupon, then a coupon that coincides with maturity, then
/// the periodic case.
pub fn classify(snapshot: &BondSnapshot) -> CashFlowRegime {
    if snapshot.is_zero_coupon() {
        CashFlowRegime::ZeroCoupon
    } else if snapshot.next_coupon_date == Some(snapshot.maturity_date) {
        CashFlowRegime::TerminalCoupon
    } else {
        CashFlowRegime::MultiCoupon
    }
}

/// Build the dated cash-flow schedule for a bond snapshot.
pub fn build_schedule(snapshot: &BondSnapshot) -> BondAnalyticsResult<CashFlowSchedule> {
    snapshot.validate()?;

    if snapshot.maturity_date < snapshot.loading_date {
        return Err(BondAnalyticsError::InvalidSchedule(format!(
            "{}: maturity date {} precedes loading date {}",
            snapshot.ticker, snapshot.maturity_date, snapshot.loading_date
        )));
    }
    if snapshot.maturity_date == snapshot.loading_date {
        return Err(BondAnalyticsError::InvalidSchedule(format!(
            "{}: bond matures on the loading date {}, no cash flows remain",
            snapshot.ticker, snapshot.loading_date
        )));
    }

    let regime = classify(snapshot);
    let events = match regime {
        CashFlowRegime::ZeroCoupon => vec![CashFlowEvent {
            date: snapshot.maturity_date,
            amount: snapshot.nominal_value,
        }],
        CashFlowRegime::TerminalCoupon => vec![CashFlowEvent {
            date: snapshot.maturity_date,
            amount: snapshot.nominal_value + snapshot.coupon_value,
        }],
        CashFlowRegime::MultiCoupon => multi_coupon_events(snapshot)?,
    };

    Ok(CashFlowSchedule {
        regime,
        loading_date: snapshot.loading_date,
        events,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn multi_coupon_events(snapshot: &BondSnapshot) -> BondAnalyticsResult<Vec<CashFlowEvent>> {
    let period = match snapshot.coupon_period {
        Some(p) if p > 0 => Duration::days(i64::from(p)),
        _ => {
            return Err(BondAnalyticsError::InvalidSchedule(format!(
                "{}: coupon period must be a positive number of days for a coupon-paying bond",
                snapshot.ticker
            )))
        }
    };

    let first = snapshot.next_coupon_date.ok_or_else(|| {
        BondAnalyticsError::InvalidSchedule(format!(
            "{}: next coupon date is required for a coupon-paying bond",
            snapshot.ticker
        ))
    })?;

    if first <= snapshot.loading_date {
        return Err(BondAnalyticsError::InvalidSchedule(format!(
            "{}: next coupon date {} is not after loading date {}",
            snapshot.ticker, first, snapshot.loading_date
        )));
    }
    if first > snapshot.maturity_date {
        return Err(BondAnalyticsError::InvalidSchedule(format!(
            "{}: next coupon date {} falls after maturity {}",
            snapshot.ticker, first, snapshot.maturity_date
        )));
    }

    let mut events = Vec::new();
    let mut date = first;
    while date <= snapshot.maturity_date {
        events.push(CashFlowEvent {
            date,
            amount: snapshot.coupon_value,
        });
        date += period;
    }

    // Redemption is additive with a coupon due on the maturity date.
    match events.last_mut() {
        Some(last) if last.date == snapshot.maturity_date => {
            last.amount += snapshot.nominal_value;
        }
        _ => events.push(CashFlowEvent {
            date: snapshot.maturity_date,
            amount: snapshot.nominal_value,
        }),
    }

    debug_assert!(events.windows(2).all(|w| w[0].date < w[1].date));
    debug_assert!(events.iter().all(|e| e.amount > Decimal::ZERO));

    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loading() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn coupon_bond() -> BondSnapshot {
        BondSnapshot {
            ticker: "RU000A105RH2".into(),
            name: "Multi Coupon".into(),
            nominal_value: dec!(1000),
            coupon_value: dec!(40),
            coupon_period: Some(180),
            next_coupon_date: Some(loading() + Duration::days(90)),
            maturity_date: loading() + Duration::days(450),
            loading_date: loading(),
            market_price: Some(dec!(1010)),
        }
    }

    #[test]
    fn test_zero_coupon_single_redemption() {
        let mut bond = coupon_bond();
        bond.coupon_value = Decimal::ZERO;
        bond.coupon_period = None;
        bond.next_coupon_date = None;

        let schedule = build_schedule(&bond).unwrap();
        assert_eq!(schedule.regime, CashFlowRegime::ZeroCoupon);
        assert_eq!(
            schedule.events,
            vec![CashFlowEvent {
                date: bond.maturity_date,
                amount: dec!(1000)
            }]
        );
    }

    #[test]
    fn test_terminal_coupon_merges_with_nominal() {
        let mut bond = coupon_bond();
        bond.coupon_value = dec!(50);
        bond.coupon_period = Some(182);
        bond.maturity_date = loading() + Duration::days(182);
        bond.next_coupon_date = Some(bond.maturity_date);

        let schedule = build_schedule(&bond).unwrap();
        assert_eq!(schedule.regime, CashFlowRegime::TerminalCoupon);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.events[0].amount, dec!(1050));
    }

    #[test]
    fn test_multi_coupon_aligned_with_maturity() {
        let schedule = build_schedule(&coupon_bond()).unwrap();
        assert_eq!(schedule.regime, CashFlowRegime::MultiCoupon);

        let offsets: Vec<i64> = schedule
            .events
            .iter()
            .map(|e| (e.date - loading()).num_days())
            .collect();
        assert_eq!(offsets, vec![90, 270, 450]);
        assert_eq!(schedule.events[0].amount, dec!(40));
        assert_eq!(schedule.events[1].amount, dec!(40));
        assert_eq!(schedule.events[2].amount, dec!(1040));
        assert_eq!(schedule.undiscounted_total(), dec!(1120));
    }

    #[test]
    fn test_multi_coupon_redemption_off_cycle() {
        let mut bond = coupon_bond();
        bond.maturity_date = loading() + Duration::days(400);

        let schedule = build_schedule(&bond).unwrap();
        let offsets: Vec<i64> = schedule
            .events
            .iter()
            .map(|e| (e.date - loading()).num_days())
            .collect();
        assert_eq!(offsets, vec![90, 270, 400]);
        assert_eq!(schedule.events[2].amount, dec!(1000));
        assert_eq!(schedule.undiscounted_total(), dec!(1080));
    }

    #[test]
    fn test_missing_next_coupon_is_invalid() {
        let mut bond = coupon_bond();
        bond.next_coupon_date = None;
        assert!(matches!(
            build_schedule(&bond),
            Err(BondAnalyticsError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_zero_period_is_invalid() {
        let mut bond = coupon_bond();
        bond.coupon_period = Some(0);
        assert!(matches!(
            build_schedule(&bond),
            Err(BondAnalyticsError::InvalidSchedule(_))
        ));
        bond.coupon_period = None;
        assert!(matches!(
            build_schedule(&bond),
            Err(BondAnalyticsError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_matured_bond_is_invalid() {
        let mut bond = coupon_bond();
        bond.maturity_date = loading() - Duration::days(1);
        assert!(matches!(
            build_schedule(&bond),
            Err(BondAnalyticsError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_terminal_regime_takes_priority_over_period() {
        // A bad period is irrelevant once the only coupon is at maturity.
        let mut bond = coupon_bond();
        bond.coupon_period = Some(0);
        bond.next_coupon_date = Some(bond.maturity_date);
        assert_eq!(classify(&bond), CashFlowRegime::TerminalCoupon);
        assert!(build_schedule(&bond).is_ok());
    }
}
