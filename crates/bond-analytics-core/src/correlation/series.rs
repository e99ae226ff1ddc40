use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BondAnalyticsError;
use crate::BondAnalyticsResult;

/// One trading day's close. The price may be absent when the exchange
/// reports no trades for the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub trade_date: NaiveDate,
    pub close_price: Option<f64>,
}

/// Daily close prices of one bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl HistoricalPriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    /// Reject series the data source should never have produced: duplicate
    /// trade dates and non-finite or non-positive prices.
    pub fn validate(&self) -> BondAnalyticsResult<()> {
        let mut seen = HashSet::with_capacity(self.points.len());
        for point in &self.points {
            if !seen.insert(point.trade_date) {
                return Err(BondAnalyticsError::UpstreamData(format!(
                    "{}: duplicate trade date {}",
                    self.ticker, point.trade_date
                )));
            }
            if let Some(price) = point.close_price {
                if !price.is_finite() || price <= 0.0 {
                    return Err(BondAnalyticsError::UpstreamData(format!(
                        "{}: invalid close price {} on {}",
                        self.ticker, price, point.trade_date
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of days with a reported close.
    pub fn priced_len(&self) -> usize {
        self.points.iter().filter(|p| p.close_price.is_some()).count()
    }
}

/// A day on which both bonds have a close price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub trade_date: NaiveDate,
    pub first: f64,
    pub second: f64,
}

/// Two price series joined on trade date, ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeriesPair {
    pub first_ticker: String,
    pub second_ticker: String,
    pub rows: Vec<AlignedRow>,
}

impl AlignedSeriesPair {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_column(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.first).collect()
    }

    pub fn second_column(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.second).collect()
    }
}

/// Outer-join two series on trade date and keep only the rows where both
/// prices are present.
pub fn align(
    first: &HistoricalPriceSeries,
    second: &HistoricalPriceSeries,
) -> BondAnalyticsResult<AlignedSeriesPair> {
    first.validate()?;
    second.validate()?;

    let mut joined: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for point in &first.points {
        joined.entry(point.trade_date).or_default().0 = point.close_price;
    }
    for point in &second.points {
        joined.entry(point.trade_date).or_default().1 = point.close_price;
    }

    let rows = joined
        .into_iter()
        .filter_map(|(trade_date, pair)| match pair {
            (Some(first), Some(second)) => Some(AlignedRow {
                trade_date,
                first,
                second,
            }),
            _ => None,
        })
        .collect();

    Ok(AlignedSeriesPair {
        first_ticker: first.ticker.clone(),
        second_ticker: second.ticker.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Duration::days(offset)
    }

    fn series(ticker: &str, points: &[(i64, Option<f64>)]) -> HistoricalPriceSeries {
        HistoricalPriceSeries::new(
            ticker,
            points
                .iter()
                .map(|(d, p)| PricePoint {
                    trade_date: day(*d),
                    close_price: *p,
                })
                .collect(),
        )
    }

    #[test]
    fn test_align_drops_unmatched_and_missing() {
        let a = series("A", &[(0, Some(100.0)), (1, Some(101.0)), (2, None), (3, Some(99.0))]);
        let b = series("B", &[(1, Some(98.5)), (2, Some(98.0)), (3, Some(97.0)), (4, Some(96.0))]);

        let pair = align(&a, &b).unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.rows[0].trade_date, day(1));
        assert_eq!(pair.first_column(), vec![101.0, 99.0]);
        assert_eq!(pair.second_column(), vec![98.5, 97.0]);
    }

    #[test]
    fn test_align_sorts_by_date() {
        let a = series("A", &[(5, Some(1.0)), (2, Some(2.0))]);
        let b = series("B", &[(2, Some(3.0)), (5, Some(4.0))]);
        let pair = align(&a, &b).unwrap();
        assert_eq!(pair.rows[0].trade_date, day(2));
        assert_eq!(pair.rows[1].trade_date, day(5));
    }

    #[test]
    fn test_duplicate_dates_are_upstream_errors() {
        let a = series("A", &[(0, Some(1.0)), (0, Some(2.0))]);
        let b = series("B", &[(0, Some(1.0))]);
        assert!(matches!(
            align(&a, &b),
            Err(BondAnalyticsError::UpstreamData(_))
        ));
    }

    #[test]
    fn test_non_finite_price_is_upstream_error() {
        let a = series("A", &[(0, Some(f64::NAN))]);
        assert!(matches!(a.validate(), Err(BondAnalyticsError::UpstreamData(_))));
    }

    #[test]
    fn test_priced_len() {
        let a = series("A", &[(0, Some(1.0)), (1, None)]);
        assert_eq!(a.priced_len(), 1);
    }
}
