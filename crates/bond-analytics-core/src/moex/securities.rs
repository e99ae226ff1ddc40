use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fx::FxRates;
use super::table::{date, decimal, integer, text, upstream, IssTable};
use crate::bond::snapshot::BondSnapshot;
use crate::error::BondAnalyticsError;
use crate::types::Money;
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One row of the ISS `securities` block, amounts both as quoted and in
/// settlement currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoexSecurity {
    pub ticker: String,
    pub name: String,
    /// Previous weighted-average price in face currency (percent of face
    /// already applied).
    pub prev_price_cur: Money,
    pub nominal_cur: Money,
    pub coupon_value_cur: Money,
    pub coupon_period: Option<u32>,
    pub accrued_coupon_cur: Option<Money>,
    pub face_unit: String,
    pub currency_id: Option<String>,
    pub lot_size: Option<i64>,
    pub issue_size: Option<i64>,
    pub prev_date: Option<NaiveDate>,
    pub next_coupon_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub prev_price: Option<Money>,
    pub nominal: Option<Money>,
    pub accrued_coupon: Option<Money>,
    pub coupon_value: Option<Money>,
    pub loading_date: NaiveDate,
}

impl MoexSecurity {
    /// Engine input for this bond. Fails when the row cannot describe a
    /// valuable bond: no maturity or a face value with no settlement rate.
    pub fn to_snapshot(&self) -> BondAnalyticsResult<BondSnapshot> {
        let maturity_date = self.maturity_date.ok_or_else(|| {
            upstream(format!("{}: no maturity date", self.ticker))
        })?;
        let nominal_value = self.nominal.ok_or_else(|| {
            upstream(format!(
                "{}: face value in {} has no settlement rate",
                self.ticker, self.face_unit
            ))
        })?;

        Ok(BondSnapshot {
            ticker: self.ticker.clone(),
            name: self.name.clone(),
            nominal_value,
            coupon_value: self.coupon_value.unwrap_or(Decimal::ZERO),
            coupon_period: self.coupon_period,
            next_coupon_date: self.next_coupon_date,
            maturity_date,
            loading_date: self.loading_date,
            market_price: self.prev_price,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse the `securities` block of an ISS bonds board payload.
pub fn parse_securities(
    payload: &Value,
    fx: &FxRates,
    loading_date: NaiveDate,
) -> BondAnalyticsResult<Vec<MoexSecurity>> {
    let table = IssTable::from_payload(payload, "securities")?;
    let cols = Columns::locate(&table)?;

    let securities = table
        .data
        .iter()
        .map(|row| parse_row(row, &cols, fx, loading_date))
        .collect::<BondAnalyticsResult<Vec<_>>>()?;

    tracing::debug!(rows = securities.len(), "parsed ISS securities");
    Ok(securities)
}

/// Parse and convert every row to a snapshot, dropping rows that cannot be
/// valued. Dropped rows are reported next to the snapshots.
pub fn parse_snapshots(
    payload: &Value,
    fx: &FxRates,
    loading_date: NaiveDate,
) -> BondAnalyticsResult<(Vec<BondSnapshot>, Vec<String>)> {
    let mut snapshots = Vec::new();
    let mut skipped = Vec::new();
    for security in parse_securities(payload, fx, loading_date)? {
        match security.to_snapshot() {
            Ok(s) => snapshots.push(s),
            Err(e) => {
                tracing::warn!(ticker = %security.ticker, error = %e, "security skipped");
                skipped.push(e.to_string());
            }
        }
    }
    Ok((snapshots, skipped))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct Columns {
    secid: usize,
    secname: usize,
    prev_price: usize,
    face_value: usize,
    coupon_value: usize,
    coupon_period: usize,
    accrued: usize,
    face_unit: usize,
    currency_id: usize,
    lot_size: Option<usize>,
    issue_size: Option<usize>,
    prev_date: Option<usize>,
    next_coupon: usize,
    mat_date: usize,
}

impl Columns {
    fn locate(table: &IssTable) -> BondAnalyticsResult<Self> {
        Ok(Self {
            secid: table.column("SECID")?,
            secname: table.column("SECNAME")?,
            prev_price: table.column("PREVWAPRICE")?,
            face_value: table.column("FACEVALUE")?,
            coupon_value: table.column("COUPONVALUE")?,
            coupon_period: table.column("COUPONPERIOD")?,
            accrued: table.column("ACCRUEDINT")?,
            face_unit: table.column("FACEUNIT")?,
            currency_id: table.column("CURRENCYID")?,
            lot_size: table.column("LOTSIZE").ok(),
            issue_size: table.column("ISSUESIZE").ok(),
            prev_date: table.column("PREVDATE").ok(),
            next_coupon: table.column("NEXTCOUPON")?,
            mat_date: table.column("MATDATE")?,
        })
    }
}

fn parse_row(
    row: &[Value],
    cols: &Columns,
    fx: &FxRates,
    loading_date: NaiveDate,
) -> BondAnalyticsResult<MoexSecurity> {
    let ticker = text(row, cols.secid)?.ok_or_else(|| upstream("row without SECID".into()))?;
    let with_ticker = |e: BondAnalyticsError| match e {
        BondAnalyticsError::UpstreamData(msg) => {
            BondAnalyticsError::UpstreamData(format!("{ticker}: {msg}"))
        }
        other => other,
    };

    let face_unit = text(row, cols.face_unit)
        .map_err(with_ticker)?
        .ok_or_else(|| upstream(format!("{ticker}: no FACEUNIT")))?;
    let currency_id = text(row, cols.currency_id).map_err(with_ticker)?;
    let nominal_cur = decimal(row, cols.face_value)
        .map_err(with_ticker)?
        .ok_or_else(|| upstream(format!("{ticker}: no FACEVALUE")))?;

    // Quoted in percent of face; absent means no trades.
    let prev_price_pct = decimal(row, cols.prev_price)
        .map_err(with_ticker)?
        .unwrap_or(Decimal::ZERO);
    let prev_price_cur = prev_price_pct * nominal_cur / dec!(100);
    let coupon_value_cur = decimal(row, cols.coupon_value)
        .map_err(with_ticker)?
        .unwrap_or(Decimal::ZERO);
    let accrued_coupon_cur = decimal(row, cols.accrued).map_err(with_ticker)?;

    let coupon_period = match integer(row, cols.coupon_period).map_err(with_ticker)? {
        Some(p) if p > 0 => Some(
            u32::try_from(p).map_err(|_| upstream(format!("{ticker}: COUPONPERIOD {p} too large")))?,
        ),
        _ => None,
    };

    let optional_int = |idx: Option<usize>| -> BondAnalyticsResult<Option<i64>> {
        match idx {
            Some(i) => integer(row, i).map_err(with_ticker),
            None => Ok(None),
        }
    };
    let prev_date = match cols.prev_date {
        Some(i) => date(row, i).map_err(with_ticker)?,
        None => None,
    };

    Ok(MoexSecurity {
        name: text(row, cols.secname).map_err(with_ticker)?.unwrap_or_default(),
        prev_price: fx.convert(prev_price_cur, &face_unit),
        nominal: fx.convert(nominal_cur, &face_unit),
        accrued_coupon: accrued_coupon_cur
            .and_then(|a| currency_id.as_deref().and_then(|c| fx.convert(a, c))),
        coupon_value: fx.convert(coupon_value_cur, &face_unit),
        prev_price_cur,
        nominal_cur,
        coupon_value_cur,
        coupon_period,
        accrued_coupon_cur,
        lot_size: optional_int(cols.lot_size)?,
        issue_size: optional_int(cols.issue_size)?,
        prev_date,
        next_coupon_date: date(row, cols.next_coupon).map_err(with_ticker)?,
        maturity_date: date(row, cols.mat_date).map_err(with_ticker)?,
        face_unit,
        currency_id,
        loading_date,
        ticker,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loading() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn payload(rows: Value) -> Value {
        json!({
            "securities": {
                "columns": ["SECID", "SECNAME", "PREVWAPRICE", "FACEVALUE", "COUPONVALUE",
                            "COUPONPERIOD", "ACCRUEDINT", "FACEUNIT", "CURRENCYID",
                            "LOTSIZE", "ISSUESIZE", "PREVDATE", "NEXTCOUPON", "MATDATE"],
                "data": rows
            }
        })
    }

    #[test]
    fn test_rouble_coupon_bond() {
        let p = payload(json!([
            ["SU26238RMFS4", "OFZ 26238", 58.5, 1000, 35.4, 182, 12.1, "SUR", "SUR",
             1, 350000000000_i64, "2024-05-31", "2024-06-26", "2041-05-15"]
        ]));
        let parsed = parse_securities(&p, &FxRates::new(), loading()).unwrap();
        let s = &parsed[0];
        assert_eq!(s.prev_price_cur, dec!(585));
        assert_eq!(s.prev_price, Some(dec!(585)));
        assert_eq!(s.coupon_period, Some(182));

        let snap = s.to_snapshot().unwrap();
        assert_eq!(snap.nominal_value, dec!(1000));
        assert_eq!(snap.coupon_value, dec!(35.4));
        assert_eq!(snap.market_price, Some(dec!(585)));
        assert_eq!(snap.next_coupon_date, NaiveDate::from_ymd_opt(2024, 6, 26));
        assert_eq!(snap.loading_date, loading());
    }

    #[test]
    fn test_no_trades_means_no_market_price() {
        let p = payload(json!([
            ["RU000A0JX0J2", "Corp 1", null, 1000, null, 0, 0, "SUR", "SUR",
             1, 1000, "0000-00-00", "0000-00-00", "2027-01-01"]
        ]));
        let snap = parse_securities(&p, &FxRates::new(), loading()).unwrap()[0]
            .to_snapshot()
            .unwrap();
        assert_eq!(snap.market_price, None);
        assert_eq!(snap.coupon_value, Decimal::ZERO);
        assert_eq!(snap.coupon_period, None);
        assert!(matches!(
            snap.require_market_price(),
            Err(BondAnalyticsError::MissingMarketPrice { .. })
        ));
    }

    #[test]
    fn test_foreign_face_unit_is_converted() {
        let fx = FxRates::new().with_rate("USD", dec!(90));
        let p = payload(json!([
            ["RU000A105A95", "Euro 2029", 96, 100, 2.5, 182, 0.3, "USD", "SUR",
             1, 1000, "2024-05-31", "2024-09-01", "2029-03-01"]
        ]));
        let s = &parse_securities(&p, &fx, loading()).unwrap()[0];
        assert_eq!(s.prev_price, Some(dec!(8640)));
        assert_eq!(s.nominal, Some(dec!(9000)));
        assert_eq!(s.coupon_value, Some(dec!(225.0)));
        assert_eq!(s.accrued_coupon, Some(dec!(0.3)));
    }

    #[test]
    fn test_unknown_currency_cannot_be_valued() {
        let p = payload(json!([
            ["XS0000000001", "CNY bond", 99, 1000, 20, 182, 0, "CNY", "CNY",
             1, 1000, null, "2024-09-01", "2026-03-01"],
            ["SU26207RMFS9", "OFZ", 99, 1000, 40, 182, 0, "SUR", "SUR",
             1, 1000, null, "2024-09-01", "2026-03-01"]
        ]));
        let (snapshots, skipped) = parse_snapshots(&p, &FxRates::new(), loading()).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].ticker, "SU26207RMFS9");
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].contains("XS0000000001"));
    }

    #[test]
    fn test_malformed_cell_is_upstream_error() {
        let p = payload(json!([
            ["SU1", "Bad", "n/a", 1000, 0, 0, 0, "SUR", "SUR", 1, 1, null, null, "2030-01-01"]
        ]));
        match parse_securities(&p, &FxRates::new(), loading()) {
            Err(BondAnalyticsError::UpstreamData(msg)) => assert!(msg.starts_with("SU1:")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
