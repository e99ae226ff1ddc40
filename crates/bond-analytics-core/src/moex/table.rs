use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::BondAnalyticsError;
use crate::BondAnalyticsResult;

/// ISS placeholder for "no date".
const NULL_DATE: &str = "0000-00-00";

/// One ISS block: a column list and rows of positional cells.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssTable {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl IssTable {
    /// Extract `payload[block]` as a table.
    pub fn from_payload(payload: &Value, block: &str) -> BondAnalyticsResult<Self> {
        let raw = payload
            .get(block)
            .ok_or_else(|| upstream(format!("payload has no '{block}' block")))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| upstream(format!("malformed '{block}' block: {e}")))
    }

    pub fn column(&self, name: &str) -> BondAnalyticsResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| upstream(format!("missing column {name}")))
    }
}

pub(crate) fn upstream(message: String) -> BondAnalyticsError {
    BondAnalyticsError::UpstreamData(message)
}

pub(crate) fn cell<'a>(row: &'a [Value], idx: usize) -> BondAnalyticsResult<&'a Value> {
    row.get(idx)
        .ok_or_else(|| upstream(format!("row has {} cells, expected index {idx}", row.len())))
}

pub(crate) fn text(row: &[Value], idx: usize) -> BondAnalyticsResult<Option<String>> {
    match cell(row, idx)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(upstream(format!("expected text, got {other}"))),
    }
}

pub(crate) fn decimal(row: &[Value], idx: usize) -> BondAnalyticsResult<Option<Decimal>> {
    match cell(row, idx)? {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .map(Some)
                .map_err(|e| upstream(format!("unrepresentable number {repr}: {e}")))
        }
        other => Err(upstream(format!("expected number, got {other}"))),
    }
}

pub(crate) fn float(row: &[Value], idx: usize) -> BondAnalyticsResult<Option<f64>> {
    match cell(row, idx)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| upstream(format!("unrepresentable number {n}"))),
        other => Err(upstream(format!("expected number, got {other}"))),
    }
}

pub(crate) fn integer(row: &[Value], idx: usize) -> BondAnalyticsResult<Option<i64>> {
    match cell(row, idx)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| upstream(format!("expected integer, got {n}"))),
        other => Err(upstream(format!("expected integer, got {other}"))),
    }
}

/// ISO date cell; null and the `0000-00-00` placeholder both mean absent.
pub(crate) fn date(row: &[Value], idx: usize) -> BondAnalyticsResult<Option<NaiveDate>> {
    match text(row, idx)? {
        None => Ok(None),
        Some(s) if s == NULL_DATE || s.is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| upstream(format!("bad date '{s}': {e}"))),
    }
}
