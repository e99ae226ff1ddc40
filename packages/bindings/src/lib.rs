use std::str::FromStr;

use bond_analytics_core::{BondAnalyticsError, ErrorClass};
use napi::{Result as NapiResult, Status};
use napi_derive::napi;
use rust_decimal::Decimal;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine errors keep their client/server class so JS callers can map
/// them to response codes; the message is prefixed with the error kind.
fn engine_error(e: BondAnalyticsError) -> napi::Error {
    let status = match e.class() {
        ErrorClass::Client => Status::InvalidArg,
        ErrorClass::Server => Status::GenericFailure,
    };
    napi::Error::new(status, format!("[{}] {}", e.kind(), e))
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn build_cash_flow_schedule(snapshot_json: String) -> NapiResult<String> {
    let snapshot: bond_analytics_core::bond::snapshot::BondSnapshot =
        serde_json::from_str(&snapshot_json).map_err(to_napi_error)?;
    let schedule =
        bond_analytics_core::bond::schedule::build_schedule(&snapshot).map_err(engine_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

#[napi]
pub fn value_bond(input_json: String) -> NapiResult<String> {
    let input: bond_analytics_core::bond::metrics::BondValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    bond_analytics_core::bond::metrics::validate_target_rate(input.target_rate)
        .map_err(engine_error)?;
    let output =
        bond_analytics_core::bond::metrics::evaluate_bond(&input).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn value_bond_batch(input_json: String) -> NapiResult<String> {
    let input: bond_analytics_core::bond::metrics::BatchValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    bond_analytics_core::bond::metrics::validate_target_rate(input.target_rate)
        .map_err(engine_error)?;
    let output = bond_analytics_core::bond::metrics::evaluate_batch(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn is_admissible_target_rate(rate: String) -> NapiResult<bool> {
    let rate = Decimal::from_str(rate.trim()).map_err(to_napi_error)?;
    Ok(bond_analytics_core::bond::metrics::is_admissible_target_rate(rate))
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_correlation(input_json: String) -> NapiResult<String> {
    let input: bond_analytics_core::correlation::analyzer::CorrelationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = bond_analytics_core::correlation::analyzer::analyze_correlation(&input)
        .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// MOEX ISS
// ---------------------------------------------------------------------------

/// `fx_json` maps currency codes to rates, e.g. `{"USD": "92.1"}`, or lists
/// CBR daily quotes (`CharCode`, `Nominal`, `Value`); pass
/// `"{}"` for rouble-only boards. `loading_date` is ISO `YYYY-MM-DD`.
#[napi]
pub fn parse_moex_securities(
    payload_json: String,
    fx_json: String,
    loading_date: String,
) -> NapiResult<String> {
    let payload: serde_json::Value = serde_json::from_str(&payload_json).map_err(to_napi_error)?;
    let fx_value: serde_json::Value = serde_json::from_str(&fx_json).map_err(to_napi_error)?;
    let fx = bond_analytics_core::moex::fx::FxRates::from_json(&fx_value).map_err(engine_error)?;
    let loading_date = chrono_date(&loading_date).map_err(to_napi_error)?;
    let (snapshots, skipped) =
        bond_analytics_core::moex::securities::parse_snapshots(&payload, &fx, loading_date)
            .map_err(engine_error)?;
    serde_json::to_string(&serde_json::json!({
        "snapshots": snapshots,
        "skipped": skipped,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn parse_moex_history(ticker: String, pages_json: String) -> NapiResult<String> {
    let pages: Vec<serde_json::Value> = serde_json::from_str(&pages_json).map_err(to_napi_error)?;
    let series = bond_analytics_core::moex::history::parse_history(&ticker, &pages)
        .map_err(engine_error)?;
    serde_json::to_string(&series).map_err(to_napi_error)
}

fn chrono_date(s: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}
