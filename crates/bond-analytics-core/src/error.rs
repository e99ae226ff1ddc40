use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondAnalyticsError {
    #[error("Missing market price: no previous weighted-average price for {ticker}")]
    MissingMarketPrice { ticker: String },

    #[error("Invalid cash-flow schedule: {0}")]
    InvalidSchedule(String),

    #[error("Numerical divergence: yield search stopped after {iterations} iterations (last estimate: {last_estimate}%, residual: {residual})")]
    NumericalDivergence {
        last_estimate: Decimal,
        residual: Decimal,
        iterations: u32,
    },

    #[error("Insufficient observations: {actual} aligned rows, at least {required} required")]
    InsufficientObservations { required: usize, actual: usize },

    #[error("Upstream data error: {0}")]
    UpstreamData(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Which side of a request boundary an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request itself cannot be served (bad or insufficient input).
    Client,
    /// The engine or its data source failed.
    Server,
}

impl BondAnalyticsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BondAnalyticsError::MissingMarketPrice { .. }
            | BondAnalyticsError::InvalidSchedule(_)
            | BondAnalyticsError::InsufficientObservations { .. }
            | BondAnalyticsError::InvalidInput { .. } => ErrorClass::Client,
            BondAnalyticsError::NumericalDivergence { .. }
            | BondAnalyticsError::UpstreamData(_)
            | BondAnalyticsError::Serialization(_) => ErrorClass::Server,
        }
    }

    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BondAnalyticsError::MissingMarketPrice { .. } => "missing_market_price",
            BondAnalyticsError::InvalidSchedule(_) => "invalid_schedule",
            BondAnalyticsError::NumericalDivergence { .. } => "numerical_divergence",
            BondAnalyticsError::InsufficientObservations { .. } => "insufficient_observations",
            BondAnalyticsError::UpstreamData(_) => "upstream_data",
            BondAnalyticsError::InvalidInput { .. } => "invalid_input",
            BondAnalyticsError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for BondAnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        BondAnalyticsError::Serialization(e.to_string())
    }
}
