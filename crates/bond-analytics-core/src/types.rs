use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values, in settlement currency. Wraps Decimal to prevent
/// accidental f64 usage.
pub type Money = Decimal;

/// Annual rates expressed as percentages (5.25 = 5.25%).
pub type Percent = Decimal;

/// Year fractions
pub type Years = Decimal;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        "rust_decimal_128bit",
        result,
    )
}

/// Same as [`with_metadata`] for results computed in floating point.
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        "ieee754_f64",
        result,
    )
}

fn wrap<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.to_string(),
        },
    }
}
