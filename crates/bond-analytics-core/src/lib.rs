pub mod error;
pub mod types;

#[cfg(feature = "valuation")]
pub mod bond;

#[cfg(feature = "correlation")]
pub mod correlation;

#[cfg(feature = "moex")]
pub mod moex;

pub use error::{BondAnalyticsError, ErrorClass};
pub use types::*;

/// Standard result type for all bond-analytics operations
pub type BondAnalyticsResult<T> = Result<T, BondAnalyticsError>;
