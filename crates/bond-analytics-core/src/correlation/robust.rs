//! Ordinary least squares with heteroskedasticity-consistent (HC1) standard
//! errors.
//!
//! The design matrix is always `[1, x]`; `X'X` is 2x2 and inverted directly.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::BondAnalyticsError;
use crate::BondAnalyticsResult;

/// Fit of `second = intercept + slope * first`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustRegression {
    pub intercept: f64,
    pub slope: f64,
    /// HC1 (White, small-sample corrected) standard error of the slope.
    pub slope_std_error: f64,
    pub observations: usize,
}

/// Regress `y` on `x` with an intercept and HC1 covariance.
pub fn robust_regression(x: &[f64], y: &[f64]) -> BondAnalyticsResult<RobustRegression> {
    if x.len() != y.len() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: format!("Columns differ in length: {} vs {}", x.len(), y.len()),
        });
    }
    let n = x.len();
    let k = 2;
    if n <= k {
        return Err(BondAnalyticsError::InsufficientObservations {
            required: k + 1,
            actual: n,
        });
    }

    let design = DMatrix::from_fn(n, k, |i, j| if j == 0 { 1.0 } else { x[i] });
    let response = DVector::from_column_slice(y);

    let xt = design.transpose();
    let xtx_inv = (&xt * &design)
        .try_inverse()
        .ok_or_else(|| BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: "Regressor has no variation; X'X is singular".into(),
        })?;

    let beta = &xtx_inv * (&xt * &response);
    let residuals = &response - &design * &beta;

    // Meat: X' diag(e^2) X
    let mut meat = DMatrix::<f64>::zeros(k, k);
    for i in 0..n {
        let row = design.row(i);
        let e2 = residuals[i] * residuals[i];
        meat += row.transpose() * row * e2;
    }

    let scale = n as f64 / (n - k) as f64;
    let cov = &xtx_inv * meat * &xtx_inv * scale;
    let slope_var = cov[(1, 1)].max(0.0);

    if !beta.iter().all(|v| v.is_finite()) || !slope_var.is_finite() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: "Regression produced non-finite estimates".into(),
        });
    }

    Ok(RobustRegression {
        intercept: beta[0],
        slope: beta[1],
        slope_std_error: slope_var.sqrt(),
        observations: n,
    })
}
