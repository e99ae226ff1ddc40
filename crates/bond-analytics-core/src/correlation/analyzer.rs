use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::measures::{kendall, pearson, spearman};
use super::normality::check_normality;
use super::outliers::detect_outliers;
use super::robust::{robust_regression, RobustRegression};
use super::series::{align, HistoricalPriceSeries};
use crate::error::BondAnalyticsError;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Thresholds of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Aligned rows required before any statistic is computed.
    pub min_observations: usize,
    /// KS p-value at or above which a column counts as normal.
    pub normality_alpha: f64,
    /// Tukey fence width in IQRs.
    pub iqr_multiplier: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_observations: 30,
            normality_alpha: 0.05,
            iqr_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationInput {
    pub first: HistoricalPriceSeries,
    pub second: HistoricalPriceSeries,
    #[serde(default)]
    pub config: CorrelationConfig,
}

/// Which measure the data supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Pearson,
    SpearmanOrKendall,
    RobustRegression,
}

impl Recommendation {
    pub fn advice(self) -> &'static str {
        match self {
            Recommendation::Pearson => {
                "Both series look normal with no outliers; rely on the Pearson coefficient"
            }
            Recommendation::SpearmanOrKendall => {
                "At least one series is not normal; rely on the Spearman or Kendall coefficient"
            }
            Recommendation::RobustRegression => {
                "Outliers detected; rely on the correlation estimated by robust (HC1) regression"
            }
        }
    }
}

/// Distribution checks on one column of the aligned pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDiagnostics {
    pub ticker: String,
    pub mean: f64,
    pub std_dev: f64,
    pub ks_statistic: f64,
    pub ks_p_value: f64,
    pub is_normal: bool,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub outlier_count: usize,
    pub has_outliers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficients {
    pub pearson_r: f64,
    pub spearman_rho: f64,
    pub kendall_tau: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub first_ticker: String,
    pub second_ticker: String,
    pub observations: usize,
    /// Two-sided p-value of the Pearson test.
    pub pearson: f64,
    /// Two-sided p-value of the Spearman test.
    pub spearman: f64,
    /// Two-sided p-value of the Kendall tau-b test.
    pub kendall: f64,
    /// OLS slope of the second series on the first.
    pub robust: f64,
    pub recommendation: Recommendation,
    pub advice: String,
    pub coefficients: Coefficients,
    pub first_diagnostics: ColumnDiagnostics,
    pub second_diagnostics: ColumnDiagnostics,
    pub regression: RobustRegression,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Align two price histories, check each for normality and outliers, run
/// the three correlation tests plus a robust regression, and recommend the
/// measure the data supports.
pub fn analyze_correlation(
    input: &CorrelationInput,
) -> BondAnalyticsResult<ComputationOutput<CorrelationResult>> {
    let start = Instant::now();
    let config = &input.config;
    validate_config(config)?;

    let pair = align(&input.first, &input.second)?;
    if pair.len() < config.min_observations {
        tracing::warn!(
            first = %pair.first_ticker,
            second = %pair.second_ticker,
            rows = pair.len(),
            "not enough overlapping history"
        );
        return Err(BondAnalyticsError::InsufficientObservations {
            required: config.min_observations,
            actual: pair.len(),
        });
    }

    let x = pair.first_column();
    let y = pair.second_column();

    let first_diagnostics = diagnose(&pair.first_ticker, &x, config)?;
    let second_diagnostics = diagnose(&pair.second_ticker, &y, config)?;

    let pearson = pearson(&x, &y)?;
    let spearman = spearman(&x, &y)?;
    let kendall = kendall(&x, &y)?;
    let regression = robust_regression(&x, &y)?;

    let recommendation = recommend(&first_diagnostics, &second_diagnostics);

    tracing::debug!(
        first = %pair.first_ticker,
        second = %pair.second_ticker,
        rows = pair.len(),
        first_normal = first_diagnostics.is_normal,
        second_normal = second_diagnostics.is_normal,
        outliers = first_diagnostics.outlier_count + second_diagnostics.outlier_count,
        ?recommendation,
        "correlation analyzed"
    );

    let mut warnings = Vec::new();
    let dropped = input
        .first
        .points
        .len()
        .max(input.second.points.len())
        .saturating_sub(pair.len());
    if dropped > 0 {
        warnings.push(format!(
            "{dropped} trading days dropped for missing or unmatched prices"
        ));
    }

    let result = CorrelationResult {
        first_ticker: pair.first_ticker.clone(),
        second_ticker: pair.second_ticker.clone(),
        observations: pair.len(),
        pearson: pearson.p_value,
        spearman: spearman.p_value,
        kendall: kendall.p_value,
        robust: regression.slope,
        recommendation,
        advice: recommendation.advice().to_string(),
        coefficients: Coefficients {
            pearson_r: pearson.coefficient,
            spearman_rho: spearman.coefficient,
            kendall_tau: kendall.coefficient,
        },
        first_diagnostics,
        second_diagnostics,
        regression,
    };

    let assumptions = serde_json::json!({
        "alignment": "inner on trade date, rows with a missing price dropped",
        "min_observations": config.min_observations,
        "normality_test": "one-sample Kolmogorov-Smirnov against a fitted normal",
        "normality_alpha": config.normality_alpha,
        "outlier_rule": format!("{} x IQR Tukey fences", config.iqr_multiplier),
        "kendall_variant": "tau-b",
        "regression_covariance": "HC1",
    });

    Ok(with_metadata_f64(
        "Price correlation: Pearson, Spearman, Kendall tests and HC1 regression",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    ))
}

/// Outliers dominate; otherwise normality decides between Pearson and the
/// rank measures.
pub fn recommend(first: &ColumnDiagnostics, second: &ColumnDiagnostics) -> Recommendation {
    if first.has_outliers || second.has_outliers {
        Recommendation::RobustRegression
    } else if first.is_normal && second.is_normal {
        Recommendation::Pearson
    } else {
        Recommendation::SpearmanOrKendall
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_config(config: &CorrelationConfig) -> BondAnalyticsResult<()> {
    if config.min_observations < 3 {
        return Err(BondAnalyticsError::InvalidInput {
            field: "config.min_observations".into(),
            reason: "At least 3 observations are needed for any of the tests".into(),
        });
    }
    if !(config.normality_alpha > 0.0 && config.normality_alpha < 1.0) {
        return Err(BondAnalyticsError::InvalidInput {
            field: "config.normality_alpha".into(),
            reason: "Significance level must lie in (0, 1)".into(),
        });
    }
    if !(config.iqr_multiplier.is_finite() && config.iqr_multiplier >= 0.0) {
        return Err(BondAnalyticsError::InvalidInput {
            field: "config.iqr_multiplier".into(),
            reason: "IQR multiplier must be a non-negative number".into(),
        });
    }
    Ok(())
}

fn diagnose(
    ticker: &str,
    values: &[f64],
    config: &CorrelationConfig,
) -> BondAnalyticsResult<ColumnDiagnostics> {
    let normality = check_normality(values, config.normality_alpha).map_err(|e| match e {
        BondAnalyticsError::InvalidInput { reason, .. } => BondAnalyticsError::InvalidInput {
            field: ticker.to_string(),
            reason,
        },
        other => other,
    })?;
    let fences = detect_outliers(values, config.iqr_multiplier);

    Ok(ColumnDiagnostics {
        ticker: ticker.to_string(),
        mean: normality.mean,
        std_dev: normality.std_dev,
        ks_statistic: normality.statistic,
        ks_p_value: normality.p_value,
        is_normal: normality.is_normal,
        lower_fence: fences.lower,
        upper_fence: fences.upper,
        outlier_count: fences.outlier_count,
        has_outliers: fences.has_outliers,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::series::PricePoint;
    use chrono::{Duration, NaiveDate};

    fn series(ticker: &str, prices: &[f64]) -> HistoricalPriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        HistoricalPriceSeries::new(
            ticker,
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| PricePoint {
                    trade_date: start + Duration::days(i as i64),
                    close_price: Some(*p),
                })
                .collect(),
        )
    }

    fn input(x: &[f64], y: &[f64]) -> CorrelationInput {
        CorrelationInput {
            first: series("A", x),
            second: series("B", y),
            config: CorrelationConfig::default(),
        }
    }

    fn bimodal() -> Vec<f64> {
        (0..15)
            .map(|i| 100.0 + 0.1 * f64::from(i))
            .chain((0..15).map(|i| 120.0 + 0.1 * f64::from(i)))
            .collect()
    }

    #[test]
    fn test_twenty_nine_rows_is_not_enough() {
        let x: Vec<f64> = (1..=29).map(f64::from).collect();
        let err = analyze_correlation(&input(&x, &x)).unwrap_err();
        match err {
            BondAnalyticsError::InsufficientObservations { required, actual } => {
                assert_eq!(required, 30);
                assert_eq!(actual, 29);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bimodal_doubled_series_recommends_rank_measures() {
        let x = bimodal();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();

        let out = analyze_correlation(&input(&x, &y)).unwrap();
        let r = &out.result;
        assert_eq!(r.observations, 30);
        assert!(r.pearson < 1e-10);
        assert!(r.spearman < 1e-10);
        assert!(r.kendall < 1e-10);
        assert!((r.robust - 2.0).abs() < 1e-9);
        assert!(!r.first_diagnostics.is_normal);
        assert!(!r.first_diagnostics.has_outliers);
        assert_eq!(r.recommendation, Recommendation::SpearmanOrKendall);
        assert_eq!(r.advice, Recommendation::SpearmanOrKendall.advice());
    }

    #[test]
    fn test_ramp_recommends_pearson() {
        let x: Vec<f64> = (1..=30).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 50.0 + 0.5 * v).collect();
        let out = analyze_correlation(&input(&x, &y)).unwrap();
        assert_eq!(out.result.recommendation, Recommendation::Pearson);
        assert!((out.result.coefficients.pearson_r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spike_recommends_robust_regression() {
        let x: Vec<f64> = (0..30).map(|i| 100.0 + 0.1 * f64::from(i)).collect();
        let mut y = x.clone();
        y[17] = 140.0;
        let out = analyze_correlation(&input(&x, &y)).unwrap();
        assert!(out.result.second_diagnostics.has_outliers);
        assert_eq!(out.result.recommendation, Recommendation::RobustRegression);
    }

    #[test]
    fn test_constant_series_is_invalid_input() {
        let x: Vec<f64> = (1..=30).map(f64::from).collect();
        let y = vec![100.0; 30];
        let err = analyze_correlation(&input(&x, &y)).unwrap_err();
        assert!(matches!(err, BondAnalyticsError::InvalidInput { ref field, .. } if field == "B"));
    }

    #[test]
    fn test_config_overrides_minimum() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let mut inp = input(&x, &x);
        inp.config.min_observations = 10;
        assert!(analyze_correlation(&inp).is_ok());
    }

    #[test]
    fn test_recommendation_priority() {
        let base = ColumnDiagnostics {
            ticker: "A".into(),
            mean: 0.0,
            std_dev: 1.0,
            ks_statistic: 0.1,
            ks_p_value: 0.5,
            is_normal: true,
            lower_fence: -1.0,
            upper_fence: 1.0,
            outlier_count: 0,
            has_outliers: false,
        };
        let non_normal = ColumnDiagnostics {
            is_normal: false,
            ..base.clone()
        };
        let outlying = ColumnDiagnostics {
            outlier_count: 2,
            has_outliers: true,
            ..non_normal.clone()
        };
        assert_eq!(recommend(&base, &base), Recommendation::Pearson);
        assert_eq!(recommend(&base, &non_normal), Recommendation::SpearmanOrKendall);
        assert_eq!(recommend(&outlying, &base), Recommendation::RobustRegression);
    }
}
