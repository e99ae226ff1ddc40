use bond_analytics_core::correlation::analyzer::{
    analyze_correlation, CorrelationConfig, CorrelationInput, Recommendation,
};
use bond_analytics_core::correlation::series::{HistoricalPriceSeries, PricePoint};
use bond_analytics_core::{BondAnalyticsError, ErrorClass};
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()
}

fn series(ticker: &str, prices: &[Option<f64>]) -> HistoricalPriceSeries {
    HistoricalPriceSeries::new(
        ticker,
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                trade_date: start() + Duration::days(i as i64),
                close_price: *p,
            })
            .collect(),
    )
}

fn priced(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Two clusters of 15 closes, twenty points apart.
fn two_regimes() -> Vec<f64> {
    (0..15)
        .map(|i| 100.0 + 0.1 * f64::from(i))
        .chain((0..15).map(|i| 120.0 + 0.1 * f64::from(i)))
        .collect()
}

#[test]
fn test_doubled_series_has_unit_dependence() {
    let x = two_regimes();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    let out = analyze_correlation(&CorrelationInput {
        first: series("SU26238RMFS4", &priced(&x)),
        second: series("SU26240RMFS0", &priced(&y)),
        config: CorrelationConfig::default(),
    })
    .unwrap();

    let r = &out.result;
    assert_eq!(r.first_ticker, "SU26238RMFS4");
    assert_eq!(r.observations, 30);
    assert!(r.pearson < 1e-10 && r.spearman < 1e-10 && r.kendall < 1e-10);
    assert!((r.robust - 2.0).abs() < 1e-9);
    assert_eq!(r.recommendation, Recommendation::SpearmanOrKendall);
    assert_eq!(out.metadata.precision, "ieee754_f64");
}

#[test]
fn test_observation_threshold() {
    let x: Vec<f64> = (1..=30).map(f64::from).collect();
    let mut first = priced(&x);
    let second = priced(&x);

    // One missing close leaves 29 aligned rows.
    first[4] = None;
    let err = analyze_correlation(&CorrelationInput {
        first: series("A", &first),
        second: series("B", &second),
        config: CorrelationConfig::default(),
    })
    .unwrap_err();
    assert!(matches!(
        err,
        BondAnalyticsError::InsufficientObservations { required: 30, actual: 29 }
    ));
    assert_eq!(err.class(), ErrorClass::Client);

    let ok = analyze_correlation(&CorrelationInput {
        first: series("A", &priced(&x)),
        second: series("B", &second),
        config: CorrelationConfig::default(),
    });
    assert!(ok.is_ok());
}

#[test]
fn test_unmatched_days_are_dropped_with_a_warning() {
    let x: Vec<f64> = (0..40).map(|i| 95.0 + 0.05 * f64::from(i)).collect();
    let mut y = priced(&x);
    y.truncate(35);
    let out = analyze_correlation(&CorrelationInput {
        first: series("A", &priced(&x)),
        second: series("B", &y),
        config: CorrelationConfig::default(),
    })
    .unwrap();
    assert_eq!(out.result.observations, 35);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_price_spike_forces_robust_regression() {
    let x: Vec<f64> = (0..60).map(|i| 98.0 + 0.02 * f64::from(i)).collect();
    let mut y: Vec<f64> = x.iter().map(|v| v + 1.0).collect();
    y[31] = 130.0;
    let out = analyze_correlation(&CorrelationInput {
        first: series("A", &priced(&x)),
        second: series("B", &priced(&y)),
        config: CorrelationConfig::default(),
    })
    .unwrap();
    assert_eq!(out.result.recommendation, Recommendation::RobustRegression);
    assert_eq!(out.result.second_diagnostics.outlier_count, 1);
    assert!(!out.result.first_diagnostics.has_outliers);
}

#[test]
fn test_malformed_series_is_upstream_error() {
    let mut points = priced(&two_regimes());
    points[3] = Some(-1.0);
    let err = analyze_correlation(&CorrelationInput {
        first: series("A", &points),
        second: series("B", &priced(&two_regimes())),
        config: CorrelationConfig::default(),
    })
    .unwrap_err();
    assert!(matches!(err, BondAnalyticsError::UpstreamData(_)));
    assert_eq!(err.class(), ErrorClass::Server);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let input: CorrelationInput = serde_json::from_value(serde_json::json!({
        "first": {"ticker": "A", "points": []},
        "second": {"ticker": "B", "points": []},
        "config": {"normality_alpha": 0.01}
    }))
    .unwrap();
    assert_eq!(input.config.min_observations, 30);
    assert_eq!(input.config.normality_alpha, 0.01);
}
