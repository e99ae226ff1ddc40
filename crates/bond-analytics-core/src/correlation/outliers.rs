use serde::{Deserialize, Serialize};

/// Tukey fences around the interquartile range of a sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    /// Observations strictly outside `[lower, upper]`.
    pub outlier_count: usize,
    pub has_outliers: bool,
}

/// Percentile of an ascending, non-empty sample with linear interpolation
/// between closest ranks (`p` in 0..=100).
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Flag observations beyond `multiplier * IQR` outside the quartiles.
pub fn detect_outliers(values: &[f64], multiplier: f64) -> IqrFences {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    if sorted.is_empty() {
        return IqrFences {
            q1: f64::NAN,
            q3: f64::NAN,
            iqr: f64::NAN,
            lower: f64::NAN,
            upper: f64::NAN,
            outlier_count: 0,
            has_outliers: false,
        };
    }

    let q1 = percentile_sorted(&sorted, 25.0);
    let q3 = percentile_sorted(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;
    let outlier_count = sorted.iter().filter(|x| **x < lower || **x > upper).count();

    IqrFences {
        q1,
        q3,
        iqr,
        lower,
        upper,
        outlier_count,
        has_outliers: outlier_count > 0,
    }
}
