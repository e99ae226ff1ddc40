use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::BondAnalyticsError;
use crate::BondAnalyticsResult;

/// One-sample Kolmogorov-Smirnov test against a normal distribution fitted
/// to the sample itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalityTest {
    /// Fitted location (sample mean).
    pub mean: f64,
    /// Fitted scale (maximum-likelihood standard deviation, divisor n).
    pub std_dev: f64,
    /// Largest gap between the empirical and fitted CDFs.
    pub statistic: f64,
    pub p_value: f64,
    /// `p_value >= alpha`.
    pub is_normal: bool,
}

/// Fit a normal distribution by mean and MLE standard deviation, then run a
/// two-sided KS test of the sample against it.
pub fn check_normality(values: &[f64], alpha: f64) -> BondAnalyticsResult<NormalityTest> {
    let n = values.len();
    if n < 2 {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: "Normality test needs at least two observations".into(),
        });
    }

    let (mean, std_dev) = fit_normal(values);
    let fitted = Normal::new(mean, std_dev).map_err(|e| BondAnalyticsError::InvalidInput {
        field: "values".into(),
        reason: format!("Cannot fit a normal distribution: {e}"),
    })?;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let nf = n as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let cdf = fitted.cdf(*x);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);

    let p_value = (1.0 - kolmogorov_cdf(n, statistic)).clamp(0.0, 1.0);

    Ok(NormalityTest {
        mean,
        std_dev,
        statistic,
        p_value,
        is_normal: p_value >= alpha,
    })
}

/// Sample mean and maximum-likelihood standard deviation.
pub fn fit_normal(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Distribution function of the two-sided KS statistic for sample size `n`,
/// P(D_n < d).
///
/// Marsaglia, Tsang & Wang (2003): exact via a matrix power, with the
/// published closed-form tail approximation when the probability is within
/// ~1e-7 of one.
pub fn kolmogorov_cdf(n: usize, d: f64) -> f64 {
    if n == 0 || d <= 0.0 {
        return 0.0;
    }
    if d >= 1.0 {
        return 1.0;
    }

    let nf = n as f64;
    let s = d * d * nf;
    if s > 7.24 || (s > 3.76 && n > 99) {
        return 1.0 - 2.0 * (-(2.000071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
    }

    let k = (nf * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut hm = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..m {
            if j <= i + 1 {
                hm[i * m + j] = 1.0;
            }
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if j < i + 1 {
                for g in 1..=(i + 1 - j) {
                    hm[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, 0, m, n);
    let mut s = q[(k - 1) * m + k - 1];
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1e-140 {
            s *= 1e140;
            exponent -= 140;
        }
    }
    s * 10f64.powi(exponent)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * m];
    for i in 0..m {
        for k in 0..m {
            let aik = a[i * m + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..m {
                c[i * m + j] += aik * b[k * m + j];
            }
        }
    }
    c
}

/// `a^n` with a base-10 exponent carried separately to avoid overflow.
fn matrix_power(a: &[f64], a_exp: i32, m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), a_exp);
    }
    let (half, half_exp) = matrix_power(a, a_exp, m, n / 2);
    let squared = matrix_multiply(&half, &half, m);
    let (mut v, mut v_exp) = if n % 2 == 0 {
        (squared, 2 * half_exp)
    } else {
        (matrix_multiply(a, &squared, m), a_exp + 2 * half_exp)
    };
    if v[(m / 2) * m + m / 2] > 1e140 {
        for x in v.iter_mut() {
            *x *= 1e-140;
        }
        v_exp += 140;
    }
    (v, v_exp)
}
