use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::error::BondAnalyticsError;
use crate::BondAnalyticsResult;

/// Largest sample for which Kendall's exact null distribution is used when
/// there are no ties.
const KENDALL_EXACT_MAX_N: usize = 33;

/// A correlation coefficient with the two-sided p-value of the test of no
/// association.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrelationTest {
    pub coefficient: f64,
    pub p_value: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Pearson product-moment correlation; p-value from Student's t with n - 2
/// degrees of freedom.
pub fn pearson(x: &[f64], y: &[f64]) -> BondAnalyticsResult<CorrelationTest> {
    check_pair(x, y, 3)?;
    let r = pearson_coefficient(x, y)?;
    Ok(CorrelationTest {
        coefficient: r,
        p_value: t_test_p_value(r, x.len())?,
    })
}

/// Spearman rank correlation: Pearson on average ranks, same t-based test.
pub fn spearman(x: &[f64], y: &[f64]) -> BondAnalyticsResult<CorrelationTest> {
    check_pair(x, y, 3)?;
    let rx = average_ranks(x);
    let ry = average_ranks(y);
    let rho = pearson_coefficient(&rx, &ry)?;
    Ok(CorrelationTest {
        coefficient: rho,
        p_value: t_test_p_value(rho, x.len())?,
    })
}

/// Kendall's tau-b with tie correction.
///
/// Exact permutation p-value for small samples without ties, normal
/// approximation with tie-adjusted variance otherwise.
pub fn kendall(x: &[f64], y: &[f64]) -> BondAnalyticsResult<CorrelationTest> {
    check_pair(x, y, 3)?;
    let n = x.len();

    let mut concordant: i64 = 0;
    let mut discordant: i64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let s = sign(x[i] - x[j]) * sign(y[i] - y[j]);
            if s > 0 {
                concordant += 1;
            } else if s < 0 {
                discordant += 1;
            }
        }
    }

    let x_ties = TieCounts::of(x);
    let y_ties = TieCounts::of(y);
    let total = (n * (n - 1) / 2) as f64;
    let denom = ((total - x_ties.pairs) * (total - y_ties.pairs)).sqrt();
    if denom == 0.0 {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: "Kendall's tau is undefined for a constant series".into(),
        });
    }

    let score = (concordant - discordant) as f64;
    let tau = (score / denom).clamp(-1.0, 1.0);

    let no_ties = x_ties.pairs == 0.0 && y_ties.pairs == 0.0;
    let c = discordant.min(concordant) as u64;
    let p_value = if no_ties && (n <= KENDALL_EXACT_MAX_N || c <= 1) {
        kendall_exact_p_value(n, c)
    } else {
        let nf = n as f64;
        let m = nf * (nf - 1.0);
        let var = (m * (2.0 * nf + 5.0) - x_ties.v1 - y_ties.v1) / 18.0
            + (2.0 * x_ties.pairs * y_ties.pairs) / m
            + x_ties.v0 * y_ties.v0 / (9.0 * m * (nf - 2.0));
        two_sided_normal_p_value(score / var.sqrt())?
    };

    Ok(CorrelationTest {
        coefficient: tau,
        p_value,
    })
}

/// Ranks starting at 1, ties receiving the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the average of ranks i+1..=j+1.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for idx in &order[i..=j] {
            ranks[*idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn check_pair(x: &[f64], y: &[f64], min_len: usize) -> BondAnalyticsResult<()> {
    if x.len() != y.len() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: format!("Columns differ in length: {} vs {}", x.len(), y.len()),
        });
    }
    if x.len() < min_len {
        return Err(BondAnalyticsError::InsufficientObservations {
            required: min_len,
            actual: x.len(),
        });
    }
    Ok(())
}

fn pearson_coefficient(x: &[f64], y: &[f64]) -> BondAnalyticsResult<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(BondAnalyticsError::InvalidInput {
            field: "values".into(),
            reason: "Correlation is undefined for a constant series".into(),
        });
    }
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value of H0: rho = 0 via t = r * sqrt((n-2) / (1-r^2)).
fn t_test_p_value(r: f64, n: usize) -> BondAnalyticsResult<f64> {
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let dof = (n - 2) as f64;
    let t = r * (dof / ((1.0 + r) * (1.0 - r))).sqrt();
    let dist = StudentsT::new(0.0, 1.0, dof).map_err(|e| BondAnalyticsError::InvalidInput {
        field: "values".into(),
        reason: format!("Cannot build t distribution: {e}"),
    })?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

fn two_sided_normal_p_value(z: f64) -> BondAnalyticsResult<f64> {
    if !z.is_finite() {
        return Ok(0.0);
    }
    let std_normal = Normal::new(0.0, 1.0).map_err(|e| BondAnalyticsError::InvalidInput {
        field: "values".into(),
        reason: format!("Cannot build normal distribution: {e}"),
    })?;
    Ok((2.0 * std_normal.sf(z.abs())).clamp(0.0, 1.0))
}

/// Exact two-sided p-value of Kendall's statistic when `c` is the smaller of
/// the concordant and discordant pair counts.
///
/// Counts permutations of `n` elements with at most `c` inversions using
/// the Mahonian recurrence.
fn kendall_exact_p_value(n: usize, c: u64) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let total_pairs = (n * (n - 1) / 2) as u64;
    if 2 * c == total_pairs {
        return 1.0;
    }
    if n >= 171 {
        // n! overflows f64; the probability underflows to zero anyway.
        return 0.0;
    }

    let c = c as usize;
    let mut counts = vec![0.0_f64; c + 1];
    counts[0] = 1.0;
    if c >= 1 {
        counts[1] = 1.0;
    }
    for j in 3..=n {
        // Prefix sums then subtract the window that falls out of range.
        let mut prefix = counts.clone();
        for i in 1..=c {
            prefix[i] += prefix[i - 1];
        }
        if j <= c {
            for i in (j..=c).rev() {
                prefix[i] -= prefix[i - j];
            }
        }
        counts = prefix;
    }

    let factorial: f64 = (1..=n).map(|k| k as f64).product();
    (2.0 * counts.iter().sum::<f64>() / factorial).clamp(0.0, 1.0)
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Tie summaries used by tau-b and its variance.
struct TieCounts {
    /// Σ t(t-1)/2 over tie groups.
    pairs: f64,
    /// Σ t(t-1)(t-2).
    v0: f64,
    /// Σ t(t-1)(2t+5).
    v1: f64,
}

impl TieCounts {
    fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut out = TieCounts {
            pairs: 0.0,
            v0: 0.0,
            v1: 0.0,
        };
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i + 1;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            let t = (j - i) as f64;
            if t > 1.0 {
                out.pairs += t * (t - 1.0) / 2.0;
                out.v0 += t * (t - 1.0) * (t - 2.0);
                out.v1 += t * (t - 1.0) * (2.0 * t + 5.0);
            }
            i = j;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
