//! Paired significance testing across training iterations.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Paired t-test outcome. `t_stat` is `None` when the statistic is
/// undefined (zero-variance differences with a non-zero mean).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_stat: Option<f64>,
    pub p_value: f64,
}

impl TTestResult {
    const NO_EVIDENCE: Self = Self {
        t_stat: Some(0.0),
        p_value: 1.0,
    };
}

/// Two-sided paired t-test of `a` against `b`.
///
/// Fewer than two pairs, or identical series, give `t = 0, p = 1`.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    let n = a.len().min(b.len());
    if n < 2 {
        return TTestResult::NO_EVIDENCE;
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let nf = n as f64;
    let mean = diffs.iter().sum::<f64>() / nf;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (nf - 1.0);

    if var.sqrt() <= 1e-12 {
        if mean.abs() <= 1e-12 {
            return TTestResult::NO_EVIDENCE;
        }
        return TTestResult {
            t_stat: None,
            p_value: 0.0,
        };
    }

    let t = mean / (var / nf).sqrt();
    let p_value = match StudentsT::new(0.0, 1.0, nf - 1.0) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    };
    TTestResult {
        t_stat: Some(t),
        p_value,
    }
}

/// Confidence percentage derived from a p-value.
pub fn confidence_level(p_value: f64) -> f64 {
    (1.0 - p_value) * 100.0
}
