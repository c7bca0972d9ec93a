//! Classification metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Held-out classification metrics for one fitted model.
///
/// Precision, recall and F1 are macro averages over the labels present in
/// either the truth or the prediction. A label whose ratio has a zero
/// denominator contributes 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Option<Vec<Vec<usize>>>,
}

impl ClassificationMetrics {
    pub fn compute(truth: &[usize], predicted: &[usize]) -> Self {
        let labels: BTreeSet<usize> = truth.iter().chain(predicted).copied().collect();
        if labels.is_empty() {
            return Self {
                accuracy: 0.0,
                precision: 0.0,
                recall: 0.0,
                f1_score: 0.0,
                confusion_matrix: None,
            };
        }

        let size = labels.iter().max().map_or(0, |m| m + 1);
        let mut confusion = vec![vec![0usize; size]; size];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion[t][p] += 1;
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
        for &label in &labels {
            let tp = confusion[label][label];
            let predicted_as: usize = confusion.iter().map(|row| row[label]).sum();
            let actually: usize = confusion[label].iter().sum();
            let p = ratio(tp, predicted_as);
            let r = ratio(tp, actually);
            precision += p;
            recall += r;
            f1 += if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) };
        }
        let n = labels.len() as f64;
        let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();

        Self {
            accuracy: ratio(hits, truth.len()),
            precision: precision / n,
            recall: recall / n,
            f1_score: f1 / n,
            confusion_matrix: Some(confusion),
        }
    }
}

/// Mean and population standard deviation of a metric across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std: f64,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_prediction() {
        let m = ClassificationMetrics::compute(&[0, 1, 2, 2], &[0, 1, 2, 2]);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1_score, 1.0);
    }

    #[test]
    fn test_macro_averages() {
        // label 0: tp 1, fp 1, fn 1; label 1: tp 1, fp 1, fn 1
        let m = ClassificationMetrics::compute(&[0, 0, 1, 1], &[0, 1, 1, 0]);
        assert!(close(m.accuracy, 0.5));
        assert!(close(m.precision, 0.5));
        assert!(close(m.recall, 0.5));
        assert!(close(m.f1_score, 0.5));
    }

    #[test]
    fn test_predicted_only_label_counts_with_zero() {
        // label 3 is never true: precision 0, recall 0 (no support), f1 0.
        let m = ClassificationMetrics::compute(&[1, 1], &[1, 3]);
        assert!(close(m.accuracy, 0.5));
        assert!(close(m.precision, 0.5));
        assert!(close(m.recall, 0.25));
        // label 1: p=1, r=0.5, f1=2/3
        assert!(close(m.f1_score, (2.0 / 3.0) / 2.0));
        assert_eq!(m.confusion_matrix.as_ref().map(|c| c.len()), Some(4));
    }

    #[test]
    fn test_empty_inputs() {
        let m = ClassificationMetrics::compute(&[], &[]);
        assert_eq!(m.accuracy, 0.0);
        assert!(m.confusion_matrix.is_none());
    }

    #[test]
    fn test_summary_uses_population_std() {
        let s = MetricSummary::from_values(&[1.0, 3.0]);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std, 1.0);
        assert_eq!(MetricSummary::from_values(&[]), MetricSummary { mean: 0.0, std: 0.0 });
    }
}
