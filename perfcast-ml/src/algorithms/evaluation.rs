//! Cross-validation used to score hyperparameter candidates.

use super::{Classifier, ModelProvider, ParamSet};
use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidation {
    pub n_folds: usize,
    pub stratified: bool,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            n_folds: 5,
            stratified: true,
            shuffle: true,
            random_state: Some(42),
        }
    }
}

impl CrossValidation {
    /// Partition `0..labels.len()` into held-out folds.
    ///
    /// The fold count is capped at the number of samples. Stratified folds
    /// deal each label's members round-robin so every fold sees a similar
    /// label mix.
    pub fn folds(&self, labels: &[usize]) -> Vec<Vec<usize>> {
        let k = self.n_folds.min(labels.len());
        if k == 0 {
            return Vec::new();
        }
        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut folds = vec![Vec::new(); k];

        if self.stratified {
            let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, &label) in labels.iter().enumerate() {
                by_label.entry(label).or_default().push(i);
            }
            let mut slot = 0;
            for members in by_label.values_mut() {
                if self.shuffle {
                    members.shuffle(&mut rng);
                }
                for &i in members.iter() {
                    folds[slot % k].push(i);
                    slot += 1;
                }
            }
        } else {
            let mut order: Vec<usize> = (0..labels.len()).collect();
            if self.shuffle {
                order.shuffle(&mut rng);
            }
            for (pos, i) in order.into_iter().enumerate() {
                folds[pos % k].push(i);
            }
        }
        folds
    }
}

/// Cross-validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub metric_name: String,
}

impl CrossValidationResult {
    pub fn from_scores(scores: Vec<f64>, metric_name: &str) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_scores: scores,
            mean_score: mean,
            std_score: variance.sqrt(),
            metric_name: metric_name.to_string(),
        }
    }
}

/// Fraction of positions where prediction equals truth.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len() as f64
}

/// Mean held-out accuracy of `params` across the folds of `cv`.
pub fn cross_validate<P: ModelProvider>(
    provider: &P,
    params: &ParamSet,
    x: &[Vec<f64>],
    y: &[usize],
    cv: &CrossValidation,
) -> Result<CrossValidationResult, MlError> {
    let folds = cv.folds(y);
    if folds.len() < 2 {
        return Err(MlError::training(format!(
            "cross-validation needs at least 2 folds, {} samples allow {}",
            y.len(),
            folds.len()
        )));
    }

    let mut scores = Vec::with_capacity(folds.len());
    let mut held_out = vec![false; y.len()];
    for fold in &folds {
        held_out.iter_mut().for_each(|h| *h = false);
        for &i in fold {
            held_out[i] = true;
        }
        let (mut fit_x, mut fit_y) = (Vec::new(), Vec::new());
        let (mut val_x, mut val_y) = (Vec::new(), Vec::new());
        for (i, (row, &label)) in x.iter().zip(y).enumerate() {
            if held_out[i] {
                val_x.push(row.clone());
                val_y.push(label);
            } else {
                fit_x.push(row.clone());
                fit_y.push(label);
            }
        }

        let mut model = provider.instantiate(params)?;
        model.fit(&fit_x, &fit_y)?;
        let predicted = model.predict(&val_x)?;
        scores.push(accuracy(&val_y, &predicted));
    }
    Ok(CrossValidationResult::from_scores(scores, "accuracy"))
}
