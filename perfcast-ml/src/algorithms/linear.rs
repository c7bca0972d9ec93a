//! Multinomial logistic regression trained by full-batch gradient descent.

use super::{
    Classifier, ParamSet, argmax, check_params, param_f64, param_usize, validate_predict_input,
    validate_training_set,
};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    learning_rate: f64,
    epochs: usize,
    l2: f64,
    /// One row per label: bias followed by feature weights.
    weights: Vec<Vec<f64>>,
    n_features: Option<usize>,
}

impl SoftmaxRegression {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        check_params(params, &["learning_rate", "epochs", "l2"], "LogisticRegression")?;
        let learning_rate = param_f64(params, "learning_rate", 0.5)?;
        let epochs = param_usize(params, "epochs", 200)?;
        let l2 = param_f64(params, "l2", 0.0)?;
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(MlError::invalid_input("learning_rate must be a positive number"));
        }
        if l2.is_nan() || l2 < 0.0 {
            return Err(MlError::invalid_input("l2 must be non-negative"));
        }
        Ok(Self {
            learning_rate,
            epochs,
            l2,
            weights: Vec::new(),
            n_features: None,
        })
    }

    fn probabilities(&self, row: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .map(|w| w[0] + w[1..].iter().zip(row).map(|(a, b)| a * b).sum::<f64>())
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl Classifier for SoftmaxRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError> {
        let (width, n_labels) = validate_training_set(x, y)?;
        self.weights = vec![vec![0.0; width + 1]; n_labels];
        let n = x.len() as f64;

        for _ in 0..self.epochs {
            let mut grad = vec![vec![0.0; width + 1]; n_labels];
            for (row, &label) in x.iter().zip(y) {
                let probs = self.probabilities(row);
                for (k, g) in grad.iter_mut().enumerate() {
                    let err = probs[k] - if k == label { 1.0 } else { 0.0 };
                    g[0] += err;
                    for (gj, xj) in g[1..].iter_mut().zip(row) {
                        *gj += err * xj;
                    }
                }
            }
            for (w, g) in self.weights.iter_mut().zip(&grad) {
                w[0] -= self.learning_rate * g[0] / n;
                for j in 1..=width {
                    w[j] -= self.learning_rate * (g[j] / n + self.l2 * w[j]);
                }
            }
        }
        self.n_features = Some(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        validate_predict_input(x, self.n_features)?;
        Ok(x.iter().map(|row| argmax(&self.probabilities(row))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1000.0, 1000.0, -5.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_learns_three_corners() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..8 {
            let j = i as f64 * 0.02;
            x.push(vec![0.05 + j, 0.1 - j]);
            y.push(0);
            x.push(vec![0.9 + j * 0.5, 0.05 + j]);
            y.push(1);
            x.push(vec![0.1 - j * 0.5, 0.9 + j * 0.5]);
            y.push(2);
        }
        let mut params = ParamSet::new();
        params.insert("epochs".into(), json!(1000));
        params.insert("learning_rate".into(), json!(1.0));
        let mut model = SoftmaxRegression::from_params(&params).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_zero_epochs_predicts_first_label() {
        let mut params = ParamSet::new();
        params.insert("epochs".into(), json!(0));
        let mut model = SoftmaxRegression::from_params(&params).unwrap();
        model.fit(&[vec![0.0], vec![1.0]], &[1, 1]).unwrap();
        assert_eq!(model.predict(&[vec![0.3]]).unwrap(), vec![0]);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = ParamSet::new();
        params.insert("learning_rate".into(), json!(0.0));
        assert!(SoftmaxRegression::from_params(&params).is_err());
        let mut params = ParamSet::new();
        params.insert("l2".into(), json!(-0.1));
        assert!(SoftmaxRegression::from_params(&params).is_err());
    }
}
