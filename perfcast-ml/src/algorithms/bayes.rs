//! Gaussian naive Bayes.

use super::{
    Classifier, ParamSet, argmax, check_params, param_f64, validate_predict_input,
    validate_training_set,
};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Per-class independent normal likelihoods with empirical priors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNb {
    var_smoothing: f64,
    /// Per label: `None` when the label never occurred in training.
    classes: Vec<Option<ClassStats>>,
    n_features: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    log_prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl GaussianNb {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        check_params(params, &["var_smoothing"], "GaussianNB")?;
        let var_smoothing = param_f64(params, "var_smoothing", 1e-9)?;
        if var_smoothing.is_nan() || var_smoothing < 0.0 {
            return Err(MlError::invalid_input("var_smoothing must be non-negative"));
        }
        Ok(Self {
            var_smoothing,
            classes: Vec::new(),
            n_features: None,
        })
    }

    fn log_posteriors(&self, row: &[f64]) -> Vec<f64> {
        self.classes
            .iter()
            .map(|stats| match stats {
                None => f64::NEG_INFINITY,
                Some(s) => {
                    s.log_prior
                        + row
                            .iter()
                            .zip(s.means.iter().zip(&s.variances))
                            .map(|(&v, (&m, &var))| {
                                -0.5 * ((2.0 * std::f64::consts::PI * var).ln() + (v - m).powi(2) / var)
                            })
                            .sum::<f64>()
                }
            })
            .collect()
    }
}

fn mean_var(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count() as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var)
}

impl Classifier for GaussianNb {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError> {
        let (width, n_labels) = validate_training_set(x, y)?;

        let max_var = (0..width)
            .map(|f| mean_var(x.iter().map(move |row| row[f])).1)
            .fold(0.0_f64, f64::max);
        // Keeps every variance strictly positive, including constant features.
        let epsilon = (self.var_smoothing * max_var).max(1e-12);

        let n = x.len() as f64;
        self.classes = (0..n_labels)
            .map(|label| {
                let members: Vec<&Vec<f64>> =
                    x.iter().zip(y).filter(|(_, l)| **l == label).map(|(r, _)| r).collect();
                if members.is_empty() {
                    return None;
                }
                let (means, variances) = (0..width)
                    .map(|f| {
                        let (m, v) = mean_var(members.iter().map(|r| r[f]));
                        (m, v + epsilon)
                    })
                    .unzip();
                Some(ClassStats {
                    log_prior: (members.len() as f64 / n).ln(),
                    means,
                    variances,
                })
            })
            .collect();
        self.n_features = Some(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        validate_predict_input(x, self.n_features)?;
        Ok(x.iter().map(|row| argmax(&self.log_posteriors(row))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_gaussian_clusters() {
        let x = vec![
            vec![1.0, 10.0],
            vec![1.2, 11.0],
            vec![0.8, 9.0],
            vec![5.0, 1.0],
            vec![5.3, 1.5],
            vec![4.7, 0.5],
        ];
        let y = vec![0, 0, 0, 3, 3, 3];
        let mut nb = GaussianNb::from_params(&ParamSet::new()).unwrap();
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&[vec![1.1, 10.5], vec![4.9, 1.2]]).unwrap(), vec![0, 3]);
    }

    #[test]
    fn test_missing_labels_never_predicted() {
        let x = vec![vec![0.0], vec![0.1], vec![1.0], vec![1.1]];
        let y = vec![1, 1, 4, 4];
        let mut nb = GaussianNb::from_params(&ParamSet::new()).unwrap();
        nb.fit(&x, &y).unwrap();
        for p in nb.predict(&[vec![-3.0], vec![0.5], vec![9.0]]).unwrap() {
            assert!(p == 1 || p == 4);
        }
    }

    #[test]
    fn test_constant_feature_is_finite() {
        let x = vec![vec![1.0, 0.0], vec![1.0, 1.0]];
        let mut nb = GaussianNb::from_params(&ParamSet::new()).unwrap();
        nb.fit(&x, &[0, 1]).unwrap();
        assert_eq!(nb.predict(&x).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_negative_smoothing_rejected() {
        let mut params = ParamSet::new();
        params.insert("var_smoothing".into(), serde_json::json!(-1.0));
        assert!(GaussianNb::from_params(&params).is_err());
    }
}
