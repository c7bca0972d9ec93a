//! k-nearest-neighbours classifier.

use super::{
    Classifier, ParamSet, argmax, check_params, param_str, param_usize, validate_predict_input,
    validate_training_set,
};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    Uniform,
    Distance,
}

/// Euclidean k-NN. Fitting memorises the training set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    n_neighbors: usize,
    weights: Weighting,
    n_labels: usize,
    train_x: Vec<Vec<f64>>,
    train_y: Vec<usize>,
    n_features: Option<usize>,
}

impl KNearestNeighbors {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        check_params(params, &["n_neighbors", "weights"], "KNearestNeighbors")?;
        let n_neighbors = param_usize(params, "n_neighbors", 5)?;
        if n_neighbors == 0 {
            return Err(MlError::invalid_input("n_neighbors must be at least 1"));
        }
        let weights = match param_str(params, "weights", "uniform")? {
            "uniform" => Weighting::Uniform,
            "distance" => Weighting::Distance,
            other => {
                return Err(MlError::invalid_input(format!(
                    "weights must be 'uniform' or 'distance', got '{other}'"
                )));
            }
        };
        Ok(Self {
            n_neighbors,
            weights,
            n_labels: 0,
            train_x: Vec::new(),
            train_y: Vec::new(),
            n_features: None,
        })
    }

    fn vote(&self, row: &[f64]) -> usize {
        let mut dist: Vec<(f64, usize)> = self
            .train_x
            .iter()
            .zip(&self.train_y)
            .map(|(t, &label)| {
                let d2: f64 = t.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d2.sqrt(), label)
            })
            .collect();
        // Stable sort keeps training order among equidistant points.
        dist.sort_by(|a, b| a.0.total_cmp(&b.0));
        let k = self.n_neighbors.min(dist.len());
        let nearest = &dist[..k];

        let mut scores = vec![0.0; self.n_labels];
        match self.weights {
            Weighting::Uniform => {
                for &(_, label) in nearest {
                    scores[label] += 1.0;
                }
            }
            Weighting::Distance => {
                // Exact matches take the whole vote.
                if nearest.iter().any(|(d, _)| *d == 0.0) {
                    for &(_, label) in nearest.iter().filter(|(d, _)| *d == 0.0) {
                        scores[label] += 1.0;
                    }
                } else {
                    for &(d, label) in nearest {
                        scores[label] += 1.0 / d;
                    }
                }
            }
        }
        argmax(&scores)
    }
}

impl Classifier for KNearestNeighbors {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError> {
        let (width, n_labels) = validate_training_set(x, y)?;
        self.train_x = x.to_vec();
        self.train_y = y.to_vec();
        self.n_labels = n_labels;
        self.n_features = Some(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        validate_predict_input(x, self.n_features)?;
        Ok(x.iter().map(|row| self.vote(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn knn(k: usize, weights: &str) -> KNearestNeighbors {
        let mut params = ParamSet::new();
        params.insert("n_neighbors".into(), json!(k));
        params.insert("weights".into(), json!(weights));
        KNearestNeighbors::from_params(&params).unwrap()
    }

    #[test]
    fn test_majority_vote() {
        let x = vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0]];
        let y = vec![1, 1, 0, 0];
        let mut model = knn(3, "uniform");
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&[vec![0.05]]).unwrap(), vec![1]);
    }

    #[test]
    fn test_distance_weighting_favours_close_points() {
        let x = vec![vec![0.0], vec![1.0], vec![1.1]];
        let y = vec![0, 1, 1];
        let mut uniform = knn(3, "uniform");
        uniform.fit(&x, &y).unwrap();
        assert_eq!(uniform.predict(&[vec![0.05]]).unwrap(), vec![1]);

        let mut weighted = knn(3, "distance");
        weighted.fit(&x, &y).unwrap();
        assert_eq!(weighted.predict(&[vec![0.05]]).unwrap(), vec![0]);
    }

    #[test]
    fn test_exact_match_wins_with_distance_weights() {
        let x = vec![vec![0.0], vec![0.01], vec![0.02]];
        let y = vec![2, 0, 0];
        let mut model = knn(3, "distance");
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&[vec![0.0]]).unwrap(), vec![2]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut model = knn(50, "uniform");
        model.fit(&[vec![0.0], vec![1.0], vec![2.0]], &[1, 1, 0]).unwrap();
        assert_eq!(model.predict(&[vec![2.0]]).unwrap(), vec![1]);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = ParamSet::new();
        params.insert("n_neighbors".into(), json!(0));
        assert!(KNearestNeighbors::from_params(&params).is_err());
        params.insert("n_neighbors".into(), json!(3));
        params.insert("weights".into(), json!("gaussian"));
        assert!(KNearestNeighbors::from_params(&params).is_err());
    }
}
