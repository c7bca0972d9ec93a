//! Classifier family behind a uniform fit/predict capability.
//!
//! The Trainer only sees [`ModelProvider`] and [`Classifier`]. The concrete
//! algorithms form a closed set: [`Architecture`] names them and
//! [`ClassifierModel`] holds a fitted (or fresh) instance of any of them.

pub mod bayes;
pub mod evaluation;
pub mod linear;
pub mod neighbors;
pub mod tree;

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use bayes::GaussianNb;
pub use linear::SoftmaxRegression;
pub use neighbors::KNearestNeighbors;
pub use tree::DecisionTree;

/// One concrete hyperparameter assignment, keyed by parameter name.
pub type ParamSet = BTreeMap<String, Value>;

/// Candidate values per hyperparameter.
pub type ParamGrid = BTreeMap<String, Vec<Value>>;

/// Uniform fit/predict capability.
pub trait Classifier {
    /// Fit on rows of `x` with class labels `y`.
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError>;

    /// Predict one class label per row of `x`.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError>;
}

/// Builds fresh classifiers from hyperparameters.
pub trait ModelProvider: Sync {
    type Model: Classifier + Send;

    /// Architecture label recorded on the model card and used as the
    /// artifact directory name.
    fn label(&self) -> &str;

    /// Instantiate an unfitted model. Unknown or ill-typed parameters are
    /// input errors.
    fn instantiate(&self, params: &ParamSet) -> Result<Self::Model, MlError>;
}

/// The available classifier architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    DecisionTree,
    KNearestNeighbors,
    GaussianNb,
    LogisticRegression,
}

impl Architecture {
    pub const ALL: [Architecture; 4] = [
        Self::DecisionTree,
        Self::KNearestNeighbors,
        Self::GaussianNb,
        Self::LogisticRegression,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::DecisionTree => "DecisionTree",
            Self::KNearestNeighbors => "KNearestNeighbors",
            Self::GaussianNb => "GaussianNB",
            Self::LogisticRegression => "LogisticRegression",
        }
    }

    /// Search space used when a training request does not bring its own.
    pub fn default_grid(&self) -> ParamGrid {
        let mut grid = ParamGrid::new();
        match self {
            Self::DecisionTree => {
                grid.insert("max_depth".into(), vec![Value::Null, json!(3), json!(5), json!(10)]);
                grid.insert("criterion".into(), vec![json!("gini"), json!("entropy")]);
                grid.insert("min_samples_split".into(), vec![json!(2), json!(5)]);
                grid.insert("min_samples_leaf".into(), vec![json!(1), json!(2)]);
            }
            Self::KNearestNeighbors => {
                grid.insert("n_neighbors".into(), vec![json!(3), json!(5), json!(7)]);
                grid.insert("weights".into(), vec![json!("uniform"), json!("distance")]);
            }
            Self::GaussianNb => {
                grid.insert("var_smoothing".into(), vec![json!(1e-9), json!(1e-6), json!(1e-3)]);
            }
            Self::LogisticRegression => {
                grid.insert("learning_rate".into(), vec![json!(0.1), json!(0.5)]);
                grid.insert("l2".into(), vec![json!(0.0), json!(0.01)]);
            }
        }
        grid
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for Architecture {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "decisiontree" | "tree" => Ok(Self::DecisionTree),
            "knearestneighbors" | "knn" => Ok(Self::KNearestNeighbors),
            "gaussiannb" | "naivebayes" => Ok(Self::GaussianNb),
            "logisticregression" | "softmax" => Ok(Self::LogisticRegression),
            _ => Err(MlError::invalid_input(format!("unknown architecture '{s}'"))),
        }
    }
}

impl ModelProvider for Architecture {
    type Model = ClassifierModel;

    fn label(&self) -> &str {
        self.as_label()
    }

    fn instantiate(&self, params: &ParamSet) -> Result<ClassifierModel, MlError> {
        Ok(match self {
            Self::DecisionTree => ClassifierModel::DecisionTree(DecisionTree::from_params(params)?),
            Self::KNearestNeighbors => {
                ClassifierModel::KNearestNeighbors(KNearestNeighbors::from_params(params)?)
            }
            Self::GaussianNb => ClassifierModel::GaussianNb(GaussianNb::from_params(params)?),
            Self::LogisticRegression => {
                ClassifierModel::LogisticRegression(SoftmaxRegression::from_params(params)?)
            }
        })
    }
}

/// A classifier of any supported architecture. This is the artifact format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifierModel {
    DecisionTree(DecisionTree),
    KNearestNeighbors(KNearestNeighbors),
    GaussianNb(GaussianNb),
    LogisticRegression(SoftmaxRegression),
}

impl ClassifierModel {
    pub fn architecture(&self) -> Architecture {
        match self {
            Self::DecisionTree(_) => Architecture::DecisionTree,
            Self::KNearestNeighbors(_) => Architecture::KNearestNeighbors,
            Self::GaussianNb(_) => Architecture::GaussianNb,
            Self::LogisticRegression(_) => Architecture::LogisticRegression,
        }
    }
}

impl Classifier for ClassifierModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError> {
        match self {
            Self::DecisionTree(m) => m.fit(x, y),
            Self::KNearestNeighbors(m) => m.fit(x, y),
            Self::GaussianNb(m) => m.fit(x, y),
            Self::LogisticRegression(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        match self {
            Self::DecisionTree(m) => m.predict(x),
            Self::KNearestNeighbors(m) => m.predict(x),
            Self::GaussianNb(m) => m.predict(x),
            Self::LogisticRegression(m) => m.predict(x),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Reject parameters a model does not understand.
pub(crate) fn check_params(params: &ParamSet, allowed: &[&str], model: &str) -> Result<(), MlError> {
    match params.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(MlError::invalid_input(format!(
            "{model} does not accept hyperparameter '{key}'"
        ))),
        None => Ok(()),
    }
}

fn bad_param(key: &str, value: &Value, expected: &str) -> MlError {
    MlError::invalid_input(format!("hyperparameter '{key}' = {value} is not {expected}"))
}

/// Absent → `default`; otherwise a non-negative integer.
pub(crate) fn param_usize(params: &ParamSet, key: &str, default: usize) -> Result<usize, MlError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| bad_param(key, v, "a non-negative integer")),
    }
}

/// Absent → `default`, null → `None`, otherwise a non-negative integer.
pub(crate) fn param_opt_usize(
    params: &ParamSet,
    key: &str,
    default: Option<usize>,
) -> Result<Option<usize>, MlError> {
    match params.get(key) {
        None => Ok(default),
        Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| bad_param(key, v, "a non-negative integer or null")),
    }
}

pub(crate) fn param_f64(params: &ParamSet, key: &str, default: f64) -> Result<f64, MlError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| bad_param(key, v, "a number")),
    }
}

pub(crate) fn param_str<'a>(
    params: &'a ParamSet,
    key: &str,
    default: &'a str,
) -> Result<&'a str, MlError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_str().ok_or_else(|| bad_param(key, v, "a string")),
    }
}

/// Validate a training set and return `(n_features, n_labels)`, where
/// labels are assumed to be `0..n_labels`.
pub(crate) fn validate_training_set(x: &[Vec<f64>], y: &[usize]) -> Result<(usize, usize), MlError> {
    if x.is_empty() {
        return Err(MlError::training("cannot fit on zero rows"));
    }
    if x.len() != y.len() {
        return Err(MlError::training(format!(
            "{} feature rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if x.iter().any(|row| row.len() != width) {
        return Err(MlError::training("feature rows have differing widths"));
    }
    let n_labels = y.iter().copied().max().unwrap_or(0) + 1;
    Ok((width, n_labels))
}

/// Check prediction input against the fitted width.
pub(crate) fn validate_predict_input(x: &[Vec<f64>], width: Option<usize>) -> Result<usize, MlError> {
    let width = width.ok_or_else(|| MlError::model("model has not been fitted"))?;
    if let Some(row) = x.iter().find(|row| row.len() != width) {
        return Err(MlError::model(format!(
            "expected {width} features per row, got {}",
            row.len()
        )));
    }
    Ok(width)
}

/// Index of the largest score; ties go to the smallest index.
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            x.push(vec![0.1 + jitter, 0.2 - jitter]);
            y.push(0);
            x.push(vec![0.9 - jitter, 0.8 + jitter]);
            y.push(2);
        }
        (x, y)
    }

    #[test]
    fn test_every_architecture_separates_blobs() {
        let (x, y) = blobs();
        for arch in Architecture::ALL {
            let mut model = arch.instantiate(&ParamSet::new()).unwrap();
            model.fit(&x, &y).unwrap();
            let pred = model.predict(&[vec![0.12, 0.18], vec![0.88, 0.83]]).unwrap();
            assert_eq!(pred, vec![0, 2], "{arch} misclassified");
            assert_eq!(model.architecture(), arch);
        }
    }

    #[test]
    fn test_default_grids_instantiate() {
        for arch in Architecture::ALL {
            let grid = arch.default_grid();
            assert!(!grid.is_empty());
            let first: ParamSet = grid
                .iter()
                .map(|(k, v)| (k.clone(), v[0].clone()))
                .collect();
            arch.instantiate(&first).unwrap();
        }
    }

    #[test]
    fn test_unknown_param_rejected() {
        let mut params = ParamSet::new();
        params.insert("gamma".into(), json!("auto"));
        let err = Architecture::DecisionTree.instantiate(&params).unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
    }

    #[test]
    fn test_architecture_parsing() {
        assert_eq!("decision-tree".parse::<Architecture>().unwrap(), Architecture::DecisionTree);
        assert_eq!("GaussianNB".parse::<Architecture>().unwrap(), Architecture::GaussianNb);
        assert_eq!("knn".parse::<Architecture>().unwrap(), Architecture::KNearestNeighbors);
        assert!("svm".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = Architecture::KNearestNeighbors
            .instantiate(&ParamSet::new())
            .unwrap();
        assert!(matches!(model.predict(&[vec![1.0]]), Err(MlError::Model(_))));
    }

    #[test]
    fn test_artifact_roundtrip_through_bincode() {
        let (x, y) = blobs();
        let mut model = Architecture::DecisionTree.instantiate(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        let bytes = bincode::serialize(&model).unwrap();
        let back: ClassifierModel = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
