//! Model card: the evaluation record written once per training run.

use crate::algorithms::ParamSet;
use crate::error::MlError;
use crate::training::metrics::MetricSummary;
use crate::training::stats::TTestResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Field-name to new-value patch applied by `ModelRegistry::update`.
pub type CardPatch = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    /// Performance target the model predicts.
    pub name_object_predict: String,
    /// Serialized classifier.
    pub address: PathBuf,
    /// Transform metadata the classifier was fitted behind.
    pub feature_engineering_details_address: PathBuf,
    pub architecture: String,
    pub accuracy_results: MetricSummary,
    pub f1_score_results: MetricSummary,
    pub precision_results: MetricSummary,
    pub recall_results: MetricSummary,
    pub t_test_results_accuracy: TTestResult,
    pub t_test_results_f1_score: TTestResult,
    pub confidence_level_accuracy: f64,
    pub confidence_level_f1_score: f64,
    pub num_all_samples: usize,
    /// Raw input columns, before encoding.
    pub num_features: usize,
    /// Rows in the final test partition.
    pub split_test: usize,
    pub test_fraction: f64,
    pub n_splits_t_test: usize,
    pub number_of_labels: usize,
    pub model_evaluation_date: DateTime<Utc>,
    pub version: String,
    pub exam_id: i64,
    pub job_id: i64,
    pub artifact_sha256: String,
    #[serde(default)]
    pub hyperparameters: ParamSet,
}

impl ModelCard {
    /// Return a copy with `patch` applied. Unknown fields and values of the
    /// wrong shape are input errors; the card itself is untouched.
    pub fn patched(&self, patch: &CardPatch) -> Result<ModelCard, MlError> {
        let Value::Object(mut fields) = serde_json::to_value(self)? else {
            return Err(MlError::model("model card did not serialize to an object"));
        };
        for (key, value) in patch {
            if !fields.contains_key(key) {
                return Err(MlError::invalid_input(format!("model card has no field '{key}'")));
            }
            fields.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| MlError::invalid_input(format!("invalid model card update: {e}")))
    }
}

/// A card as held by a registry, with its assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: i64,
    #[serde(flatten)]
    pub card: ModelCard,
}

#[cfg(test)]
pub(crate) fn sample_card(exam_id: i64, job_id: i64) -> ModelCard {
    let summary = MetricSummary { mean: 0.8, std: 0.05 };
    ModelCard {
        name_object_predict: "satisfaction_score".into(),
        address: PathBuf::from("models/DecisionTree/model_v1.bin"),
        feature_engineering_details_address: PathBuf::from(
            "models/DecisionTree/feature_engineering_v1.json",
        ),
        architecture: "DecisionTree".into(),
        accuracy_results: summary,
        f1_score_results: summary,
        precision_results: summary,
        recall_results: summary,
        t_test_results_accuracy: TTestResult {
            t_stat: Some(1.5),
            p_value: 0.2,
        },
        t_test_results_f1_score: TTestResult {
            t_stat: None,
            p_value: 0.0,
        },
        confidence_level_accuracy: 80.0,
        confidence_level_f1_score: 100.0,
        num_all_samples: 100,
        num_features: 4,
        split_test: 20,
        test_fraction: 0.2,
        n_splits_t_test: 5,
        number_of_labels: 5,
        model_evaluation_date: DateTime::parse_from_rfc3339("2026-01-15T10:00:00Z")
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default(),
        version: "v1".into(),
        exam_id,
        job_id,
        artifact_sha256: "ab".repeat(32),
        hyperparameters: ParamSet::new(),
    }
}
