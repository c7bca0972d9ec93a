//! Serving predictions from registered models.

use crate::algorithms::{Classifier, ClassifierModel};
use crate::data::source::{DatasetAssembler, FilesByPeriod};
use crate::data::table::Record;
use crate::error::{MlError, ResultExt};
use crate::inference::artifacts::{load_artifact, load_transform_metadata};
use crate::inference::decode::decode;
use crate::inference::replay::replay;
use crate::registry::ModelRegistry;
use crate::targets::PerformanceTarget;
use serde::{Deserialize, Serialize};

/// A decoded prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub model_id: i64,
    pub target: PerformanceTarget,
    pub version: String,
    pub class_index: usize,
    /// Score range of the class, e.g. `"40 to 60"`.
    pub range: String,
}

/// Answers prediction requests against the models in a registry.
pub struct Predictor<R: ModelRegistry> {
    registry: R,
    assembler: DatasetAssembler,
}

impl<R: ModelRegistry> Predictor<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            assembler: DatasetAssembler::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: DatasetAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Predict `target` for one raw record with model `model_id`.
    pub fn predict(
        &self,
        model_id: i64,
        target: PerformanceTarget,
        record: &Record,
    ) -> Result<Prediction, MlError> {
        if record.is_empty() {
            return Err(MlError::invalid_input("the input record contains no columns"));
        }

        let stored = self
            .registry
            .get(model_id)
            .context(|| format!("looking up model {model_id}"))?;
        let card = &stored.card;
        if card.name_object_predict != target.as_str() {
            return Err(MlError::TargetMismatch {
                requested: target.to_string(),
                trained: card.name_object_predict.clone(),
            }
            .with_context(format!("predicting with model {model_id}")));
        }

        let metadata = load_transform_metadata(&card.feature_engineering_details_address)
            .context(|| format!("loading transform metadata for model {model_id}"))?;
        let predicting = || format!("predicting with model {model_id}");
        let vector = replay(record, &metadata).context(predicting)?;

        let model: ClassifierModel = load_artifact(&card.address, Some(&card.artifact_sha256))
            .context(|| format!("loading artifact for model {model_id}"))?;
        if model.architecture().as_label() != card.architecture {
            tracing::warn!(
                model_id,
                card = %card.architecture,
                artifact = %model.architecture(),
                "Artifact architecture differs from model card"
            );
        }

        let classes = model.predict(&[vector]).context(predicting)?;
        let range = decode(card.number_of_labels, &classes).context(predicting)?;
        let class_index = classes.first().copied().unwrap_or_default();

        tracing::info!(model_id, target = %target, class = class_index, range = %range, "Prediction served");
        Ok(Prediction {
            model_id,
            target,
            version: card.version.clone(),
            class_index,
            range,
        })
    }

    /// Predict for a person using their most recent feature row.
    pub fn predict_person(
        &self,
        model_id: i64,
        target: PerformanceTarget,
        person_id: i64,
        files_by_period: &FilesByPeriod,
    ) -> Result<Prediction, MlError> {
        let mut record = self
            .assembler
            .find_latest_record(person_id, files_by_period)?
            .ok_or_else(|| MlError::not_found(format!("feature row for person {person_id}")))?;
        record.remove(&self.assembler.person_id_column);
        self.predict(model_id, target, &record)
    }
}
