//! End-to-end training run: train, version, persist, register.

use crate::algorithms::{ModelProvider, ParamGrid};
use crate::data::table::FeatureTable;
use crate::error::{MlError, ResultExt};
use crate::inference::artifacts::{save_artifact, save_transform_metadata};
use crate::registry::{ModelCard, ModelRegistry};
use crate::targets::PerformanceTarget;
use crate::training::runner::{IterationResult, Trainer, TrainingOutcome};
use crate::training::versioning::{ArtifactSlot, ArtifactVersioner};
use perfcast_core::PerfcastConfig;
use perfcast_core::persistence::atomic_write_json;
use serde::Serialize;

/// What to train and how to label the result.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    pub target: PerformanceTarget,
    pub exam_id: i64,
    pub job_id: i64,
    /// Optional extra directory level between the model dir and the
    /// architecture directory.
    pub namespace: Option<String>,
    /// Falls back to the trainer's configured class count.
    pub num_classes: Option<usize>,
    /// Hyperparameter candidates; empty means no tuning.
    pub grid: ParamGrid,
}

impl TrainingRequest {
    pub fn new(target: PerformanceTarget, exam_id: i64, job_id: i64) -> Self {
        Self {
            target,
            exam_id,
            job_id,
            namespace: None,
            num_classes: None,
            grid: ParamGrid::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }
}

/// Result of a completed and registered run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_id: i64,
    pub card: ModelCard,
    pub slot: ArtifactSlot,
    pub iterations: Vec<IterationResult>,
}

pub struct TrainingPipeline<R: ModelRegistry> {
    trainer: Trainer,
    versioner: ArtifactVersioner,
    registry: R,
}

impl<R: ModelRegistry> TrainingPipeline<R> {
    pub fn new(config: &PerfcastConfig, registry: R) -> Self {
        Self::from_parts(
            Trainer::new(config.training.clone()),
            ArtifactVersioner::new(config.storage.model_dir.clone()),
            registry,
        )
    }

    pub fn from_parts(trainer: Trainer, versioner: ArtifactVersioner, registry: R) -> Self {
        Self {
            trainer,
            versioner,
            registry,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn into_registry(self) -> R {
        self.registry
    }

    /// Train, write the three version files and register the card.
    ///
    /// If anything fails after a version was allocated, the files written
    /// for it are removed; the version number is not handed out again.
    pub fn run<P>(
        &mut self,
        provider: &P,
        request: &TrainingRequest,
        table: &FeatureTable,
        target: &[f64],
    ) -> Result<TrainingReport, MlError>
    where
        P: ModelProvider,
        P::Model: Serialize,
    {
        let label = provider.label().to_string();
        let context = || format!("training {label} for {}", request.target);
        let num_classes = request
            .num_classes
            .unwrap_or(self.trainer.config().num_classes);

        let outcome = self
            .trainer
            .train(provider, table, target, num_classes, &request.grid)
            .context(context)?;

        let slot = self
            .versioner
            .allocate(request.namespace.as_deref(), &label)
            .context(context)?;

        let registered = self
            .persist(&slot, &outcome, request, &label)
            .and_then(|card| Ok((self.registry.add(card.clone())?, card)));
        let (model_id, card) = match registered {
            Ok(done) => done,
            Err(e) => {
                if let Err(cleanup) = slot.discard() {
                    tracing::warn!(version = slot.version, error = %cleanup, "Could not remove partial artifact files");
                }
                return Err(e.with_context(context()));
            }
        };

        tracing::info!(
            model_id,
            architecture = %label,
            target = %request.target,
            version = %card.version,
            accuracy = card.accuracy_results.mean,
            "Model trained and registered"
        );
        Ok(TrainingReport {
            model_id,
            card,
            slot,
            iterations: outcome.iterations,
        })
    }

    fn persist<M: Serialize>(
        &self,
        slot: &ArtifactSlot,
        outcome: &TrainingOutcome<M>,
        request: &TrainingRequest,
        architecture: &str,
    ) -> Result<ModelCard, MlError> {
        let artifact_sha256 = save_artifact(&slot.artifact_path(), &outcome.model)?;
        save_transform_metadata(&slot.transform_path(), &outcome.metadata)?;

        let summary = &outcome.summary;
        let card = ModelCard {
            name_object_predict: request.target.as_str().to_string(),
            address: slot.artifact_path(),
            feature_engineering_details_address: slot.transform_path(),
            architecture: architecture.to_string(),
            accuracy_results: summary.accuracy,
            f1_score_results: summary.f1_score,
            precision_results: summary.precision,
            recall_results: summary.recall,
            t_test_results_accuracy: summary.t_test_accuracy,
            t_test_results_f1_score: summary.t_test_f1_score,
            confidence_level_accuracy: summary.confidence_level_accuracy,
            confidence_level_f1_score: summary.confidence_level_f1_score,
            num_all_samples: outcome.num_samples,
            num_features: outcome.num_features,
            split_test: outcome.test_samples,
            test_fraction: outcome.test_fraction,
            n_splits_t_test: outcome.iterations.len(),
            number_of_labels: outcome.num_classes,
            model_evaluation_date: chrono::Utc::now(),
            version: slot.version_tag(),
            exam_id: request.exam_id,
            job_id: request.job_id,
            artifact_sha256,
            hyperparameters: summary.selected_params.clone(),
        };
        atomic_write_json(&slot.card_path(), &card)?;
        Ok(card)
    }
}
