//! # perfcast-ml: performance classifiers, from raw tables to served ranges
//!
//! A training run turns a feature table and a continuous 0–100 score into a
//! versioned classifier plus everything needed to reuse it:
//!
//! 1. **Features**: discretize the score, split once per seed, fit a
//!    min-max / one-hot transform on the training rows only.
//! 2. **Training**: repeat over seeds with a cross-validated grid search,
//!    aggregate metrics, pick the most reliable hyperparameters, refit.
//! 3. **Persistence**: allocate the next version, write the artifact,
//!    transform metadata and model card, register the card.
//! 4. **Inference**: replay the stored transform on a raw record, predict
//!    and decode the class back into a score range.

// Foundation
pub mod error;
pub mod targets;

// Data & features
pub mod data;
pub mod features;

// Models & training
pub mod algorithms;
pub mod training;

// Storage & serving
pub mod inference;
pub mod registry;

// Re-exports
pub use algorithms::{Architecture, Classifier, ClassifierModel, ModelProvider, ParamGrid, ParamSet};
pub use data::{DatasetAssembler, FeatureTable, FilesByPeriod, PerformanceRecord, Record};
pub use error::{MlError, ResultExt};
pub use features::{TransformMetadata, discretize, enhance};
pub use inference::{Prediction, Predictor, decode, replay};
pub use registry::{
    CardPatch, InMemoryModelRegistry, ModelCard, ModelRegistry, SqliteModelRegistry, StoredCard,
};
pub use targets::PerformanceTarget;
pub use training::{ArtifactVersioner, Trainer, TrainingPipeline, TrainingReport, TrainingRequest};
