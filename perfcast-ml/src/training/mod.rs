//! Training infrastructure: repeated-split runner, grid search, metrics,
//! significance tests, artifact versioning and the end-to-end pipeline.

pub mod metrics;
pub mod pipeline;
pub mod runner;
pub mod stats;
pub mod sweep;
pub mod versioning;

pub use metrics::{ClassificationMetrics, MetricSummary};
pub use pipeline::{TrainingPipeline, TrainingReport, TrainingRequest};
pub use runner::{IterationResult, Trainer, TrainingOutcome, TrainingSummary};
pub use stats::{TTestResult, confidence_level, paired_t_test};
pub use sweep::{GridSearchResult, expand_grid, grid_search};
pub use versioning::{ArtifactSlot, ArtifactVersioner};
