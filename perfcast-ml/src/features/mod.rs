//! Feature engineering: class discretization, the fitted transform and the
//! dataset enhancer that produces train/test splits.

pub mod discretize;
pub mod enhance;
mod ordered;
pub mod transforms;

pub use discretize::discretize;
pub use enhance::{EnhancedDataset, enhance, split_indices};
pub use transforms::{NormalizationBounds, TransformMetadata};
