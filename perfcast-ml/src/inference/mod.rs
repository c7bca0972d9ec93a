//! Inference: replaying the fitted transform, loading artifacts, decoding
//! class indices and serving predictions.

pub mod artifacts;
pub mod decode;
pub mod replay;
pub mod serving;

pub use artifacts::{load_artifact, load_transform_metadata, save_artifact, save_transform_metadata};
pub use decode::{ClassPrediction, decode};
pub use replay::replay;
pub use serving::{Prediction, Predictor};
