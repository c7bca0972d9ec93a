//! Error types for the perfcast-ml crate.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for ML operations.
///
/// Variants fall into four groups: input errors (`InvalidInput`,
/// `MissingFeature`, `TargetMismatch`, `Dataset`), lookup errors
/// (`NotFound`), integrity errors (`Corrupt`), and wrapped infrastructure
/// failures. Orchestration layers add context with [`ResultExt::context`];
/// use [`MlError::root`] to classify a wrapped error.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("The input data is missing the required feature: {0}")]
    MissingFeature(String),

    #[error("Target '{requested}' is not learned by this model (trained for '{trained}')")]
    TargetMismatch { requested: String, trained: String },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt data at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Artifact encoding error: {0}")]
    Artifact(#[from] bincode::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<MlError>,
    },
}

impl MlError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap this error with a description of the operation that failed.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any number of context layers.
    pub fn root(&self) -> &MlError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.root(), Self::Corrupt { .. })
    }

    /// Errors caused by the caller's request rather than the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidInput(_)
                | Self::MissingFeature(_)
                | Self::TargetMismatch { .. }
                | Self::Dataset(_)
        )
    }
}

/// Attach context to the error side of a `Result`.
pub trait ResultExt<T> {
    fn context<C, F>(self, f: F) -> Result<T, MlError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: Into<MlError>> ResultExt<T> for Result<T, E> {
    fn context<C, F>(self, f: F) -> Result<T, MlError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
