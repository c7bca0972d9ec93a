//! # perfcast-core
//!
//! Shared building blocks for the perfcast workspace: layered configuration
//! and crash-safe file persistence.

pub mod config;
pub mod persistence;

pub use config::{DataConfig, PerfcastConfig, StorageConfig, TrainingConfig, load_config};
