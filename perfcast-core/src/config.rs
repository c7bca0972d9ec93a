//! Configuration system for perfcast.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> environment -> explicit overrides. Nothing here is
//! process-global; callers load a [`PerfcastConfig`] once and hand the
//! relevant section to each component.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfcastConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Where artifacts and the model registry live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for versioned model artifacts.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// SQLite database holding model cards.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            registry_path: default_registry_path(),
        }
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from(".perfcast/models")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(".perfcast/registry.db")
}

/// Training run defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of independent train/test iterations per run.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Fraction of rows held out for evaluation, in (0, 1).
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Base seed; iteration `i` splits with `seed + i`.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Folds used by the cross-validated grid search.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Class count used when a request does not specify one.
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
    /// Run iterations on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            cv_folds: default_cv_folds(),
            num_classes: default_num_classes(),
            parallel: true,
        }
    }
}

fn default_iterations() -> usize {
    5
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_cv_folds() -> usize {
    5
}

fn default_num_classes() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Raw data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Field delimiter of the per-period feature files.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Column identifying a subject in every feature file.
    #[serde(default = "default_person_id_column")]
    pub person_id_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            person_id_column: default_person_id_column(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_person_id_column() -> String {
    "person_id".to_string()
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `PERFCAST_`, sections split by `__`)
/// 3. Workspace-local config (`.perfcast/config.toml`)
/// 4. User config (`~/.config/perfcast/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&PerfcastConfig>,
) -> Result<PerfcastConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(PerfcastConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "perfcast", "perfcast") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".perfcast").join("config.toml");
        if ws_config.exists() {
            tracing::debug!(path = %ws_config.display(), "Loading workspace config");
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // PERFCAST_TRAINING__ITERATIONS, PERFCAST_STORAGE__MODEL_DIR, ...
    figment = figment.merge(Env::prefixed("PERFCAST_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = PerfcastConfig::default();
        assert_eq!(config.training.iterations, 5);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.data.delimiter, ',');
        assert_eq!(config.data.person_id_column, "person_id");
        assert_eq!(config.storage.model_dir, PathBuf::from(".perfcast/models"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PerfcastConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: PerfcastConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.training.iterations, config.training.iterations);
        assert_eq!(deserialized.storage.registry_path, config.storage.registry_path);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = PerfcastConfig::default();
        overrides.training.iterations = 11;
        overrides.storage.model_dir = PathBuf::from("/srv/models");

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.training.iterations, 11);
        assert_eq!(config.storage.model_dir, PathBuf::from("/srv/models"));
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".perfcast");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[training]
iterations = 9
test_fraction = 0.3

[data]
delimiter = ";"
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.training.iterations, 9);
        assert_eq!(config.training.test_fraction, 0.3);
        assert_eq!(config.data.delimiter, ';');
        // untouched sections keep their defaults
        assert_eq!(config.training.cv_folds, 5);
    }
}
