//! Versioned artifact directories.
//!
//! Layout: `base_dir[/namespace]/architecture/` holding, per version `N`,
//! `model_vN.bin`, `model_card_vN.json` and `feature_engineering_vN.json`.
//!
//! Allocation reserves the artifact filename with an exclusive create, so
//! back-to-back allocations never hand out the same version even before
//! anything is written. A `.latest_version` file records the highest version
//! ever allocated; deleting the newest files does not make its number
//! available again.
//!
//! Only one writer per directory is supported. Two processes allocating in
//! the same directory at the same instant may both scan the same maximum;
//! the exclusive create then pushes the loser to the next free number, but
//! the high-water mark is last-writer-wins.

use crate::error::MlError;
use perfcast_core::persistence::atomic_write;
use regex::Regex;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const HIGH_WATER_MARK: &str = ".latest_version";

/// File names and location reserved for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSlot {
    pub directory: PathBuf,
    pub artifact_file: String,
    pub card_file: String,
    pub transform_file: String,
    pub version: u32,
}

impl ArtifactSlot {
    fn new(directory: PathBuf, version: u32) -> Self {
        Self {
            directory,
            artifact_file: artifact_file_name(version),
            card_file: format!("model_card_v{version}.json"),
            transform_file: format!("feature_engineering_v{version}.json"),
            version,
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.directory.join(&self.artifact_file)
    }

    pub fn card_path(&self) -> PathBuf {
        self.directory.join(&self.card_file)
    }

    pub fn transform_path(&self) -> PathBuf {
        self.directory.join(&self.transform_file)
    }

    /// `"v{N}"`, as recorded on model cards.
    pub fn version_tag(&self) -> String {
        format!("v{}", self.version)
    }

    /// Remove whatever files of this slot exist. Used when a run fails after
    /// allocation; the version number itself stays consumed.
    pub fn discard(&self) -> Result<(), MlError> {
        for path in [self.artifact_path(), self.card_path(), self.transform_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn artifact_file_name(version: u32) -> String {
    format!("model_v{version}.bin")
}

/// Hands out monotonically increasing versions per directory.
#[derive(Debug, Clone)]
pub struct ArtifactVersioner {
    base_dir: PathBuf,
}

impl ArtifactVersioner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `base_dir[/namespace]/architecture`.
    pub fn directory(&self, namespace: Option<&str>, architecture: &str) -> Result<PathBuf, MlError> {
        let mut dir = self.base_dir.clone();
        if let Some(ns) = namespace {
            validate_component(ns, "namespace")?;
            dir.push(ns);
        }
        validate_component(architecture, "architecture")?;
        dir.push(architecture);
        Ok(dir)
    }

    /// Highest version allocated so far in the directory, 0 when none.
    pub fn latest_version(&self, namespace: Option<&str>, architecture: &str) -> Result<u32, MlError> {
        let dir = self.directory(namespace, architecture)?;
        Ok(scan_versions(&dir)?.max(read_high_water_mark(&dir)?))
    }

    /// Create the directory if needed and reserve the next version.
    pub fn allocate(&self, namespace: Option<&str>, architecture: &str) -> Result<ArtifactSlot, MlError> {
        let dir = self.directory(namespace, architecture)?;
        std::fs::create_dir_all(&dir)?;

        let latest = scan_versions(&dir)?.max(read_high_water_mark(&dir)?);
        let mut version = next_version(&dir, latest)?;
        loop {
            let path = dir.join(artifact_file_name(version));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(version, "Version taken, trying next");
                    version = next_version(&dir, version)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        atomic_write(&dir.join(HIGH_WATER_MARK), version.to_string().as_bytes())?;

        tracing::info!(directory = %dir.display(), version, "Allocated artifact version");
        Ok(ArtifactSlot::new(dir, version))
    }
}

fn next_version(dir: &Path, current: u32) -> Result<u32, MlError> {
    current
        .checked_add(1)
        .ok_or_else(|| MlError::corrupt(dir, format!("version counter exhausted at {current}")))
}

fn validate_component(value: &str, what: &str) -> Result<(), MlError> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\']);
    if bad {
        return Err(MlError::invalid_input(format!(
            "{what} '{value}' is not a valid directory name"
        )));
    }
    Ok(())
}

fn scan_versions(dir: &Path) -> Result<u32, MlError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let pattern = Regex::new(r"^model_v(\d+)\.bin$")
        .map_err(|e| MlError::Config(format!("artifact name pattern: {e}")))?;

    let mut max = 0;
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(v) = pattern
            .captures(name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            max = max.max(v);
        }
    }
    Ok(max)
}

fn read_high_water_mark(dir: &Path) -> Result<u32, MlError> {
    let path = dir.join(HIGH_WATER_MARK);
    match std::fs::read_to_string(&path) {
        Ok(content) => content
            .trim()
            .parse()
            .map_err(|e| MlError::corrupt(&path, format!("invalid version marker: {e}"))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
