//! Reading and writing the per-version files: the bincode classifier
//! artifact and the JSON transform metadata.

use crate::error::MlError;
use crate::features::transforms::TransformMetadata;
use perfcast_core::persistence::{atomic_write, atomic_write_json};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_bytes(path: &Path, what: &str) -> Result<Vec<u8>, MlError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            MlError::not_found(format!("{what} at {}", path.display()))
        } else {
            MlError::Io(e)
        }
    })
}

/// Serialize `model` to `path` and return the digest of the written bytes.
pub fn save_artifact<M: Serialize>(path: &Path, model: &M) -> Result<String, MlError> {
    let bytes = bincode::serialize(model)?;
    atomic_write(path, &bytes)?;
    let digest = sha256_hex(&bytes);
    tracing::debug!(path = %path.display(), bytes = bytes.len(), sha256 = %digest, "Wrote model artifact");
    Ok(digest)
}

/// Load an artifact, checking its digest first when one is given.
pub fn load_artifact<M: DeserializeOwned>(path: &Path, expected_sha256: Option<&str>) -> Result<M, MlError> {
    let bytes = read_bytes(path, "model artifact")?;
    if let Some(expected) = expected_sha256 {
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(MlError::corrupt(
                path,
                format!("digest mismatch: expected {expected}, found {actual}"),
            ));
        }
    }
    bincode::deserialize(&bytes).map_err(|e| MlError::corrupt(path, e))
}

pub fn save_transform_metadata(path: &Path, metadata: &TransformMetadata) -> Result<(), MlError> {
    atomic_write_json(path, metadata)?;
    Ok(())
}

/// Load transform metadata.
///
/// A missing file is `NotFound`, unparsable JSON or a `feature_order` that
/// disagrees with the mappings is `Corrupt`, anything else is `Io`.
pub fn load_transform_metadata(path: &Path) -> Result<TransformMetadata, MlError> {
    let bytes = read_bytes(path, "transform metadata")?;
    let metadata: TransformMetadata =
        serde_json::from_slice(&bytes).map_err(|e| MlError::corrupt(path, e))?;
    if !metadata.is_consistent() {
        return Err(MlError::corrupt(
            path,
            "feature_order does not match normalization_params and one_hot_mappings",
        ));
    }
    Ok(metadata)
}
