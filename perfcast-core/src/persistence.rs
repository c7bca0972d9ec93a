//! Shared persistence utilities: atomic file writes, JSON load/save.
//!
//! Every artifact, card and transform file goes through these helpers so a
//! crash mid-write never leaves a truncated file behind a valid name.

use std::io;
use std::path::Path;

/// Atomically write JSON data to a file.
///
/// Serializes `data` to pretty-printed JSON, writes to a `.tmp` sibling file,
/// then renames onto the target path. Creates parent directories if needed.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write raw bytes to a file.
///
/// The temporary sibling keeps the full file name (`model_v1.bin.tmp`), so
/// artifacts sharing a stem with their JSON companions never collide.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);
    std::fs::write(tmp, data)?;
    std::fs::rename(tmp, path)?;
    tracing::trace!(path = %path.display(), bytes = data.len(), "atomic write");
    Ok(())
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Malformed content surfaces as `io::ErrorKind::InvalidData`.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}
