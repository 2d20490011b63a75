//! Persisted scoring artifact
//!
//! The forest is stored as JSON with a `<path>.sha256` sidecar holding the
//! hex SHA-256 digest of the file bytes. An artifact whose digest does not
//! match is treated as corrupt.

use super::forest::RegressionForest;
use crate::error::ScorerError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Path of the checksum sidecar for an artifact
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Load an artifact. `Ok(None)` means no artifact exists at `path`.
pub async fn load(path: &Path) -> Result<Option<RegressionForest>, ScorerError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ScorerError::Artifact(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let sidecar = checksum_path(path);
    let expected = fs::read_to_string(&sidecar).await.map_err(|e| {
        ScorerError::Artifact(format!("failed to read {}: {}", sidecar.display(), e))
    })?;

    let actual = digest(&bytes);
    if actual != expected.trim() {
        return Err(ScorerError::Artifact(format!(
            "checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected.trim(),
            actual
        )));
    }

    let forest: RegressionForest = serde_json::from_slice(&bytes).map_err(|e| {
        ScorerError::Artifact(format!("failed to decode {}: {}", path.display(), e))
    })?;

    forest.validate().map_err(|e| {
        ScorerError::Artifact(format!("malformed artifact {}: {}", path.display(), e))
    })?;

    Ok(Some(forest))
}

/// Persist an artifact and its checksum sidecar
pub async fn save(path: &Path, forest: &RegressionForest) -> Result<(), ScorerError> {
    let bytes = serde_json::to_vec(forest)
        .map_err(|e| ScorerError::Artifact(format!("failed to encode artifact: {}", e)))?;

    fs::write(path, &bytes).await.map_err(|e| {
        ScorerError::Artifact(format!("failed to write {}: {}", path.display(), e))
    })?;

    let sidecar = checksum_path(path);
    fs::write(&sidecar, digest(&bytes)).await.map_err(|e| {
        ScorerError::Artifact(format!("failed to write {}: {}", sidecar.display(), e))
    })?;

    Ok(())
}
