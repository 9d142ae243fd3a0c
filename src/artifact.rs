//! Whole-file artifact persistence
//!
//! Artifacts are rewritten in full on every phase. Writes go through a
//! temporary file in the destination directory that is persisted over the
//! target only once it has been completely written and flushed, so a failed
//! write leaves the previous good file in place.

use crate::error::{ArtifactError, ArtifactKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
    kind: ArtifactKind,
) -> Result<T, ArtifactError> {
    let path = path.as_ref();
    let bytes = read_bytes(path, kind)?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read a file, mapping a missing file to `PreconditionNotMet`.
pub fn read_bytes(path: &Path, kind: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArtifactError::PreconditionNotMet {
            kind,
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Io(e),
    })
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized, P: AsRef<Path>>(
    path: P,
    value: &T,
    kind: ArtifactKind,
) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    let json = to_json_bytes(path, value, kind)?;
    write_bytes_atomic(path, &json, kind)
}

/// Pretty JSON bytes for an artifact bound for `path`.
pub fn to_json_bytes<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    kind: ArtifactKind,
) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(value).map_err(|e| ArtifactError::Malformed {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// One file of a multi-file write
#[derive(Debug)]
pub struct PendingWrite<'a> {
    pub path: &'a Path,
    pub bytes: Vec<u8>,
    pub kind: ArtifactKind,
}

/// Replace several files, staging all of them before any is persisted.
///
/// A failure while staging leaves every target untouched. Persisting is one
/// rename per file, so only a failed rename can leave the set mixed.
pub fn write_all_atomic(writes: &[PendingWrite<'_>]) -> Result<(), ArtifactError> {
    let mut staged = Vec::with_capacity(writes.len());
    for write in writes {
        staged.push(stage(write.path, &write.bytes, write.kind)?);
    }
    for (tmp, write) in staged.into_iter().zip(writes) {
        persist(tmp, write.path, write.bytes.len(), write.kind)?;
    }
    Ok(())
}

/// Atomically replace `path` with `text`.
pub fn write_text_atomic<P: AsRef<Path>>(
    path: P,
    text: &str,
    kind: ArtifactKind,
) -> Result<(), ArtifactError> {
    write_bytes_atomic(path.as_ref(), text.as_bytes(), kind)
}

fn write_bytes_atomic(path: &Path, bytes: &[u8], kind: ArtifactKind) -> Result<(), ArtifactError> {
    let tmp = stage(path, bytes, kind)?;
    persist(tmp, path, bytes.len(), kind)
}

fn write_error(path: &Path, kind: ArtifactKind, source: std::io::Error) -> ArtifactError {
    ArtifactError::Write {
        kind,
        path: path.to_path_buf(),
        source,
    }
}

// Fully written and synced temporary next to the target
fn stage(path: &Path, bytes: &[u8], kind: ArtifactKind) -> Result<NamedTempFile, ArtifactError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| write_error(path, kind, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_error(path, kind, e))?;
    tmp.write_all(bytes).map_err(|e| write_error(path, kind, e))?;
    tmp.as_file().sync_all().map_err(|e| write_error(path, kind, e))?;
    Ok(tmp)
}

fn persist(tmp: NamedTempFile, path: &Path, len: usize, kind: ArtifactKind) -> Result<(), ArtifactError> {
    // On failure the returned temporary is dropped, which removes it
    tmp.persist(path).map_err(|e| write_error(path, kind, e.error))?;
    tracing::debug!(path = %path.display(), bytes = len, "wrote {}", kind);
    Ok(())
}
