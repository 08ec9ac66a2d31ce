#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! File helpers shared by every APD artifact writer.
//!
//! All outputs (extractions, enriched offers, catalogs, reports) are whole
//! files. Writes go to a sibling `.tmp` file first and are then renamed over
//! the destination, so an interrupted run never leaves a truncated artifact
//! behind.

use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors that can occur while reading or writing artifact files.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// An I/O operation on `path` failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file the operation was performed on.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// `path` could not be (de)serialized as JSON.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// The file being read or written.
        path: String,
        /// The underlying error.
        source: serde_json::Error,
    },
}

impl FileError {
    /// Returns `true` if the error means the file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), FileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| FileError::io(parent, e))?;
    }
    Ok(())
}

/// Returns the temporary sibling used while `path` is being written.
#[must_use]
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to `path` atomically.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the temporary file cannot be written or
/// renamed into place.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), FileError> {
    ensure_parent_dir(path)?;
    let tmp = tmp_path(path);

    std::fs::write(&tmp, bytes).map_err(|e| FileError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| FileError::io(path, e))?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Serializes `value` as pretty-printed UTF-8 JSON and writes it to `path`
/// atomically. Non-ASCII text is written as-is, never escaped.
///
/// # Errors
///
/// Returns [`FileError`] if serialization or any file operation fails.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FileError> {
    ensure_parent_dir(path)?;
    let tmp = tmp_path(path);

    let file = std::fs::File::create(&tmp).map_err(|e| FileError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| FileError::json(path, e))?;
    writer.flush().map_err(|e| FileError::io(&tmp, e))?;
    drop(writer);

    std::fs::rename(&tmp, path).map_err(|e| FileError::io(path, e))?;

    log::debug!("Wrote JSON to {}", path.display());
    Ok(())
}

/// Reads and deserializes a JSON file.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the file cannot be read (use
/// [`FileError::is_not_found`] to detect a missing file) or
/// [`FileError::Json`] if its content does not match `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let text = std::fs::read_to_string(path).map_err(|e| FileError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| FileError::json(path, e))
}
