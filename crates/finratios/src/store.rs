//! JSON snapshot files.
//!
//! Every stage reads and writes whole JSON documents. Output is pretty
//! printed with a four space indent; all maps written by the pipeline are
//! ordered, so identical inputs give byte-identical files.

use crate::{PipelineError, Result, types::Ticker};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Read and parse a JSON document.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] when the file cannot be read and
/// [`PipelineError::Json`] when it does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::json(path, e))
}

/// Like [`read_json`], but a file that does not exist reads as `None`.
///
/// # Errors
///
/// Any failure other than the file being absent.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PipelineError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PipelineError::json(path, e))
}

/// Serialize `value` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] when the directory or file cannot be
/// written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(|e| PipelineError::json(path, e))?;

    fs::write(path, &buf).map_err(|e| PipelineError::io(path, e))?;
    debug!(path = %path.display(), bytes = buf.len(), "wrote json");
    Ok(())
}

/// The `.json` files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`PipelineError::NotADirectory`] when `dir` is not a directory
/// and [`PipelineError::Io`] when it cannot be listed.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The ticker a per-ticker file belongs to, taken from its file stem.
#[must_use]
pub fn ticker_from_path(path: &Path) -> Option<Ticker> {
    path.file_stem()?.to_str().map(Ticker::from)
}
