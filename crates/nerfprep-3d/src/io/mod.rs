use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

/// COLMAP reconstruction records and their text reader.
pub mod colmap;

/// OpenSfM `reconstruction.json` records.
pub mod opensfm;

/// Polycam per-frame camera records.
pub mod polycam;

/// Record3D capture metadata.
pub mod record3d;

/// Error types for reading JSON records.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// Error reading the file.
    #[error("failed to read {path}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the expected record.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read and deserialize a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, JsonError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| JsonError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| JsonError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
