//! Persisting a release collection between runs.
//!
//! The collection is written as pretty JSON to a single file. Writes go
//! through a sibling temporary file and a rename, so readers never see a
//! half-written collection.

use crate::release::ReleaseCollection;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from saving or loading a collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No release index at {}; run `mcd-changelog refresh` first", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to access release index {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Release index {} is corrupt: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Writes `releases` to `path`, creating parent directories as needed.
pub fn save(releases: &ReleaseCollection, path: &Path) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(releases).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    debug!(path = %path.display(), releases = releases.len(), "Saved release index");
    Ok(())
}

/// Reads a collection previously written by [`save`].
pub fn load(path: &Path) -> Result<ReleaseCollection, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}
