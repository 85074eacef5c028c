//! Unpacking ABI archives.
//!
//! An archive is verified in full before anything touches the disk: every
//! entry is read to the end (which checks its CRC-32), every entry path must
//! stay inside the destination, and the unpacked total must stay under
//! [`MAX_UNPACKED_BYTES`]. The bundle is then extracted into a sibling staging
//! directory and swapped into place with renames.

use crate::network::Network;
use crate::version::ReleaseVersion;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// Upper bound on the total uncompressed size of one ABI archive.
pub const MAX_UNPACKED_BYTES: u64 = 256 * 1024 * 1024;

/// Errors from verifying or unpacking an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bytes are not a readable ZIP archive
    #[error("Archive is not a valid ZIP file: {0}")]
    Corrupt(#[from] ZipError),

    /// An entry failed its integrity check
    #[error("Archive entry '{entry}' failed integrity check: {source}")]
    Integrity {
        entry: String,
        #[source]
        source: io::Error,
    },

    /// An entry would be written outside the destination directory
    #[error("Archive entry '{0}' has an unsafe path")]
    UnsafePath(String),

    /// The archive unpacks to more than the allowed number of bytes
    #[error("Archive entry '{entry}' exceeds the {limit} byte unpack limit")]
    TooLarge { entry: String, limit: u64 },

    #[error("Failed to write bundle at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Directory an ABI bundle for `network`/`version` lives in under `root`.
pub fn bundle_dir(root: &Path, network: Network, version: &ReleaseVersion) -> PathBuf {
    root.join(network.as_str()).join(version.as_str())
}

/// Verifies `archive` and extracts it into `dest`.
///
/// `dest` is replaced wholesale once the new bundle is fully written. Any
/// failure before that point leaves `dest` untouched.
///
/// ## Errors
///
/// - `ArchiveError::Corrupt` if the central directory cannot be read
/// - `ArchiveError::Integrity` if any entry fails its checksum
/// - `ArchiveError::UnsafePath` if any entry escapes `dest`
/// - `ArchiveError::TooLarge` if the archive unpacks past [`MAX_UNPACKED_BYTES`]
/// - `ArchiveError::Io` if writing the bundle fails
pub fn unpack(archive: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    unpack_within(archive, dest, MAX_UNPACKED_BYTES)
}

pub(crate) fn unpack_within(archive: &[u8], dest: &Path, limit: u64) -> Result<(), ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let entries = verify(&mut zip, limit)?;

    let staging = sibling(dest, "unpacking");
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|source| io_error(&staging, source))?;
    }
    fs::create_dir_all(&staging).map_err(|source| io_error(&staging, source))?;

    if let Err(e) = extract(&mut zip, entries, &staging) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging directory");
        }
        return Err(e);
    }

    commit(&staging, dest)?;
    debug!(dest = %dest.display(), entries = zip.len(), "Unpacked archive");
    Ok(())
}

/// Reads every entry once, returning the sanitized relative paths in
/// archive order.
fn verify(zip: &mut ZipArchive<Cursor<&[u8]>>, limit: u64) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut paths = Vec::with_capacity(zip.len());
    let mut total: u64 = 0;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_string();

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(name.clone()))?;

        if !entry.is_dir() {
            let remaining = limit - total;
            if entry.size() > remaining {
                return Err(ArchiveError::TooLarge { entry: name, limit });
            }
            // Declared sizes can lie, so the read itself is capped too.
            let read = io::copy(&mut (&mut entry).take(remaining + 1), &mut io::sink())
                .map_err(|source| ArchiveError::Integrity {
                    entry: name.clone(),
                    source,
                })?;
            if read > remaining {
                return Err(ArchiveError::TooLarge { entry: name, limit });
            }
            total += read;
        }

        paths.push(relative);
    }

    Ok(paths)
}

fn extract(
    zip: &mut ZipArchive<Cursor<&[u8]>>,
    entries: Vec<PathBuf>,
    root: &Path,
) -> Result<(), ArchiveError> {
    for (index, relative) in entries.into_iter().enumerate() {
        let mut entry = zip.by_index(index)?;
        let target = root.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| io_error(&target, source))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let mut file = fs::File::create(&target).map_err(|source| io_error(&target, source))?;
        io::copy(&mut entry, &mut file).map_err(|source| io_error(&target, source))?;
    }
    Ok(())
}

/// Moves `staging` to `dest`, keeping the previous bundle until the swap
/// has succeeded.
fn commit(staging: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let previous = sibling(dest, "previous");
    if previous.exists() {
        fs::remove_dir_all(&previous).map_err(|source| io_error(&previous, source))?;
    }

    let had_previous = dest.exists();
    if had_previous {
        fs::rename(dest, &previous).map_err(|source| io_error(dest, source))?;
    }

    if let Err(source) = fs::rename(staging, dest) {
        if had_previous && let Err(restore) = fs::rename(&previous, dest) {
            warn!(path = %dest.display(), error = %restore, "Failed to restore previous bundle");
        }
        return Err(io_error(dest, source));
    }

    if had_previous && let Err(e) = fs::remove_dir_all(&previous) {
        warn!(path = %previous.display(), error = %e, "Failed to remove previous bundle");
    }
    Ok(())
}

/// `<dest>.<suffix>` next to `dest`.
fn sibling(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("bundle"));
    name.push(".");
    name.push(suffix);
    dest.with_file_name(name)
}

fn io_error(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}
