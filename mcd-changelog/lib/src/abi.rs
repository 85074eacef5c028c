//! Looking up interface definitions inside an unpacked ABI bundle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// File extension of interface-definition files in a bundle.
pub const ABI_EXTENSION: &str = "abi";

/// Errors from reading an ABI bundle.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Release {0} was published without ABIs")]
    NoBundle(String),

    #[error("No ABI file named '{name}' in {}", .bundle.display())]
    NotFound { bundle: PathBuf, name: String },

    #[error("Failed to read ABI bundle {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Returns the contents of the `.abi` file named exactly `file_name`.
///
/// The bundle is searched recursively in sorted order, so when the same name
/// appears in several directories the first one in that order wins.
///
/// ## Errors
///
/// - `AbiError::NotFound` if no `.abi` file has that exact name
/// - `AbiError::Io` if the bundle cannot be walked or the file read
pub fn lookup(bundle: &Path, file_name: &str) -> Result<String, AbiError> {
    for path in abi_files(bundle)? {
        if path.file_name().is_some_and(|name| name == file_name) {
            debug!(path = %path.display(), "Found ABI file");
            return fs::read_to_string(&path).map_err(|source| AbiError::Io { path, source });
        }
    }

    Err(AbiError::NotFound {
        bundle: bundle.to_path_buf(),
        name: file_name.to_string(),
    })
}

/// Every `.abi` file in the bundle, in sorted walk order.
pub fn abi_files(bundle: &Path) -> Result<Vec<PathBuf>, AbiError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(bundle).sort_by_file_name() {
        let entry = entry.map_err(|err| AbiError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| bundle.to_path_buf()),
            source: err.into(),
        })?;

        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == ABI_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle() -> TempDir {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(out.join("nested")).unwrap();
        fs::write(out.join("MCD_VAT.abi"), "vat").unwrap();
        fs::write(out.join("MCD_JUG.abi"), "jug").unwrap();
        fs::write(out.join("nested/MCD_SPOT.abi"), "spot").unwrap();
        fs::write(out.join("README.md"), "not an abi").unwrap();
        temp
    }

    #[test]
    fn test_lookup_exact_name() {
        let temp = bundle();
        assert_eq!(lookup(temp.path(), "MCD_VAT.abi").unwrap(), "vat");
    }

    #[test]
    fn test_lookup_recurses() {
        let temp = bundle();
        assert_eq!(lookup(temp.path(), "MCD_SPOT.abi").unwrap(), "spot");
    }

    #[test]
    fn test_lookup_missing_is_an_error() {
        let temp = bundle();
        let err = lookup(temp.path(), "MCD_CAT.abi").unwrap_err();
        assert!(matches!(err, AbiError::NotFound { ref name, .. } if name == "MCD_CAT.abi"));
    }

    #[test]
    fn test_lookup_ignores_other_extensions() {
        let temp = bundle();
        assert!(matches!(
            lookup(temp.path(), "README.md"),
            Err(AbiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_requires_full_name() {
        let temp = bundle();
        assert!(lookup(temp.path(), "MCD_VAT").is_err());
    }

    #[test]
    fn test_abi_files_sorted() {
        let temp = bundle();
        let names: Vec<String> = abi_files(temp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["MCD_JUG.abi", "MCD_VAT.abi", "MCD_SPOT.abi"]);
    }

    #[test]
    fn test_missing_bundle_directory() {
        let temp = TempDir::new().unwrap();
        let err = lookup(&temp.path().join("nope"), "MCD_VAT.abi").unwrap_err();
        assert!(matches!(err, AbiError::Io { .. }));
    }
}
