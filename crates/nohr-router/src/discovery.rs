//! Recursive discovery of route-defining files

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, RouterError};
use crate::path::to_source_ref;

/// A file found under a scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path on disk
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated
    pub relative: String,
}

impl DiscoveredFile {
    /// Directory of the file relative to the scan root (`""` at the root)
    pub fn relative_dir(&self) -> &str {
        crate::path::parent_dir(&self.relative)
    }
}

/// Finds every file named `file_name` under `root`, in sorted traversal order
///
/// A missing root yields an empty list. Entries that vanish during the walk
/// are skipped. Every other I/O failure is a [`RouterError::Discovery`].
pub fn scan(root: &Path, file_name: &str) -> Result<Vec<DiscoveredFile>> {
    match root.metadata() {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(RouterError::discovery(
                root,
                io::Error::new(io::ErrorKind::InvalidInput, "scan root is not a directory"),
            ))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Scan root {} does not exist", root.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(RouterError::discovery(root, err)),
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                match err.into_io_error() {
                    Some(io_err) if io_err.kind() == io::ErrorKind::NotFound => continue,
                    Some(io_err) => return Err(RouterError::discovery(path, io_err)),
                    None => {
                        return Err(RouterError::discovery(
                            path,
                            io::Error::new(io::ErrorKind::Other, "filesystem loop detected"),
                        ))
                    }
                }
            }
        };

        if !entry.file_type().is_file() || entry.file_name() != file_name {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map(to_source_ref)
            .unwrap_or_else(|_| to_source_ref(entry.path()));

        found.push(DiscoveredFile {
            path: entry.path().to_path_buf(),
            relative,
        });
    }

    Ok(found)
}
