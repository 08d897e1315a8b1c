//! Filesystem operations module.
//!
//! This module turns the user's selection (files and folders) into the
//! ordered, duplicate-free list of files a batch uploads.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::metadata::SIDECAR_SUFFIX;

/// Expand files and folders into the list of files to upload.
///
/// # Arguments
/// * `inputs` - Files are taken as-is; folders are walked recursively
///
/// # Returns
/// Files in the caller's order, each folder replaced by its contents sorted
/// case-insensitively. Later case-insensitive duplicates are dropped.
/// Classification side-cars found in folders are metadata, not content, and
/// are left out.
///
/// # Errors
/// Returns BatchError if an input or a folder below it cannot be read
pub fn enumerate_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    fn recurse(folder: &Path, files: &mut Vec<PathBuf>) -> Result<(), BatchError> {
        let entries = fs::read_dir(folder).map_err(|e| BatchError::EnumerationFailed {
            path: folder.to_path_buf(),
            source: e,
        })?;

        let mut subfolders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BatchError::EnumerationFailed {
                path: folder.to_path_buf(),
                source: e,
            })?;
            let file_type = entry.file_type().map_err(|e| BatchError::EnumerationFailed {
                path: entry.path(),
                source: e,
            })?;
            if file_type.is_dir() {
                subfolders.push(entry.path());
            } else {
                files.push(entry.path());
            }
        }

        // Files of a folder come before its subfolders
        for subfolder in subfolders {
            recurse(&subfolder, files)?;
        }
        Ok(())
    }

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for input in inputs {
        let metadata = fs::metadata(input).map_err(|e| BatchError::EnumerationFailed {
            path: input.clone(),
            source: e,
        })?;
        let expanded = if metadata.is_dir() {
            let mut found = Vec::new();
            recurse(input, &mut found)?;
            found.retain(|path| !is_sidecar(path));
            found.sort_by_cached_key(|path| sort_key(path));
            found
        } else {
            vec![input.clone()]
        };

        for path in expanded {
            if seen.insert(sort_key(&path)) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn sort_key(path: &Path) -> String {
    path.to_string_lossy().to_uppercase()
}

fn is_sidecar(path: &Path) -> bool {
    sort_key(path).ends_with(&SIDECAR_SUFFIX.to_uppercase())
}
