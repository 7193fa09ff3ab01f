//! Directory scanner for discovering MML files

use crate::error::{Error, Result};
use crate::sync::is_mml_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// An MML file found under a scan root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmlFile {
    /// Root the file was found under
    pub root: PathBuf,
    /// Full path to the file
    pub path: PathBuf,
}

impl MmlFile {
    /// Path relative to the scan root
    pub fn relative_path(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(&self.path)
    }
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered files, sorted by path within each root
    pub files: Vec<MmlFile>,
    /// Entries that could not be walked (path, error message)
    pub errors: Vec<(PathBuf, String)>,
}

impl ScanResult {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// Scan one or more directories for `.mml` files
///
/// Entries that fail to walk (dangling links, unreadable directories, a
/// missing root) are recorded in `errors` and the scan carries on.
pub fn scan_mml_files<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for root in roots {
        let root = root.as_ref();

        let mut found: Vec<MmlFile> = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    let e = Error::WalkDir(e);
                    warn!(path = %path.display(), error = %e, "skipping entry");
                    errors.push((path, e.to_string()));
                    continue;
                }
            };
            if entry.file_type().is_file() && is_mml_path(entry.path()) {
                found.push(MmlFile {
                    root: root.to_path_buf(),
                    path: entry.path().to_path_buf(),
                });
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        files.extend(found);
    }

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
        errors,
    })
}
