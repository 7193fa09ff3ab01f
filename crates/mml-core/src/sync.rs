//! File-level sync: read a source and destination MML file, merge, write
//!
//! This is the layer that deals with paths. The text engine in
//! [`crate::extractor`] and [`crate::merger`] never touches the filesystem.

use crate::error::{Error, Result};
use crate::extractor::{extract_draw_orders, DrawOrderMap};
use crate::merger::{merge_draw_orders, LineChange};
use crate::scanner::scan_mml_files;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extension both sides of a sync must carry
pub const MML_EXTENSION: &str = "mml";

/// Where the processed destination text goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write under this directory using the destination's file name
    Directory(PathBuf),
    /// Overwrite the destination file
    InPlace,
    /// Compute the result without writing anything
    DryRun,
}

/// Summary of one source -> destination sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// File written, `None` for a dry run
    pub output: Option<PathBuf>,
    /// Identifiers extracted from the source
    pub identifiers: usize,
    pub records_seen: usize,
    pub records_matched: usize,
    pub lines_affected: usize,
    pub changes: Vec<LineChange>,
}

impl SyncReport {
    /// Human-readable result line, e.g. "3 lines affected"
    pub fn summary(&self) -> String {
        format!("{} lines affected", self.lines_affected)
    }
}

/// Check that a path carries the `.mml` extension (case-insensitive)
pub fn is_mml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MML_EXTENSION))
}

/// Fail with `UnrecognisedFileType` unless the path is an `.mml` file
pub fn ensure_mml_extension(path: &Path) -> Result<()> {
    if is_mml_path(path) {
        Ok(())
    } else {
        Err(Error::UnrecognisedFileType {
            path: path.to_path_buf(),
        })
    }
}

/// Read a whole MML file as UTF-8 text
pub fn read_mml<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Extract the draw order mapping from a source MML file
pub fn load_draw_orders<P: AsRef<Path>>(source: P) -> Result<DrawOrderMap> {
    let source = source.as_ref();
    ensure_mml_extension(source)?;
    let text = read_mml(source)?;
    extract_draw_orders(&text).map_err(|e| e.in_file(source))
}

/// Sync draw orders from `source` into `destination`
pub fn sync_files<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    destination: Q,
    target: &OutputTarget,
) -> Result<SyncReport> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    // Both files are checked before either is read
    ensure_mml_extension(source)?;
    ensure_mml_extension(destination)?;

    let map = load_draw_orders(source)?;
    let output = match target {
        OutputTarget::Directory(dir) => Some(output_path_for(destination, dir)?),
        OutputTarget::InPlace => Some(destination.to_path_buf()),
        OutputTarget::DryRun => None,
    };

    sync_into(&map, source, destination, output)
}

/// Merge an already extracted mapping into `destination`, writing the
/// result to `output` when given
pub fn sync_into(
    map: &DrawOrderMap,
    source: &Path,
    destination: &Path,
    output: Option<PathBuf>,
) -> Result<SyncReport> {
    ensure_mml_extension(destination)?;
    let text = read_mml(destination)?;
    let outcome = merge_draw_orders(&text, map).map_err(|e| e.in_file(destination))?;

    if let Some(ref path) = output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &outcome.text)?;
    }

    info!(
        source = %source.display(),
        destination = %destination.display(),
        lines_affected = outcome.lines_affected,
        "synced draw orders"
    );

    Ok(SyncReport {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        output,
        identifiers: map.len(),
        records_seen: outcome.records_seen,
        records_matched: outcome.records_matched,
        lines_affected: outcome.lines_affected,
        changes: outcome.changes,
    })
}

/// Output file for `destination` inside `dir`, keeping the file name
///
/// Refuses to resolve to the destination itself; use
/// [`OutputTarget::InPlace`] for that.
pub fn output_path_for(destination: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = destination
        .file_name()
        .ok_or_else(|| Error::UnrecognisedFileType {
            path: destination.to_path_buf(),
        })?;
    let output = dir.join(file_name);
    ensure_not_destination(destination, &output)?;
    Ok(output)
}

fn ensure_not_destination(destination: &Path, output: &Path) -> Result<()> {
    let same = match (fs::canonicalize(destination), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => destination == output,
    };
    if same {
        Err(Error::WouldOverwrite(destination.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Result of syncing one source onto a directory tree
#[derive(Debug, Clone, Default)]
pub struct DirSyncResult {
    /// Successful syncs, in scan order
    pub reports: Vec<SyncReport>,
    /// Files that failed (destination path, error message)
    pub errors: Vec<(PathBuf, String)>,
}

impl DirSyncResult {
    pub fn lines_affected(&self) -> usize {
        self.reports.iter().map(|r| r.lines_affected).sum()
    }
}

/// Fail if an earlier sync in this run already wrote `output`
pub(crate) fn ensure_unclaimed(written: &HashSet<PathBuf>, output: &Path) -> Result<()> {
    if written.contains(output) {
        Err(Error::OutputCollision(output.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Sync one source onto every `.mml` file under `roots`
///
/// Outputs mirror each file's path relative to its root under `output_dir`.
/// The source itself and anything already inside `output_dir` are skipped.
/// A failing destination is recorded and the rest still run; so is a file
/// whose output path was already written by an earlier root.
pub fn sync_directory<P: AsRef<Path>>(
    source: &Path,
    roots: &[P],
    output_dir: &Path,
) -> Result<DirSyncResult> {
    let map = load_draw_orders(source)?;
    let scan = scan_mml_files(roots)?;

    fs::create_dir_all(output_dir)?;
    let source_canonical = fs::canonicalize(source)?;
    let output_canonical = fs::canonicalize(output_dir)?;

    let mut result = DirSyncResult {
        reports: Vec::new(),
        errors: scan.errors,
    };
    let mut written: HashSet<PathBuf> = HashSet::new();

    for file in &scan.files {
        let canonical = match fs::canonicalize(&file.path) {
            Ok(path) => path,
            Err(e) => {
                let e = Error::FileRead {
                    path: file.path.clone(),
                    source: e,
                };
                warn!(path = %file.path.display(), error = %e, "skipping destination");
                result.errors.push((file.path.clone(), e.to_string()));
                continue;
            }
        };
        if canonical == source_canonical || canonical.starts_with(&output_canonical) {
            continue;
        }

        let output = output_dir.join(file.relative_path());
        let synced = ensure_not_destination(&file.path, &output)
            .and_then(|_| ensure_unclaimed(&written, &output))
            .and_then(|_| sync_into(&map, source, &file.path, Some(output)));

        match synced {
            Ok(report) => {
                written.extend(report.output.clone());
                result.reports.push(report);
            }
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "skipping destination");
                result.errors.push((file.path.clone(), e.to_string()));
            }
        }
    }

    Ok(result)
}
