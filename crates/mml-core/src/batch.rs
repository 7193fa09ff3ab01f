//! Batch files describing several syncs to run in one go

use crate::error::{Error, Result};
use crate::sync::{ensure_unclaimed, output_path_for, sync_files, OutputTarget, SyncReport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One source -> destination pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A batch file containing multiple sync jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFile {
    /// Output directory for processed destinations
    pub output_dir: PathBuf,
    /// Jobs, run in order
    pub jobs: Vec<BatchJob>,
}

impl BatchFile {
    /// Load a batch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the batch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// A template with placeholder jobs
    pub fn template(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            jobs: vec![
                BatchJob {
                    source: PathBuf::from("source1.mml"),
                    destination: PathBuf::from("destination1.mml"),
                },
                BatchJob {
                    source: PathBuf::from("source2.mml"),
                    destination: PathBuf::from("destination2.mml"),
                },
            ],
        }
    }
}

/// Result of running a batch
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Successful syncs
    pub reports: Vec<SyncReport>,
    /// Jobs that failed (destination path, error message)
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn lines_affected(&self) -> usize {
        self.reports.iter().map(|r| r.lines_affected).sum()
    }
}

/// Run every job in the batch; a failed job does not stop the rest
///
/// Outputs are named after each destination's file name, so a job whose
/// output was already written earlier in the batch fails instead of
/// replacing it.
pub fn run_batch(batch: &BatchFile) -> BatchResult {
    let mut result = BatchResult::default();
    let target = OutputTarget::Directory(batch.output_dir.clone());
    let mut written: HashSet<PathBuf> = HashSet::new();

    for job in &batch.jobs {
        let synced = output_path_for(&job.destination, &batch.output_dir)
            .and_then(|output| ensure_unclaimed(&written, &output))
            .and_then(|_| sync_files(&job.source, &job.destination, &target));

        match synced {
            Ok(report) => {
                written.extend(report.output.clone());
                result.reports.push(report);
            }
            Err(e) => {
                warn!(destination = %job.destination.display(), error = %e, "batch job failed");
                result.errors.push((job.destination.clone(), e.to_string()));
            }
        }
    }

    result
}
