//! mml-core: Core library for syncing CSF draw orders between MML files
//!
//! This library provides functionality to:
//! - Recognise `<CSFFILEn>` record lines inside `<Compact_Sonar_Files>` text
//! - Extract an identifier -> draw order mapping from a source file
//! - Rewrite the draw orders of matching records in a destination file
//! - Run syncs over files, directory trees and JSON batch files

pub mod batch;
pub mod error;
pub mod extractor;
pub mod merger;
pub mod record;
pub mod scanner;
pub mod sync;

pub use batch::{run_batch, BatchFile, BatchJob, BatchResult};
pub use error::{Error, Result};
pub use extractor::{extract_draw_orders, DrawOrderMap};
pub use merger::{merge_draw_orders, LineChange, MergeOutcome};
pub use record::{classify_line, ensure_structure, CsfRecord, LineKind};
pub use scanner::{scan_mml_files, MmlFile, ScanResult};
pub use sync::{
    load_draw_orders, sync_directory, sync_files, DirSyncResult, OutputTarget, SyncReport,
};

/// Sync draw orders from source text into destination text
///
/// Convenience wrapper running the extraction pass then the merge pass.
pub fn sync_text(source: &str, destination: &str) -> Result<MergeOutcome> {
    let map = extract_draw_orders(source)?;
    merge_draw_orders(destination, &map)
}
