//! Error types for mml-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mml-core
#[derive(Debug, Error)]
pub enum Error {
    /// Text lacks the `<Compact_Sonar_Files>` wrapper element
    #[error("unrecognised MML file structure")]
    UnrecognisedStructure,

    /// A line carries a `<CSFFILE` marker but is not a well-formed record
    #[error("unrecognised CSF row pattern at line {line}")]
    UnrecognisedRow { line: usize },

    /// File does not carry the `.mml` extension
    #[error("unrecognised file type: '{path}'")]
    UnrecognisedFileType { path: PathBuf },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An engine error raised while processing a specific file
    #[error("'{path}': {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Output would overwrite the destination without `in_place`
    #[error("refusing to overwrite destination '{0}'")]
    WouldOverwrite(PathBuf),

    /// Two syncs in one run would write the same output file
    #[error("output '{0}' already written by an earlier sync in this run")]
    OutputCollision(PathBuf),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Attach the file an engine error was raised for
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Error::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The engine error with any file context stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::InFile { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_message() {
        let err = Error::UnrecognisedRow { line: 3 }.in_file("dest.mml");
        assert_eq!(err.to_string(), "'dest.mml': unrecognised CSF row pattern at line 3");
        assert!(matches!(err.root(), Error::UnrecognisedRow { line: 3 }));
    }
}
