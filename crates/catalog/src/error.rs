//! Error types for the catalog crate.

use thiserror::Error;

/// Errors that can occur while loading catalog files
///
/// Row-level problems never show up here: malformed rows are skipped and
/// unparseable numbers become zero. Only whole-file failures are reported.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file was readable but not even a header row could be found
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
