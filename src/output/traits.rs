//! Output capability traits
//!
//! The engine writes two shapes of artifact: lines appended to a log (URLs,
//! regex matches, e-mail records) and raw page bodies placed into a mirrored
//! directory tree. Each capability is a small trait so the sinks can be
//! swapped between files, stdout, and in-memory buffers in tests.

use thiserror::Error;
use url::Url;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to open output '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A sink that appends one record per line
pub trait LineWriter: Send {
    /// Appends a single line, including the trailing newline
    fn append(&mut self, line: &str) -> OutputResult<()>;
}

/// A sink that stores raw response bodies keyed by URL
pub trait BlobWriter: Send {
    /// Writes one page body at the location derived from its URL
    fn write_blob(&mut self, url: &Url, body: &[u8]) -> OutputResult<()>;
}
