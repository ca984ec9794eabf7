//! Error types for MPEG frame extraction

use std::io;

/// Result type alias for frame-reader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading frames from a file.
///
/// Malformed or reserved headers are never surfaced here; the reader
/// recovers from them locally by resynchronising one byte at a time.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while opening or reading the source file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a frame body
    #[error("truncated frame: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
}
