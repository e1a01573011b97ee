//! Error types for G-code processing.

use ams_remap::RemapError;
use thiserror::Error;

/// Errors from timeline extraction and pause insertion.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// A line pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(String),

    /// The extracted timeline was rejected.
    #[error(transparent)]
    Timeline(#[from] RemapError),

    /// A pause refers to a request the job does not have.
    #[error("pause before request {index}, but the job has {requests} tool changes")]
    PauseOutOfRange {
        /// Timeline index of the pause.
        index: usize,
        /// Number of extracted tool changes.
        requests: usize,
    },

    /// Unknown G-code flavor name.
    #[error("unknown G-code flavor: {0}")]
    UnknownFlavor(String),
}

/// Result type for G-code operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
