//! Error types for Bambu job files.

use thiserror::Error;

/// Errors from reading or writing a `.gcode.3mf` job.
#[derive(Error, Debug)]
pub enum BambuError {
    /// 3MF container error.
    #[error("3MF error: {0}")]
    ThreeMfError(String),

    /// Plate not found in the archive.
    #[error("plate not found: {0}")]
    PlateNotFound(String),

    /// Plate metadata could not be parsed.
    #[error("invalid plate metadata: {0}")]
    InvalidMetadata(String),

    /// The output would overwrite the input job.
    #[error("refusing to overwrite the input file: {0}")]
    SameFile(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Bambu job operations.
pub type Result<T> = std::result::Result<T, BambuError>;
