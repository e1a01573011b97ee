//! Error types for slot remapping.

use thiserror::Error;

/// Errors that can occur while resolving a grouping or simulating a timeline.
///
/// Order conflicts are not errors: they are collected by the simulator and
/// returned through [`crate::PlanOutcome::Infeasible`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    /// Malformed or contradictory color grouping.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The timeline is not in print order.
    #[error("timeline out of order at request {index}: layer {layer} position {position} follows layer {prev_layer} position {prev_position}")]
    TimelineOutOfOrder {
        /// Global index of the offending request.
        index: usize,
        /// Layer of the offending request.
        layer: u32,
        /// Position of the offending request.
        position: u32,
        /// Layer of the request before it.
        prev_layer: u32,
        /// Position of the request before it.
        prev_position: u32,
    },

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {message}")]
    ConfigRead {
        /// Path of the file.
        path: String,
        /// Underlying IO error message.
        message: String,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config: {0}")]
    ConfigParse(String),
}

/// Defects in the user's color grouping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The printer must have at least one slot.
    #[error("slot count must be at least 1")]
    NoSlots,

    /// A color identity outside `1..=N`.
    #[error("color {color} is out of range (job has {color_count} colors)")]
    ColorOutOfRange {
        /// Offending color.
        color: u32,
        /// Number of colors in the job.
        color_count: u32,
    },

    /// A color paired with itself.
    #[error("color {0} cannot share a slot with itself")]
    SelfShare(u32),

    /// The same guest appears in more than one pair.
    #[error("color {guest} is mapped more than once (to {first} and {second})")]
    DuplicateGuest {
        /// Guest color.
        guest: u32,
        /// Host of the first mapping.
        first: u32,
        /// Host of the second mapping.
        second: u32,
    },

    /// A chain of pairs loops back onto itself.
    #[error("color {0} is part of a mapping cycle")]
    Cycle(u32),

    /// A color above the slot count that no pair assigns to a slot.
    #[error("color {color} has no slot: colors above {slots} must share a slot with a base color")]
    Unassigned {
        /// Offending color.
        color: u32,
        /// Number of physical slots.
        slots: u32,
    },

    /// A share entry could not be parsed (`guest:host`).
    #[error("invalid share `{0}`: expected guest:host")]
    InvalidShare(String),
}

/// Result type for remapping operations.
pub type Result<T> = std::result::Result<T, RemapError>;
