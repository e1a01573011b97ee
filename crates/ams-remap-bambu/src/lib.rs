#![warn(missing_docs)]

//! Bambu Lab job files for AMS slot sharing.
//!
//! This crate provides:
//! - Reading a plate's G-code and metadata from a sliced `.gcode.3mf`
//! - Writing a copy of the job with new G-code and a matching MD5 sidecar
//!
//! # Example
//!
//! ```ignore
//! use ams_remap_bambu::{paused_output_path, PlateJob};
//!
//! let job = PlateJob::open("cube.gcode.3mf", None)?;
//! println!("Plate {}: {} colors", job.plate, job.metadata.color_count());
//!
//! // ... insert pauses into job.gcode ...
//! job.write_with_gcode(paused_output_path(&job.path), &job.gcode)?;
//! ```

pub mod error;
pub mod threemf;

pub use error::{BambuError, Result};
pub use threemf::{gcode_md5, paused_output_path, PlateJob, PlateMetadata};
