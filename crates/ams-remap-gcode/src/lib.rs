#![warn(missing_docs)]

//! G-code side of AMS slot sharing.
//!
//! This crate reads the color timeline out of sliced G-code and writes the
//! pauses of a [`ams_remap::PausePlan`] back into it.
//!
//! # Example
//!
//! ```ignore
//! use ams_remap::{plan_pauses, ColorGroups, PausePolicy, PlanOutcome, Share};
//! use ams_remap_gcode::{insert_pauses, GcodeFlavor, GcodeText, TimelineExtractor};
//!
//! let gcode = GcodeText::parse(&std::fs::read_to_string("plate_1.gcode")?);
//! let job = TimelineExtractor::new()?.extract(&gcode.lines)?;
//! let shares = [Share::new(5, 2), Share::new(6, 1), Share::new(7, 3)];
//! let groups = ColorGroups::resolve(7, 4, &shares)?;
//!
//! if let PlanOutcome::Success { plan, .. } =
//!     plan_pauses(&job.timeline, &groups, PausePolicy::default())?
//! {
//!     let paused = insert_pauses(&gcode, &job, &plan, GcodeFlavor::Bambu)?;
//!     std::fs::write("plate_1.paused.gcode", paused.join())?;
//! }
//! ```

pub mod error;
pub mod extract;
pub mod flavor;
pub mod rewrite;
pub mod text;

pub use error::{GcodeError, Result};
pub use extract::{JobTimeline, TimelineExtractor};
pub use flavor::GcodeFlavor;
pub use rewrite::{insert_pauses, pause_comment};
pub use text::GcodeText;
