#![warn(missing_docs)]

//! Slot sharing for four-slot AMS printers.
//!
//! Several slicer colors can share one physical AMS slot. This crate walks
//! the ordered color requests of a sliced job, works out where a human has
//! to swap the filament in a shared slot, and either returns a pause plan or
//! reports the places where the print order leaves no room for a pause.
//!
//! # Example
//!
//! ```
//! use ams_remap::{plan_pauses, ColorGroups, PausePolicy, PlanOutcome, Share, Timeline};
//!
//! let shares = [Share::new(5, 2), Share::new(6, 1), Share::new(7, 3)];
//! let groups = ColorGroups::resolve(7, 4, &shares)?;
//! let timeline = Timeline::one_per_layer(&[1, 2, 3, 4, 1, 2, 5, 3, 4]);
//!
//! match plan_pauses(&timeline, &groups, PausePolicy::default())? {
//!     PlanOutcome::Success { plan, report } => {
//!         assert_eq!(plan.len(), 1);
//!         println!("{}", report);
//!     }
//!     PlanOutcome::Infeasible { report } => {
//!         for range in &report.conflicts {
//!             println!("{}", range);
//!         }
//!     }
//! }
//! # Ok::<(), ams_remap::RemapError>(())
//! ```

pub mod config;
pub mod error;
pub mod group;
pub mod plan;
pub mod report;
pub mod simulate;
pub mod timeline;

pub use config::RemapConfig;
pub use error::{ConfigurationError, RemapError, Result};
pub use group::{ColorGroup, ColorGroups, Share, ShareGroup, DEFAULT_SLOTS};
pub use plan::{PausePlan, PausePoint};
pub use report::{ConflictRange, Report};
pub use simulate::{ManualChangeEvent, OrderConflict, PausePolicy, Simulation, SlotState, Simulator};
pub use timeline::{Color, ColorRequest, Slot, Timeline};

/// Outcome of planning one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Every manual change has a pause point.
    Success {
        /// Pauses to insert.
        plan: PausePlan,
        /// Run report.
        report: Report,
    },
    /// The print order must change before the job can be rewritten.
    Infeasible {
        /// Run report, including the conflict ranges.
        report: Report,
    },
}

impl PlanOutcome {
    /// The run report.
    pub fn report(&self) -> &Report {
        match self {
            PlanOutcome::Success { report, .. } | PlanOutcome::Infeasible { report } => report,
        }
    }

    /// The pause plan, if the job is feasible.
    pub fn plan(&self) -> Option<&PausePlan> {
        match self {
            PlanOutcome::Success { plan, .. } => Some(plan),
            PlanOutcome::Infeasible { .. } => None,
        }
    }

    /// Check if the job can be rewritten.
    pub fn is_success(&self) -> bool {
        matches!(self, PlanOutcome::Success { .. })
    }
}

/// Simulate a job and build its pause plan.
///
/// This is the main entry point. It:
/// 1. Runs the slot occupancy simulation over the whole timeline
/// 2. Summarizes events and conflicts into a [`Report`]
/// 3. Builds a [`PausePlan`] only when no conflict was found
pub fn plan_pauses(
    timeline: &Timeline,
    groups: &ColorGroups,
    policy: PausePolicy,
) -> Result<PlanOutcome> {
    let simulation = Simulator::new(groups).with_policy(policy).run(timeline)?;
    let report = Report::new(&simulation);

    tracing::info!(
        requests = timeline.len(),
        manual_changes = report.manual_changes,
        conflicts = simulation.conflicts.len(),
        "simulated slot occupancy"
    );

    if simulation.has_conflicts() {
        return Ok(PlanOutcome::Infeasible { report });
    }
    let plan = PausePlan::from_events(&simulation.events);
    Ok(PlanOutcome::Success { plan, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seven_color_groups() -> ColorGroups {
        ColorGroups::resolve(7, 4, &[Share::new(7, 3), Share::new(5, 2), Share::new(6, 1)])
            .unwrap()
    }

    /// Multi-layer job where shared colors never follow each other directly.
    /// Color 6 is part of the job but never printed.
    fn reordered_timeline() -> Timeline {
        let layers: [&[u32]; 4] = [&[1, 2, 3, 4], &[1, 5, 4, 7, 1], &[2, 1, 3, 4, 5], &[7, 4, 2, 1]];
        let requests = layers
            .iter()
            .enumerate()
            .flat_map(|(layer, colors)| {
                colors
                    .iter()
                    .enumerate()
                    .map(move |(pos, &c)| ColorRequest::new(layer as u32, pos as u32, Color(c)))
            })
            .collect();
        Timeline::new(requests).unwrap()
    }

    #[test]
    fn test_end_to_end_success() {
        let groups = seven_color_groups();
        let timeline = reordered_timeline();
        let outcome = plan_pauses(&timeline, &groups, PausePolicy::default()).unwrap();

        let PlanOutcome::Success { plan, report } = &outcome else {
            panic!("expected success, got {:?}", outcome.report().conflicts);
        };
        assert_eq!(report.manual_changes, report.events.len());
        assert_eq!(report.manual_changes, 7);
        assert_eq!(plan.len(), report.manual_changes);
        assert!(report.to_string().contains(&format!(
            "Manual filament change times: {}",
            report.events.len()
        )));

        // Replaying the job with the plan applied: every switch of the color
        // held by a slot happens at a pause.
        let paused: HashSet<usize> = plan.points().iter().map(|p| p.index).collect();
        let mut loaded: Vec<Option<Color>> = groups.initial_load();
        for (index, request) in timeline.requests().iter().enumerate() {
            let slot = groups.anchor(request.color).unwrap().index().unwrap();
            if loaded[slot] != Some(request.color) {
                assert!(paused.contains(&index), "no pause before request {}", index);
                loaded[slot] = Some(request.color);
            } else {
                assert!(!paused.contains(&index));
            }
        }
    }

    #[test]
    fn test_end_to_end_infeasible() {
        let groups = seven_color_groups();
        let requests = vec![
            ColorRequest::new(0, 0, Color(1)),
            ColorRequest::new(0, 1, Color(3)),
            ColorRequest::new(0, 2, Color(7)),
            ColorRequest::new(1, 0, Color(2)),
            ColorRequest::new(1, 1, Color(5)),
        ];
        let timeline = Timeline::new(requests).unwrap();
        let outcome = plan_pauses(&timeline, &groups, PausePolicy::default()).unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.plan().is_none());
        let report = outcome.report();
        assert_eq!(report.conflicts.len(), 2);
        assert_eq!(report.conflicts[0].to_string(), "Layer 0 to 0: 3 -> 7");
        assert_eq!(report.conflicts[1].to_string(), "Layer 1 to 1: 2 -> 5");
    }

    #[test]
    fn test_no_sharing_is_trivially_feasible() {
        let groups = ColorGroups::identity(4, 4).unwrap();
        let timeline = Timeline::single_layer(0, &[4, 3, 2, 1, 1, 2]);
        let outcome = plan_pauses(&timeline, &groups, PausePolicy::Strict).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.plan().unwrap().is_empty());
        assert_eq!(outcome.report().filament_changes, 4);
    }

    #[test]
    fn test_unprinted_color_still_needs_a_slot() {
        // Color 6 is never requested, but the job declares it.
        let err = ColorGroups::resolve(7, 4, &[Share::new(7, 3), Share::new(5, 2)]).unwrap_err();
        assert_eq!(
            err,
            RemapError::Configuration(ConfigurationError::Unassigned { color: 6, slots: 4 })
        );
    }

    #[test]
    fn test_color_beyond_job_is_configuration_error() {
        let groups = seven_color_groups();
        let timeline = Timeline::single_layer(0, &[1, 8]);
        let err = plan_pauses(&timeline, &groups, PausePolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            RemapError::Configuration(ConfigurationError::ColorOutOfRange { color: 8, .. })
        ));
    }
}
