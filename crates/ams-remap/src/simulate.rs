//! Slot occupancy simulation.
//!
//! Walks a [`Timeline`] once, in order, tracking which color is loaded in
//! every physical slot. A request for a color that is not loaded either
//! becomes a [`ManualChangeEvent`] (a pause is inserted before it) or, when
//! nothing separates it from the previous request on the same slot, an
//! [`OrderConflict`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, Result};
use crate::group::ColorGroups;
use crate::timeline::{Color, ColorRequest, Slot, Timeline};

/// Where a pause can be placed between two back-to-back requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PausePolicy {
    /// A layer change is a pause point; adjacent requests on the same layer are not.
    #[default]
    LayerBoundary,
    /// Adjacent requests can never be separated, even across layers.
    Strict,
}

impl PausePolicy {
    /// Check if no pause fits between `prev` and `next`, which are adjacent in print order.
    fn blocks(self, prev: &ColorRequest, next: &ColorRequest) -> bool {
        match self {
            PausePolicy::LayerBoundary => prev.layer == next.layer,
            PausePolicy::Strict => true,
        }
    }
}

/// Color loaded in each physical slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotState {
    slots: Vec<Option<Color>>,
}

impl SlotState {
    /// Job-start state for a grouping.
    pub fn initial(groups: &ColorGroups) -> Self {
        Self {
            slots: groups.initial_load(),
        }
    }

    /// Color loaded in `slot`.
    pub fn get(&self, slot: Slot) -> Option<Color> {
        self.slots.get(slot.index()?).copied().flatten()
    }

    /// Load `color` into `slot`, returning the color it replaces.
    fn load(&mut self, slot: Slot, color: Color) -> Option<Color> {
        self.slots.get_mut(slot.index()?)?.replace(color)
    }

    /// Per-slot contents in slot order.
    pub fn slots(&self) -> &[Option<Color>] {
        &self.slots
    }

    /// Check that every loaded color belongs to the slot it sits in.
    pub fn is_consistent(&self, groups: &ColorGroups) -> bool {
        self.slots.len() == groups.slot_count() as usize
            && self.slots.iter().enumerate().all(|(i, color)| match color {
                Some(c) => groups.anchor(*c) == Some(Slot(i as u32 + 1)),
                None => true,
            })
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, color) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match color {
                Some(c) => write!(f, "{}", c)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "]")
    }
}

/// A pause-gated filament swap in one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualChangeEvent {
    /// Global index of the request in the timeline.
    pub index: usize,
    /// Layer of the request.
    pub layer: u32,
    /// Position of the request within its layer.
    pub position: u32,
    /// Slot being reloaded.
    pub slot: Slot,
    /// Color taken out of the slot.
    pub from: Option<Color>,
    /// Color put into the slot.
    pub to: Color,
    /// Slot contents right after the swap.
    pub state: SlotState,
}

/// Two back-to-back requests on the same slot with no room for a pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConflict {
    /// Shared slot.
    pub slot: Slot,
    /// Color printed first.
    pub from: Color,
    /// Color printed right after it.
    pub to: Color,
    /// Timeline index of the first request.
    pub from_index: usize,
    /// Timeline index of the second request.
    pub to_index: usize,
    /// Layer of the first request.
    pub first_layer: u32,
    /// Layer of the second request.
    pub last_layer: u32,
}

/// Everything one simulation pass produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Simulation {
    /// Slot contents assumed at job start.
    pub initial_state: SlotState,
    /// Manual changes in timeline order.
    pub events: Vec<ManualChangeEvent>,
    /// Order conflicts in timeline order.
    pub conflicts: Vec<OrderConflict>,
    /// Number of filament changes the job performs.
    pub filament_changes: usize,
    /// Slot contents at the end of the job.
    pub final_state: SlotState,
}

impl Simulation {
    /// Check if any conflict was found.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Slot occupancy simulator for one grouping.
///
/// The simulator holds no state between calls to [`Simulator::run`]; every
/// run starts from [`SlotState::initial`].
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    groups: &'a ColorGroups,
    policy: PausePolicy,
}

impl<'a> Simulator<'a> {
    /// Create a simulator with the default pause policy.
    pub fn new(groups: &'a ColorGroups) -> Self {
        Self {
            groups,
            policy: PausePolicy::default(),
        }
    }

    /// Use a different pause policy.
    pub fn with_policy(mut self, policy: PausePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn out_of_range(&self, color: Color) -> ConfigurationError {
        ConfigurationError::ColorOutOfRange {
            color: color.0,
            color_count: self.groups.color_count(),
        }
    }

    /// Simulate the timeline in order.
    ///
    /// Fails only if the timeline requests a color outside the job.
    /// Conflicts do not stop the pass; the slot keeps its color and the
    /// simulation continues so later effects are reported too.
    pub fn run(&self, timeline: &Timeline) -> Result<Simulation> {
        let initial_state = SlotState::initial(self.groups);
        let mut state = initial_state.clone();
        let mut events = Vec::new();
        let mut conflicts = Vec::new();
        let mut previous: Option<(usize, ColorRequest)> = None;

        for (index, request) in timeline.requests().iter().copied().enumerate() {
            let slot = self
                .groups
                .anchor(request.color)
                .ok_or_else(|| self.out_of_range(request.color))?;
            let prev = previous.replace((index, request));

            // Still extruding the same filament.
            if matches!(prev, Some((_, p)) if p.color == request.color) {
                continue;
            }
            if state.get(slot) == Some(request.color) {
                continue;
            }

            let blocked = prev.filter(|(_, p)| {
                self.groups.anchor(p.color) == Some(slot) && self.policy.blocks(p, &request)
            });
            if let Some((prev_index, p)) = blocked {
                debug!(
                    layer = request.layer,
                    slot = slot.0,
                    "order conflict: color {} directly follows color {}",
                    request.color,
                    p.color
                );
                conflicts.push(OrderConflict {
                    slot,
                    from: p.color,
                    to: request.color,
                    from_index: prev_index,
                    to_index: index,
                    first_layer: p.layer,
                    last_layer: request.layer,
                });
                continue;
            }

            let from = state.load(slot, request.color);
            debug_assert!(state.is_consistent(self.groups));
            debug!(
                layer = request.layer,
                slot = slot.0,
                "manual change: {:?} -> {}",
                from.map(|c| c.0),
                request.color
            );
            events.push(ManualChangeEvent {
                index,
                layer: request.layer,
                position: request.position,
                slot,
                from,
                to: request.color,
                state: state.clone(),
            });
        }

        Ok(Simulation {
            initial_state,
            events,
            conflicts,
            filament_changes: timeline.filament_changes(),
            final_state: state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemapError;
    use crate::group::Share;

    fn groups(color_count: u32, shares: &[(u32, u32)]) -> ColorGroups {
        let shares: Vec<Share> = shares.iter().map(|&(g, h)| Share::new(g, h)).collect();
        ColorGroups::resolve(color_count, 4, &shares).unwrap()
    }

    #[test]
    fn test_no_guests_no_events() {
        let groups = groups(4, &[]);
        let timeline = Timeline::single_layer(0, &[1, 2, 3, 4, 2, 1, 4, 3, 3, 1]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert!(sim.events.is_empty());
        assert!(sim.conflicts.is_empty());
        assert_eq!(sim.final_state.slots(), groups.initial_load().as_slice());
    }

    #[test]
    fn test_guest_across_layers() {
        let groups = groups(7, &[(5, 2), (6, 1), (7, 3)]);
        let timeline = Timeline::one_per_layer(&[1, 2, 3, 4, 1, 2, 5, 3, 4]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();

        assert!(sim.conflicts.is_empty());
        assert_eq!(sim.events.len(), 1);
        let event = &sim.events[0];
        assert_eq!(event.index, 6);
        assert_eq!(event.layer, 6);
        assert_eq!(event.slot, Slot(2));
        assert_eq!(event.from, Some(Color(2)));
        assert_eq!(event.to, Color(5));
        assert_eq!(event.state.to_string(), "[1, 5, 3, 4]");
    }

    #[test]
    fn test_adjacent_same_layer_conflict() {
        let groups = groups(5, &[(5, 2)]);
        let timeline = Timeline::single_layer(3, &[1, 2, 5, 3]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();

        assert!(sim.events.is_empty());
        assert_eq!(sim.conflicts.len(), 1);
        let conflict = &sim.conflicts[0];
        assert_eq!((conflict.from, conflict.to), (Color(2), Color(5)));
        assert_eq!((conflict.first_layer, conflict.last_layer), (3, 3));
        assert_eq!((conflict.from_index, conflict.to_index), (1, 2));
        // the swap never happened
        assert_eq!(sim.final_state.get(Slot(2)), Some(Color(2)));
    }

    #[test]
    fn test_conflict_keeps_state_for_later_requests() {
        let groups = groups(5, &[(5, 2)]);
        // 2,5 conflicts; the later 5 still needs a manual change.
        let timeline = Timeline::single_layer(0, &[2, 5, 1, 5]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert_eq!(sim.conflicts.len(), 1);
        assert_eq!(sim.events.len(), 1);
        assert_eq!(sim.events[0].index, 3);
        assert_eq!(sim.events[0].from, Some(Color(2)));
    }

    #[test]
    fn test_repeated_color_no_event() {
        let groups = groups(5, &[(5, 2)]);
        let timeline = Timeline::single_layer(0, &[1, 5, 5, 5, 3]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert_eq!(sim.events.len(), 1);

        // A conflicting color repeated back to back is one conflict.
        let timeline = Timeline::single_layer(0, &[2, 5, 5, 1]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert_eq!(sim.conflicts.len(), 1);
        assert!(sim.events.is_empty());
    }

    #[test]
    fn test_strict_policy_blocks_layer_boundary() {
        let groups = groups(5, &[(5, 2)]);
        let timeline = Timeline::one_per_layer(&[1, 2, 5]);

        let relaxed = Simulator::new(&groups).run(&timeline).unwrap();
        assert_eq!(relaxed.events.len(), 1);
        assert!(relaxed.conflicts.is_empty());

        let strict = Simulator::new(&groups)
            .with_policy(PausePolicy::Strict)
            .run(&timeline)
            .unwrap();
        assert!(strict.events.is_empty());
        assert_eq!(strict.conflicts.len(), 1);
        assert_eq!(strict.conflicts[0].first_layer, 1);
        assert_eq!(strict.conflicts[0].last_layer, 2);
    }

    #[test]
    fn test_slot_zero_is_empty() {
        let groups = groups(4, &[]);
        let state = SlotState::initial(&groups);
        assert_eq!(state.get(Slot(0)), None);
        assert_eq!(state.get(Slot(5)), None);
        assert_eq!(state.get(Slot(4)), Some(Color(4)));
    }

    #[test]
    fn test_unknown_color() {
        let groups = groups(4, &[]);
        let timeline = Timeline::single_layer(0, &[1, 6]);
        let err = Simulator::new(&groups).run(&timeline).unwrap_err();
        assert_eq!(
            err,
            RemapError::Configuration(ConfigurationError::ColorOutOfRange {
                color: 6,
                color_count: 4
            })
        );
    }


    #[test]
    fn test_runs_are_identical() {
        let groups = groups(7, &[(5, 2), (6, 1), (7, 3)]);
        let timeline = Timeline::single_layer(0, &[1, 2, 3, 5, 6, 7, 4, 2, 6, 1, 3, 7, 5]);
        let simulator = Simulator::new(&groups);
        let first = simulator.run(&timeline).unwrap();
        let second = simulator.run(&timeline).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_state_stays_consistent() {
        let groups = groups(8, &[(5, 1), (6, 2), (7, 3), (8, 4)]);
        let colors = [1, 5, 2, 3, 6, 7, 4, 8, 1, 2, 5, 6, 3, 8, 7, 4];
        let timeline = Timeline::one_per_layer(&colors);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert!(!sim.events.is_empty());
        for event in &sim.events {
            assert_eq!(event.state.slots().len(), 4);
            assert!(event.state.is_consistent(&groups));
            assert_eq!(event.state.get(event.slot), Some(event.to));
        }
        assert!(sim.final_state.is_consistent(&groups));
    }
}
