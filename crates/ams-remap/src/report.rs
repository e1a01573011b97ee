//! Run reports: manual change transcript, conflict ranges, and counts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::simulate::{ManualChangeEvent, OrderConflict, Simulation, SlotState};
use crate::timeline::Color;

/// Consecutive layers sharing the same conflicting color pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRange {
    /// First affected layer.
    pub first_layer: u32,
    /// Last affected layer.
    pub last_layer: u32,
    /// `(printed first, printed next)` pairs, deduplicated.
    pub pairs: BTreeSet<(Color, Color)>,
}

impl fmt::Display for ConflictRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(a, b)| format!("{} -> {}", a, b))
            .collect();
        write!(
            f,
            "Layer {} to {}: {}",
            self.first_layer,
            self.last_layer,
            pairs.join(", ")
        )
    }
}

/// Aggregated result of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Slot contents the job expects at start.
    pub initial_load: SlotState,
    /// Filament changes the job performs.
    pub filament_changes: usize,
    /// Changes that need a pause and a human.
    pub manual_changes: usize,
    /// Manual changes in timeline order.
    pub events: Vec<ManualChangeEvent>,
    /// Conflicting layer ranges.
    pub conflicts: Vec<ConflictRange>,
}

impl Report {
    /// Summarize a simulation.
    pub fn new(simulation: &Simulation) -> Self {
        Self {
            initial_load: simulation.initial_state.clone(),
            filament_changes: simulation.filament_changes,
            manual_changes: simulation.events.len(),
            events: simulation.events.clone(),
            conflicts: merge_conflicts(&simulation.conflicts),
        }
    }

    /// Check if the job has order conflicts.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// The AMS load the pauses are planned against.
    pub fn initial_load_line(&self) -> String {
        format!(
            "The AMS is assumed to be loaded initially with the colors: {}",
            self.initial_load
        )
    }

    /// One line per manual change, in timeline order.
    pub fn transcript(&self) -> Vec<String> {
        self.events.iter().map(describe_event).collect()
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn describe_event(event: &ManualChangeEvent) -> String {
    let from = event
        .from
        .map(|c| c.to_string())
        .unwrap_or_else(|| "(empty)".into());
    format!(
        "Manual filament change required in layer {}: Swap color {} with {} in slot {}: {}",
        event.layer, from, event.to, event.slot, event.state
    )
}

/// Group conflicts by layer, then merge runs of adjacent layers whose pairs
/// are all already part of the open range.
fn merge_conflicts(conflicts: &[OrderConflict]) -> Vec<ConflictRange> {
    let mut by_layer: BTreeMap<u32, (u32, BTreeSet<(Color, Color)>)> = BTreeMap::new();
    for conflict in conflicts {
        let entry = by_layer
            .entry(conflict.last_layer)
            .or_insert((conflict.first_layer, BTreeSet::new()));
        entry.0 = entry.0.min(conflict.first_layer);
        entry.1.insert((conflict.from, conflict.to));
    }

    let mut ranges: Vec<ConflictRange> = Vec::new();
    let mut open: Option<ConflictRange> = None;
    for (layer, (first_layer, pairs)) in by_layer {
        if let Some(range) = open.as_mut() {
            if layer <= range.last_layer.saturating_add(1) && pairs.is_subset(&range.pairs) {
                range.last_layer = layer;
                continue;
            }
        }
        if let Some(range) = open.take() {
            ranges.push(range);
        }
        open = Some(ConflictRange {
            first_layer,
            last_layer: layer,
            pairs,
        });
    }
    ranges.extend(open);
    ranges
}

impl fmt::Display for Report {
    /// Plain-text report, as written to the report file.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.initial_load_line())?;
        for line in self.transcript() {
            writeln!(f, "{}", line)?;
        }
        if self.has_conflicts() {
            writeln!(
                f,
                "The print order has to be changed in the slicer, so that the following colors are not printed after each other:"
            )?;
            for range in &self.conflicts {
                writeln!(f, "{}", range)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Filament change times: {}", self.filament_changes)?;
        write!(f, "Manual filament change times: {}", self.manual_changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{ColorGroups, Share};
    use crate::simulate::Simulator;
    use crate::timeline::{Slot, Timeline};

    fn conflict(layer: u32, from: u32, to: u32) -> OrderConflict {
        OrderConflict {
            slot: Slot(2),
            from: Color(from),
            to: Color(to),
            from_index: 0,
            to_index: 1,
            first_layer: layer,
            last_layer: layer,
        }
    }

    #[test]
    fn test_merge_adjacent_layers() {
        let conflicts = vec![
            conflict(3, 2, 5),
            conflict(4, 2, 5),
            conflict(4, 2, 5),
            conflict(5, 2, 5),
            conflict(9, 2, 5),
            conflict(10, 3, 7),
        ];
        let ranges = merge_conflicts(&conflicts);
        assert_eq!(ranges.len(), 3);
        assert_eq!((ranges[0].first_layer, ranges[0].last_layer), (3, 5));
        assert_eq!(ranges[0].pairs.len(), 1);
        assert_eq!((ranges[1].first_layer, ranges[1].last_layer), (9, 9));
        assert_eq!(ranges[2].to_string(), "Layer 10 to 10: 3 -> 7");
    }

    #[test]
    fn test_merge_at_last_layer_number() {
        let conflicts = vec![conflict(u32::MAX - 1, 2, 5), conflict(u32::MAX, 2, 5)];
        let ranges = merge_conflicts(&conflicts);
        assert_eq!(ranges.len(), 1);
        assert_eq!(
            (ranges[0].first_layer, ranges[0].last_layer),
            (u32::MAX - 1, u32::MAX)
        );
    }

    #[test]
    fn test_new_pair_starts_new_range() {
        let conflicts = vec![conflict(3, 2, 5), conflict(4, 2, 5), conflict(4, 3, 7)];
        let ranges = merge_conflicts(&conflicts);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].to_string(), "Layer 4 to 4: 2 -> 5, 3 -> 7");
    }

    #[test]
    fn test_report_text() {
        let groups = ColorGroups::resolve(5, 4, &[Share::new(5, 2)]).unwrap();
        let timeline = Timeline::one_per_layer(&[1, 2, 3, 4, 1, 2, 5, 3, 4]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        let report = Report::new(&sim);

        assert!(!report.has_conflicts());
        assert_eq!(report.manual_changes, 1);
        assert_eq!(report.filament_changes, 8);
        assert_eq!(
            report.transcript(),
            vec![
                "Manual filament change required in layer 6: Swap color 2 with 5 in slot 2: [1, 5, 3, 4]"
                    .to_string()
            ]
        );
        let text = report.to_string();
        assert!(text.starts_with(
            "The AMS is assumed to be loaded initially with the colors: [1, 2, 3, 4]\n"
        ));
        assert!(text.ends_with("Filament change times: 8\nManual filament change times: 1"));
        assert!(!text.contains("print order has to be changed"));
    }

    #[test]
    fn test_initial_load_shows_empty_slot() {
        // Color 4 moved into slot 2, so slot 4 starts empty.
        let groups = ColorGroups::resolve(4, 4, &[Share::new(4, 2)]).unwrap();
        let timeline = Timeline::one_per_layer(&[1, 4, 2]);
        let report = Report::new(&Simulator::new(&groups).run(&timeline).unwrap());
        assert_eq!(
            report.initial_load_line(),
            "The AMS is assumed to be loaded initially with the colors: [1, 2, 3, -]"
        );
        assert_eq!(report.manual_changes, 2);
    }

    #[test]
    fn test_report_json() {
        let groups = ColorGroups::resolve(5, 4, &[Share::new(5, 2)]).unwrap();
        let timeline = Timeline::single_layer(2, &[1, 2, 5]);
        let report = Report::new(&Simulator::new(&groups).run(&timeline).unwrap());
        assert!(report.has_conflicts());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["manual_changes"], 0);
        assert_eq!(json["initial_load"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(json["conflicts"][0]["first_layer"], 2);
        assert_eq!(json["conflicts"][0]["pairs"][0], serde_json::json!([2, 5]));
    }
}
