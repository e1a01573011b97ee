//! Pause insertion.

use std::collections::BTreeMap;

use ams_remap::{PausePlan, PausePoint};
use tracing::debug;

use crate::error::{GcodeError, Result};
use crate::extract::JobTimeline;
use crate::flavor::GcodeFlavor;
use crate::text::GcodeText;

/// Comment written above every inserted pause.
pub fn pause_comment(point: &PausePoint) -> String {
    match point.unload {
        Some(unload) => format!(
            "; ams-remap: manual filament change in slot {}: unload color {}, load color {}",
            point.slot, unload, point.load
        ),
        None => format!(
            "; ams-remap: manual filament change in slot {}: load color {}",
            point.slot, point.load
        ),
    }
}

/// Insert a pause right before the tool change of every plan entry.
///
/// Every other line is kept as is. Fails if a pause does not correspond to an
/// extracted tool change.
pub fn insert_pauses(
    gcode: &GcodeText,
    job: &JobTimeline,
    plan: &PausePlan,
    flavor: GcodeFlavor,
) -> Result<GcodeText> {
    let mut by_line: BTreeMap<usize, Vec<&PausePoint>> = BTreeMap::new();
    for point in plan.points() {
        let line = job.line_of(point.index).ok_or(GcodeError::PauseOutOfRange {
            index: point.index,
            requests: job.lines.len(),
        })?;
        by_line.entry(line).or_default().push(point);
    }

    let mut lines = Vec::with_capacity(gcode.lines.len() + plan.len() * 2);
    for (idx, line) in gcode.lines.iter().enumerate() {
        if let Some(points) = by_line.get(&idx) {
            for point in points {
                debug!(line = idx, layer = point.layer, "inserting pause");
                lines.push(pause_comment(point));
                lines.push(flavor.pause_gcode().to_string());
            }
        }
        lines.push(line.clone());
    }

    Ok(gcode.with_lines(lines))
}
