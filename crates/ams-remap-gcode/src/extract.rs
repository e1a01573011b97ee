//! Color timeline extraction from sliced G-code.
//!
//! `M73 L<n>` starts layer `n`. `T<n>` loads slicer tool `n` (color `n + 1`).
//! `T255`, `T1000` and `T1100` are firmware housekeeping, not color requests.

use regex::Regex;
use tracing::debug;

use ams_remap::{Color, ColorRequest, Timeline};

use crate::error::{GcodeError, Result};

/// Tool numbers that do not select a filament.
const IGNORED_TOOLS: [u32; 3] = [255, 1000, 1100];

/// A job's timeline plus where each request sits in the G-code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTimeline {
    /// Color requests in print order.
    pub timeline: Timeline,
    /// Line index of each request's tool change command.
    pub lines: Vec<usize>,
}

impl JobTimeline {
    /// G-code line of the request at `index`.
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.lines.get(index).copied()
    }
}

/// Finds layer markers and tool changes in G-code lines.
#[derive(Debug, Clone)]
pub struct TimelineExtractor {
    layer: Regex,
    tool: Regex,
}

impl TimelineExtractor {
    /// Compile the line patterns.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| GcodeError::Pattern(e.to_string()));
        Ok(Self {
            layer: compile(r"^M73 L(\d+)")?,
            tool: compile(r"^T(\d+)\b")?,
        })
    }

    /// Layer number started by `line`, if it is a layer marker.
    fn layer_of(&self, line: &str) -> Option<u32> {
        self.layer.captures(line)?.get(1)?.as_str().parse().ok()
    }

    /// Tool selected by `line`, if it is a filament tool change.
    fn tool_of(&self, line: &str) -> Option<u32> {
        let tool: u32 = self.tool.captures(line)?.get(1)?.as_str().parse().ok()?;
        (!IGNORED_TOOLS.contains(&tool)).then_some(tool)
    }

    /// Scan the program and build its timeline.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Result<JobTimeline> {
        let mut layer = 0;
        let mut position = 0;
        let mut requests = Vec::new();
        let mut request_lines = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line = line.as_ref().trim_start();
            if let Some(next) = self.layer_of(line) {
                if next != layer {
                    layer = next;
                    position = 0;
                }
                continue;
            }
            if let Some(tool) = self.tool_of(line) {
                requests.push(ColorRequest::new(layer, position, Color::from_tool(tool)));
                request_lines.push(idx);
                position += 1;
            }
        }

        debug!(
            requests = requests.len(),
            last_layer = layer,
            "extracted color timeline"
        );
        Ok(JobTimeline {
            timeline: Timeline::new(requests)?,
            lines: request_lines,
        })
    }
}
