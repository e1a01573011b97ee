//! Colors, slots, and the ordered sequence of color requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RemapError, Result};

/// A slicer color identity (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    /// Color for a zero-based slicer tool number (`T0` is color 1).
    pub fn from_tool(tool: u32) -> Self {
        Self(tool + 1)
    }

    /// Zero-based slicer tool number.
    pub fn tool(self) -> u32 {
        self.0.saturating_sub(1)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical AMS slot identity (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u32);

impl Slot {
    /// Zero-based index into a slot table; `None` for `Slot(0)`.
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One "about to extrude color C" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRequest {
    /// Layer index.
    pub layer: u32,
    /// Position within the layer's local request sequence.
    pub position: u32,
    /// Requested color.
    pub color: Color,
}

impl ColorRequest {
    /// Create a new request.
    pub fn new(layer: u32, position: u32, color: Color) -> Self {
        Self {
            layer,
            position,
            color,
        }
    }
}

/// The ordered color requests of one print job.
///
/// Requests are kept exactly as given; construction only checks that
/// `(layer, position)` never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    requests: Vec<ColorRequest>,
}

impl Timeline {
    /// Build a timeline, rejecting requests that go back in print order.
    pub fn new(requests: Vec<ColorRequest>) -> Result<Self> {
        for (index, pair) in requests.windows(2).enumerate() {
            let (prev, next) = (pair[0], pair[1]);
            if (next.layer, next.position) < (prev.layer, prev.position) {
                return Err(RemapError::TimelineOutOfOrder {
                    index: index + 1,
                    layer: next.layer,
                    position: next.position,
                    prev_layer: prev.layer,
                    prev_position: prev.position,
                });
            }
        }
        Ok(Self { requests })
    }

    /// Build a timeline from a flat color list, one layer per request.
    pub fn one_per_layer(colors: &[u32]) -> Self {
        let requests = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| ColorRequest::new(i as u32, 0, Color(c)))
            .collect();
        Self { requests }
    }

    /// Build a single-layer timeline from a flat color list.
    pub fn single_layer(layer: u32, colors: &[u32]) -> Self {
        let requests = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| ColorRequest::new(layer, i as u32, Color(c)))
            .collect();
        Self { requests }
    }

    /// All requests in print order.
    pub fn requests(&self) -> &[ColorRequest] {
        &self.requests
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if the timeline has no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Highest color requested, if any.
    pub fn max_color(&self) -> Option<Color> {
        self.requests.iter().map(|r| r.color).max()
    }

    /// Number of filament changes: requests whose color differs from the one before.
    pub fn filament_changes(&self) -> usize {
        self.requests
            .windows(2)
            .filter(|pair| pair[0].color != pair[1].color)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_rejected() {
        let requests = vec![
            ColorRequest::new(2, 0, Color(1)),
            ColorRequest::new(1, 3, Color(2)),
        ];
        let err = Timeline::new(requests).unwrap_err();
        assert!(matches!(
            err,
            RemapError::TimelineOutOfOrder { index: 1, layer: 1, prev_layer: 2, .. }
        ));
    }

    #[test]
    fn test_same_position_allowed() {
        let requests = vec![
            ColorRequest::new(0, 0, Color(1)),
            ColorRequest::new(0, 0, Color(1)),
            ColorRequest::new(0, 1, Color(2)),
        ];
        assert_eq!(Timeline::new(requests).unwrap().len(), 3);
    }

    #[test]
    fn test_filament_changes() {
        let timeline = Timeline::single_layer(0, &[1, 1, 2, 3, 3, 1]);
        assert_eq!(timeline.filament_changes(), 3);
        assert_eq!(Timeline::default().filament_changes(), 0);
    }

    #[test]
    fn test_tool_numbers() {
        assert_eq!(Color::from_tool(0), Color(1));
        assert_eq!(Color(5).tool(), 4);
        assert_eq!(Slot(3).index(), Some(2));
        assert_eq!(Slot(0).index(), None);
    }
}
