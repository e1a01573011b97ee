//! Pause insertion points for the gcode rewriter.

use serde::Serialize;

use crate::simulate::ManualChangeEvent;
use crate::timeline::{Color, Slot};

/// Where to pause, and what to load when the printer stops there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PausePoint {
    /// Global timeline index of the request to pause before.
    pub index: usize,
    /// Layer of the request.
    pub layer: u32,
    /// Position of the request within the layer.
    pub position: u32,
    /// Slot to reload.
    pub slot: Slot,
    /// Color to take out.
    pub unload: Option<Color>,
    /// Color to put in.
    pub load: Color,
}

/// Ordered pause insertion points, one per manual change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PausePlan {
    points: Vec<PausePoint>,
}

impl PausePlan {
    /// Project manual change events onto pause points, keeping their order.
    pub fn from_events(events: &[ManualChangeEvent]) -> Self {
        let points = events
            .iter()
            .map(|e| PausePoint {
                index: e.index,
                layer: e.layer,
                position: e.position,
                slot: e.slot,
                unload: e.from,
                load: e.to,
            })
            .collect();
        Self { points }
    }

    /// Pause points in timeline order.
    pub fn points(&self) -> &[PausePoint] {
        &self.points
    }

    /// Number of pauses.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the plan has no pauses.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pause points on one layer.
    pub fn on_layer(&self, layer: u32) -> impl Iterator<Item = &PausePoint> {
        self.points.iter().filter(move |p| p.layer == layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{ColorGroups, Share};
    use crate::simulate::Simulator;
    use crate::timeline::Timeline;

    #[test]
    fn test_same_layer_order_kept() {
        let groups = ColorGroups::resolve(6, 4, &[Share::new(5, 2), Share::new(6, 3)]).unwrap();
        let timeline = Timeline::single_layer(4, &[1, 5, 1, 6, 4, 2]);
        let sim = Simulator::new(&groups).run(&timeline).unwrap();
        assert!(sim.conflicts.is_empty());

        let plan = PausePlan::from_events(&sim.events);
        let points: Vec<(u32, u32, Color)> = plan
            .on_layer(4)
            .map(|p| (p.layer, p.position, p.load))
            .collect();
        assert_eq!(
            points,
            vec![(4, 1, Color(5)), (4, 3, Color(6)), (4, 5, Color(2))]
        );
        assert_eq!(plan.on_layer(3).count(), 0);
    }

    #[test]
    fn test_empty_plan() {
        let plan = PausePlan::from_events(&[]);
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
