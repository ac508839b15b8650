//! Per-item bus corridors

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::config::PlannerConfig;
use crate::geometry::Rect;

/// Hands out one horizontal corridor per item and remembers it for the run.
#[derive(Debug, Default, Clone)]
pub struct LaneAssigner {
    lanes: BTreeMap<String, f64>,
}

impl LaneAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corridor `y` for `item`.
    ///
    /// The first call for an item probes downwards from just below the
    /// obstacles' bounding box in `bus_spacing` steps until the band spanning
    /// `x_range` clears every obstacle and every other item's lane. Later
    /// calls return the same value. `obstacles` are margin-expanded.
    pub fn lane_for(
        &mut self,
        item: &str,
        obstacles: &[Rect],
        x_range: (f64, f64),
        config: &PlannerConfig,
    ) -> f64 {
        if let Some(&y) = self.lanes.get(item) {
            return y;
        }

        let spacing = config.bus_spacing;
        let baseline = obstacles
            .iter()
            .copied()
            .reduce(|acc, r| acc.union(&r))
            .map(|bounds| bounds.bottom() + spacing)
            .unwrap_or(0.0);

        let (x0, x1) = if x_range.0 <= x_range.1 {
            x_range
        } else {
            (x_range.1, x_range.0)
        };

        let lane = (0..config.bus_max_probes)
            .map(|k| baseline + k as f64 * spacing)
            .find(|&y| {
                let band = Rect::new(x0, y - spacing / 4.0, x1 - x0, spacing / 2.0);
                obstacles.iter().all(|o| !o.overlaps(&band))
                    && self.lanes.values().all(|&other| (other - y).abs() >= spacing - 1e-9)
            })
            .unwrap_or_else(|| {
                warn!("no clear corridor for {}, sharing y = {:.1}", item, baseline);
                baseline
            });

        debug!("bus for {} at y = {:.1}", item, lane);
        self.lanes.insert(item.to_string(), lane);
        lane
    }

    /// Every assignment so far, ordered by item name
    pub fn lanes(&self) -> &BTreeMap<String, f64> {
        &self.lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_item_same_lane() {
        let config = PlannerConfig::default();
        let mut lanes = LaneAssigner::new();
        let obstacles = vec![Rect::new(0.0, 0.0, 10.0, 10.0)];

        let first = lanes.lane_for("Iron Plate", &obstacles, (0.0, 40.0), &config);
        let more = vec![Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(0.0, 10.0, 30.0, 30.0)];
        let second = lanes.lane_for("Iron Plate", &more, (-5.0, 90.0), &config);
        assert_eq!(first, second);
        assert_eq!(lanes.lanes().len(), 1);
    }

    #[test]
    fn lanes_clear_obstacles_and_each_other() {
        let config = PlannerConfig::default();
        let mut lanes = LaneAssigner::new();
        let obstacles = vec![Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(20.0, 5.0, 10.0, 20.0)];

        let a = lanes.lane_for("Rod", &obstacles, (0.0, 30.0), &config);
        let b = lanes.lane_for("Screw", &obstacles, (30.0, 0.0), &config);
        assert_eq!(a, 25.0 + config.bus_spacing);
        assert!((a - b).abs() >= config.bus_spacing);
        for o in &obstacles {
            assert!(o.bottom() < a && o.bottom() < b);
        }
    }

    #[test]
    fn no_probes_returns_baseline() {
        let config = PlannerConfig {
            bus_max_probes: 0,
            ..PlannerConfig::default()
        };
        let mut lanes = LaneAssigner::new();
        let obstacles = vec![Rect::new(0.0, 0.0, 10.0, 10.0)];
        assert_eq!(lanes.lane_for("Rod", &obstacles, (0.0, 10.0), &config), 14.0);
        assert_eq!(lanes.lane_for("Wire", &obstacles, (0.0, 10.0), &config), 14.0);
    }
}
