//! Tunable planning parameters

use std::collections::HashMap;

use crate::error::PlanError;

/// Width and height of an entity footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Footprint {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Planning parameters. All distances are in world units.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Cell size of the routing grid
    pub grid_cell: f64,
    /// Clearance kept around every entity
    pub clearance_margin: f64,
    /// Radius around route endpoints that is passable even inside obstacles
    pub port_tolerance: f64,
    /// Distance between bus corridor probes
    pub bus_spacing: f64,
    pub bus_max_probes: usize,
    /// Extra cost per step against the flow direction
    pub against_flow_penalty: f64,
    /// Extra cost per step perpendicular to the flow direction
    pub perpendicular_penalty: f64,
    /// Extra cost for changing direction
    pub turn_penalty: f64,
    /// Size of one foundation module
    pub module_size: f64,
    /// Rows wrap after this many modules
    pub max_row_modules: f64,
    pub row_spacing: f64,
    pub layer_spacing: f64,
    /// Ring step of the free-position search
    pub free_search_step: f64,
    /// Largest ring radius of the free-position search
    pub free_search_radius: f64,
    /// Node expansions before the grid search gives up
    pub max_search_steps: usize,
    /// Empty cells added around the routing window
    pub search_padding_cells: i64,
    /// Ascending belt capacities, items per minute
    pub tier_capacities: Vec<f64>,
    pub junction_size: Footprint,
    /// Space between a junction and the entity it serves
    pub junction_gap: f64,
    /// Route long links through per-item bus corridors
    pub use_bus: bool,
    pub machine_footprints: HashMap<String, Footprint>,
    pub default_footprint: Footprint,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let machine_footprints = [
            ("Smelter", Footprint::new(6.0, 9.0)),
            ("Constructor", Footprint::new(8.0, 10.0)),
            ("Assembler", Footprint::new(10.0, 15.0)),
            ("Foundry", Footprint::new(10.0, 9.0)),
            ("Manufacturer", Footprint::new(18.0, 20.0)),
            ("Refinery", Footprint::new(10.0, 20.0)),
            ("Blender", Footprint::new(18.0, 16.0)),
            ("Packager", Footprint::new(8.0, 8.0)),
        ]
        .into_iter()
        .map(|(name, fp)| (name.to_string(), fp))
        .collect();

        Self {
            grid_cell: 2.0,
            clearance_margin: 2.0,
            port_tolerance: 2.5,
            bus_spacing: 4.0,
            bus_max_probes: 64,
            against_flow_penalty: 50.0,
            perpendicular_penalty: 0.1,
            turn_penalty: 5.0,
            module_size: 8.0,
            max_row_modules: 10.0,
            row_spacing: 4.0,
            layer_spacing: 24.0,
            free_search_step: 2.0,
            free_search_radius: 64.0,
            max_search_steps: 200_000,
            search_padding_cells: 8,
            tier_capacities: vec![60.0, 120.0, 270.0, 480.0, 780.0],
            junction_size: Footprint::new(4.0, 4.0),
            junction_gap: 4.0,
            use_bus: true,
            machine_footprints,
            default_footprint: Footprint::new(8.0, 8.0),
        }
    }
}

impl PlannerConfig {
    /// Rows of machines inside a layer wrap once they grow past this length
    pub fn max_row_width(&self) -> f64 {
        self.module_size * self.max_row_modules
    }

    pub fn footprint_for(&self, machine: &str) -> Footprint {
        self.machine_footprints
            .get(machine)
            .copied()
            .unwrap_or(self.default_footprint)
    }

    /// Reject settings the grid, placement and tier stages cannot work with
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |msg: String| Err(PlanError::InvalidConfig(msg));

        for (name, value) in [
            ("grid_cell", self.grid_cell),
            ("free_search_step", self.free_search_step),
            ("module_size", self.module_size),
            ("max_row_modules", self.max_row_modules),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{} must be a positive number, got {}", name, value));
            }
        }
        for (name, value) in [
            ("clearance_margin", self.clearance_margin),
            ("bus_spacing", self.bus_spacing),
            ("port_tolerance", self.port_tolerance),
            ("free_search_radius", self.free_search_radius),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{} must not be negative, got {}", name, value));
            }
        }
        if self.search_padding_cells < 0 {
            return invalid(format!(
                "search_padding_cells must not be negative, got {}",
                self.search_padding_cells
            ));
        }

        if self.tier_capacities.is_empty() {
            return invalid("tier_capacities is empty".to_string());
        }
        if self.tier_capacities.iter().any(|cap| !(cap.is_finite() && *cap > 0.0))
            || self.tier_capacities.windows(2).any(|w| w[0] > w[1])
        {
            return invalid(format!(
                "tier_capacities must be positive and ascending, got {:?}",
                self.tier_capacities
            ));
        }
        Ok(())
    }
}
