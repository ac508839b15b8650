//! Machine placement by demand-tree depth.
//!
//! Each depth of the demand tree becomes one layer. Layers are laid out
//! left to right starting with the deepest (raw-material side), so items
//! flow east towards the target. Inside a layer the machines stack
//! downwards and wrap into a new row once the row grows past the configured
//! width.

use log::{info, warn};

use crate::calculator::{DemandTree, NodeId};
use crate::config::PlannerConfig;
use crate::entity::{EntityArena, EntityId, EntityKind};
use crate::geometry::{Point, Rotation};

/// Group demand nodes by the deepest level at which they appear.
///
/// Index 0 holds the root; nodes inside a layer keep depth-first order.
pub fn layers(tree: &DemandTree) -> Vec<Vec<NodeId>> {
    let mut depth_of: Vec<Option<usize>> = vec![None; tree.len()];
    let mut order = Vec::with_capacity(tree.len());
    record_depths(tree, tree.root(), 0, &mut depth_of, &mut order);

    let deepest = depth_of.iter().flatten().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::new(); deepest + 1];
    for id in order {
        if let Some(depth) = depth_of[id.0] {
            layers[depth].push(id);
        }
    }
    layers
}

fn record_depths(
    tree: &DemandTree,
    id: NodeId,
    depth: usize,
    depth_of: &mut [Option<usize>],
    order: &mut Vec<NodeId>,
) {
    match depth_of[id.0] {
        Some(seen) if seen >= depth => {}
        Some(_) => depth_of[id.0] = Some(depth),
        None => {
            depth_of[id.0] = Some(depth);
            order.push(id);
        }
    }
    for input in &tree.node(id).inputs {
        if let Some(child) = input.upstream {
            record_depths(tree, child, depth + 1, depth_of, order);
        }
    }
}

/// Place one machine per rounded-up machine count of every demand node.
///
/// Placements go into `arena` and avoid everything already in it, including
/// machines placed earlier in this call. Returns the new entity ids in
/// placement order.
pub fn layout(
    tree: &DemandTree,
    origin: Point,
    config: &PlannerConfig,
    arena: &mut EntityArena,
) -> Vec<EntityId> {
    let max_row_width = config.max_row_width();
    let mut placed = Vec::new();
    let mut cursor_x = origin.x;

    for layer in layers(tree).iter().rev() {
        let mut row_x = cursor_x;
        let mut y = origin.y;
        let mut row_width: f64 = 0.0;
        let mut layer_right = cursor_x;

        for &id in layer {
            let node = tree.node(id);
            let footprint = config.footprint_for(&node.machine);

            for _ in 0..node.machine_instances() {
                if y > origin.y && (y - origin.y) + footprint.height > max_row_width {
                    row_x += row_width + config.row_spacing;
                    y = origin.y;
                    row_width = 0.0;
                }

                let intended = Point::new(row_x, y);
                let (position, found) = arena.find_free_position(
                    intended,
                    footprint,
                    config.clearance_margin,
                    config.free_search_step,
                    config.free_search_radius,
                );
                if !found {
                    warn!(
                        "no free spot for {} near ({:.1}, {:.1}), placing with overlap",
                        node.machine, intended.x, intended.y
                    );
                }

                let entity = arena.insert(
                    EntityKind::Machine {
                        kind: node.machine.clone(),
                        input_slots: node.inputs.len(),
                    },
                    position,
                    Rotation::None,
                    footprint,
                    Some(id),
                    !found,
                );
                placed.push(entity);

                y += footprint.height + config.row_spacing;
                row_width = row_width.max(footprint.width);
                layer_right = layer_right.max(position.x + footprint.width);
            }
        }

        cursor_x = layer_right + config.layer_spacing;
    }

    info!("placed {} machines", placed.len());
    placed
}
