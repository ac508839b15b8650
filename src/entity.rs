//! Placed entities and the obstacle arena they accumulate in

use log::debug;

use crate::calculator::NodeId;
use crate::config::Footprint;
use crate::geometry::{Point, Rect, Rotation, Side, port_position};

/// Stable entity handle, assigned in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Machine { kind: String, input_slots: usize },
    /// `outputs` counts the branches attached so far
    Splitter { outputs: usize },
    Merger { inputs: usize },
}

impl EntityKind {
    /// Number of input ports
    pub fn input_slots(&self) -> usize {
        match self {
            EntityKind::Machine { input_slots, .. } => (*input_slots).max(1),
            EntityKind::Splitter { .. } => 1,
            EntityKind::Merger { inputs } => (*inputs).max(1),
        }
    }

    /// Number of output ports
    pub fn output_slots(&self) -> usize {
        match self {
            EntityKind::Machine { .. } | EntityKind::Merger { .. } => 1,
            EntityKind::Splitter { outputs } => (*outputs).max(1),
        }
    }

    pub fn is_junction(&self) -> bool {
        matches!(self, EntityKind::Splitter { .. } | EntityKind::Merger { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            EntityKind::Machine { kind, .. } => kind,
            EntityKind::Splitter { .. } => "Splitter",
            EntityKind::Merger { .. } => "Merger",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Top-left corner
    pub position: Point,
    pub rotation: Rotation,
    pub width: f64,
    pub height: f64,
    /// Demand node this machine instantiates; junctions have none
    pub demand: Option<NodeId>,
    /// The free-position search found nothing and the entity may overlap others
    pub degraded: bool,
}

impl PlacedEntity {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.width, self.height)
    }

    pub fn port(&self, side: Side, slot: usize) -> Point {
        let slots = match side {
            Side::Input => self.kind.input_slots(),
            Side::Output => self.kind.output_slots(),
        };
        port_position(&self.rect(), self.rotation, side, slot, slots)
    }
}

/// Every entity placed during one planning run.
///
/// Doubles as the obstacle set: later placements and routes see everything
/// placed before them.
#[derive(Debug, Default, Clone)]
pub struct EntityArena {
    entities: Vec<PlacedEntity>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        kind: EntityKind,
        position: Point,
        rotation: Rotation,
        footprint: Footprint,
        demand: Option<NodeId>,
        degraded: bool,
    ) -> EntityId {
        let id = EntityId(self.entities.len());
        debug!(
            "placed {} #{} at ({:.1}, {:.1}){}",
            kind.label(),
            id.0,
            position.x,
            position.y,
            if degraded { " (overlapping)" } else { "" }
        );
        self.entities.push(PlacedEntity {
            id,
            kind,
            position,
            rotation,
            width: footprint.width,
            height: footprint.height,
            demand,
            degraded,
        });
        id
    }

    pub fn get(&self, id: EntityId) -> &PlacedEntity {
        &self.entities[id.0]
    }

    /// Attach one more branch to a junction and return its slot.
    ///
    /// Ports on the branching side are spread over every attached branch,
    /// so slots handed out earlier shift as more are attached.
    pub fn attach_branch(&mut self, id: EntityId) -> usize {
        match &mut self.entities[id.0].kind {
            EntityKind::Splitter { outputs: count } | EntityKind::Merger { inputs: count } => {
                let slot = *count;
                *count += 1;
                slot
            }
            EntityKind::Machine { .. } => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedEntity> {
        self.entities.iter()
    }

    /// Machines instantiating `node`, in placement order
    pub fn instances_of(&self, node: NodeId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.demand == Some(node))
            .map(|e| e.id)
            .collect()
    }

    /// Margin-expanded rectangles of every entity
    pub fn obstacles(&self, margin: f64) -> Vec<Rect> {
        self.entities.iter().map(|e| e.rect().expand(margin)).collect()
    }

    /// Bounding box of all entities, `None` when empty
    pub fn bounds(&self) -> Option<Rect> {
        self.entities
            .iter()
            .map(PlacedEntity::rect)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Whether a footprint at `position` keeps its clearance from everything placed
    pub fn is_free(&self, position: Point, footprint: Footprint, margin: f64) -> bool {
        let candidate =
            Rect::new(position.x, position.y, footprint.width, footprint.height).expand(margin);
        self.entities
            .iter()
            .all(|e| !e.rect().expand(margin).overlaps(&candidate))
    }

    /// Nearest collision-free position to `intended`.
    ///
    /// Probes the eight compass offsets on rings of growing radius. Returns
    /// the position and whether it is free; when nothing within `radius` is
    /// free the intended position comes back unchanged.
    pub fn find_free_position(
        &self,
        intended: Point,
        footprint: Footprint,
        margin: f64,
        step: f64,
        radius: f64,
    ) -> (Point, bool) {
        if self.is_free(intended, footprint, margin) {
            return (intended, true);
        }
        if step <= 0.0 {
            return (intended, false);
        }

        const COMPASS: [(f64, f64); 8] = [
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (-1.0, 1.0),
            (-1.0, 0.0),
            (-1.0, -1.0),
            (0.0, -1.0),
            (1.0, -1.0),
        ];

        let mut r = step;
        while r <= radius {
            for (dx, dy) in COMPASS {
                let candidate = intended.offset(dx * r, dy * r);
                if self.is_free(candidate, footprint, margin) {
                    return (candidate, true);
                }
            }
            r += step;
        }
        (intended, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Footprint {
        Footprint::new(4.0, 4.0)
    }

    #[test]
    fn slot_table() {
        let machine = EntityKind::Machine {
            kind: "Assembler".into(),
            input_slots: 2,
        };
        assert_eq!((machine.input_slots(), machine.output_slots()), (2, 1));
        let splitter = EntityKind::Splitter { outputs: 5 };
        assert_eq!((splitter.input_slots(), splitter.output_slots()), (1, 5));
        let merger = EntityKind::Merger { inputs: 4 };
        assert_eq!((merger.input_slots(), merger.output_slots()), (4, 1));
        assert_eq!(EntityKind::Splitter { outputs: 0 }.output_slots(), 1);
        let raw = EntityKind::Machine {
            kind: "Miner".into(),
            input_slots: 0,
        };
        assert_eq!(raw.input_slots(), 1);
    }

    #[test]
    fn free_position_moves_off_occupied_spot() {
        let mut arena = EntityArena::new();
        arena.insert(
            EntityKind::Splitter { outputs: 0 },
            Point::new(0.0, 0.0),
            Rotation::None,
            block(),
            None,
            false,
        );
        let (pos, found) =
            arena.find_free_position(Point::new(0.0, 0.0), block(), 1.0, 1.0, 20.0);
        assert!(found);
        assert_ne!(pos, Point::new(0.0, 0.0));
        assert!(arena.is_free(pos, block(), 1.0));
    }

    #[test]
    fn exhausted_search_keeps_intended() {
        let mut arena = EntityArena::new();
        arena.insert(
            EntityKind::Merger { inputs: 0 },
            Point::new(0.0, 0.0),
            Rotation::None,
            Footprint::new(100.0, 100.0),
            None,
            false,
        );
        let intended = Point::new(40.0, 40.0);
        let (pos, found) = arena.find_free_position(intended, block(), 1.0, 1.0, 5.0);
        assert!(!found);
        assert_eq!(pos, intended);
    }

    #[test]
    fn bounds_cover_everything() {
        let mut arena = EntityArena::new();
        assert!(arena.bounds().is_none());
        for (kind, x, y) in [
            (EntityKind::Splitter { outputs: 0 }, 0.0, 0.0),
            (EntityKind::Merger { inputs: 0 }, 10.0, -6.0),
        ] {
            arena.insert(kind, Point::new(x, y), Rotation::None, block(), None, false);
        }
        assert_eq!(arena.bounds(), Some(Rect::new(0.0, -6.0, 14.0, 10.0)));
    }

    #[test]
    fn attached_branches_get_distinct_ports() {
        let mut arena = EntityArena::new();
        let splitter = arena.insert(
            EntityKind::Splitter { outputs: 0 },
            Point::new(0.0, 0.0),
            Rotation::None,
            Footprint::new(4.0, 4.0),
            None,
            false,
        );
        let slots: Vec<usize> = (0..5).map(|_| arena.attach_branch(splitter)).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
        assert_eq!(arena.get(splitter).kind, EntityKind::Splitter { outputs: 5 });

        let ports: Vec<Point> = slots
            .iter()
            .map(|&slot| arena.get(splitter).port(Side::Output, slot))
            .collect();
        for (i, a) in ports.iter().enumerate() {
            assert_eq!(a.x, 4.0);
            for b in &ports[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!((ports[0].y - 0.4).abs() < 1e-9);
    }
}
