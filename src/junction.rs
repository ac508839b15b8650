//! Splitter and merger insertion between machine groups.
//!
//! When the number of producing and consuming machines for an edge differ,
//! the flow fans out through a splitter next to each producer and fans in
//! through a merger next to each consumer. Each machine gets at most one
//! junction of each kind per run, shared by every edge touching it.

use std::collections::HashMap;

use log::{info, warn};

use crate::config::PlannerConfig;
use crate::edges::Edge;
use crate::entity::{EntityArena, EntityId, EntityKind, PlacedEntity};
use crate::geometry::{Direction, Point, Side};

/// A belt to be routed between two entity ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub item: String,
    pub rate: f64,
    pub from: EntityId,
    pub from_slot: usize,
    pub to: EntityId,
    pub to_slot: usize,
    /// Runs between layers rather than into a machine's own junction
    pub trunk: bool,
}

impl Connection {
    pub fn start(&self, arena: &EntityArena) -> Point {
        arena.get(self.from).port(Side::Output, self.from_slot)
    }

    pub fn end(&self, arena: &EntityArena) -> Point {
        arena.get(self.to).port(Side::Input, self.to_slot)
    }
}

/// Even share of `total` over `parts` branches
pub fn branch_rate(total: f64, parts: usize) -> f64 {
    total / parts.max(1) as f64
}

#[derive(Debug, Default)]
pub struct JunctionPlanner {
    splitters: HashMap<EntityId, EntityId>,
    mergers: HashMap<EntityId, EntityId>,
    junctions: Vec<EntityId>,
}

impl JunctionPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn every edge into connections, placing junctions into `arena`
    /// as needed. Edges are processed in order, and each junction avoids
    /// everything placed before it.
    pub fn plan(
        &mut self,
        edges: &[Edge],
        arena: &mut EntityArena,
        config: &PlannerConfig,
    ) -> Vec<Connection> {
        let mut connections = Vec::new();

        for edge in edges {
            let producers = arena.instances_of(edge.producer);
            let consumers = arena.instances_of(edge.consumer);
            if producers.is_empty() || consumers.is_empty() {
                warn!("edge for {} has no placed machines on one side", edge.item);
                continue;
            }

            let (n, m) = (producers.len(), consumers.len());
            match (n, m) {
                (1, 1) => connections.push(Connection {
                    item: edge.item.clone(),
                    rate: edge.rate,
                    from: producers[0],
                    from_slot: 0,
                    to: consumers[0],
                    to_slot: edge.slot,
                    trunk: true,
                }),
                (1, m) => {
                    let splitter = self.splitter_for(producers[0], arena, config);
                    connections.push(stub_into_splitter(edge, producers[0], splitter, edge.rate));
                    for &consumer in &consumers {
                        let slot = arena.attach_branch(splitter);
                        connections.push(Connection {
                            item: edge.item.clone(),
                            rate: branch_rate(edge.rate, m),
                            from: splitter,
                            from_slot: slot,
                            to: consumer,
                            to_slot: edge.slot,
                            trunk: true,
                        });
                    }
                }
                (n, 1) => {
                    let merger = self.merger_for(consumers[0], arena, config);
                    for &producer in &producers {
                        let slot = arena.attach_branch(merger);
                        connections.push(Connection {
                            item: edge.item.clone(),
                            rate: branch_rate(edge.rate, n),
                            from: producer,
                            from_slot: 0,
                            to: merger,
                            to_slot: slot,
                            trunk: true,
                        });
                    }
                    connections.push(stub_from_merger(edge, merger, consumers[0], edge.rate));
                }
                (n, m) => {
                    let splitters: Vec<EntityId> = producers
                        .iter()
                        .map(|&p| self.splitter_for(p, arena, config))
                        .collect();
                    let mergers: Vec<EntityId> = consumers
                        .iter()
                        .map(|&c| self.merger_for(c, arena, config))
                        .collect();

                    for (&producer, &splitter) in producers.iter().zip(&splitters) {
                        connections.push(stub_into_splitter(
                            edge,
                            producer,
                            splitter,
                            branch_rate(edge.rate, n),
                        ));
                    }
                    for &splitter in &splitters {
                        for &merger in &mergers {
                            let from_slot = arena.attach_branch(splitter);
                            let to_slot = arena.attach_branch(merger);
                            connections.push(Connection {
                                item: edge.item.clone(),
                                rate: branch_rate(edge.rate, n * m),
                                from: splitter,
                                from_slot,
                                to: merger,
                                to_slot,
                                trunk: true,
                            });
                        }
                    }
                    for (&consumer, &merger) in consumers.iter().zip(&mergers) {
                        connections.push(stub_from_merger(
                            edge,
                            merger,
                            consumer,
                            branch_rate(edge.rate, m),
                        ));
                    }
                }
            }
        }

        info!(
            "{} edges -> {} connections, {} junctions",
            edges.len(),
            connections.len(),
            self.junctions.len()
        );
        connections
    }

    /// Junctions placed so far, in placement order
    pub fn junctions(&self) -> &[EntityId] {
        &self.junctions
    }

    fn splitter_for(
        &mut self,
        owner: EntityId,
        arena: &mut EntityArena,
        config: &PlannerConfig,
    ) -> EntityId {
        if let Some(&existing) = self.splitters.get(&owner) {
            return existing;
        }
        let id = self.place_junction(EntityKind::Splitter { outputs: 0 }, owner, arena, config);
        self.splitters.insert(owner, id);
        id
    }

    fn merger_for(
        &mut self,
        owner: EntityId,
        arena: &mut EntityArena,
        config: &PlannerConfig,
    ) -> EntityId {
        if let Some(&existing) = self.mergers.get(&owner) {
            return existing;
        }
        let id = self.place_junction(EntityKind::Merger { inputs: 0 }, owner, arena, config);
        self.mergers.insert(owner, id);
        id
    }

    fn place_junction(
        &mut self,
        kind: EntityKind,
        owner: EntityId,
        arena: &mut EntityArena,
        config: &PlannerConfig,
    ) -> EntityId {
        let owner = arena.get(owner);
        let facing = match kind {
            EntityKind::Merger { .. } => owner.rotation.input_direction(),
            _ => owner.rotation.output_direction(),
        };
        let rotation = owner.rotation;
        let intended = adjacent_position(owner, facing, config);

        let (position, found) = arena.find_free_position(
            intended,
            config.junction_size,
            config.clearance_margin,
            config.free_search_step,
            config.free_search_radius,
        );
        if !found {
            warn!(
                "no free spot for {} near ({:.1}, {:.1}), placing with overlap",
                kind.label(),
                intended.x,
                intended.y
            );
        }

        let id = arena.insert(kind, position, rotation, config.junction_size, None, !found);
        self.junctions.push(id);
        id
    }
}

fn stub_into_splitter(
    edge: &Edge,
    producer: EntityId,
    splitter: EntityId,
    rate: f64,
) -> Connection {
    Connection {
        item: edge.item.clone(),
        rate,
        from: producer,
        from_slot: 0,
        to: splitter,
        to_slot: 0,
        trunk: false,
    }
}

fn stub_from_merger(
    edge: &Edge,
    merger: EntityId,
    consumer: EntityId,
    rate: f64,
) -> Connection {
    Connection {
        item: edge.item.clone(),
        rate,
        from: merger,
        from_slot: 0,
        to: consumer,
        to_slot: edge.slot,
        trunk: false,
    }
}

/// Top-left corner for a junction centred on `owner`'s side facing `facing`,
/// `junction_gap` away from it.
fn adjacent_position(owner: &PlacedEntity, facing: Direction, config: &PlannerConfig) -> Point {
    let rect = owner.rect();
    let center = rect.center();
    let size = config.junction_size;
    let gap = config.junction_gap;
    match facing {
        Direction::East => Point::new(rect.right() + gap, center.y - size.height / 2.0),
        Direction::West => Point::new(rect.x - gap - size.width, center.y - size.height / 2.0),
        Direction::South => Point::new(center.x - size.width / 2.0, rect.bottom() + gap),
        Direction::North => Point::new(center.x - size.width / 2.0, rect.y - gap - size.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::NodeId;
    use crate::config::Footprint;
    use crate::geometry::Rotation;
    use proptest::prelude::*;

    const PRODUCER: NodeId = NodeId(1);
    const CONSUMER: NodeId = NodeId(0);

    fn machine(arena: &mut EntityArena, node: NodeId, x: f64, y: f64) -> EntityId {
        arena.insert(
            EntityKind::Machine {
                kind: "Constructor".into(),
                input_slots: 1,
            },
            Point::new(x, y),
            Rotation::None,
            Footprint::new(8.0, 10.0),
            Some(node),
            false,
        )
    }

    fn setup(producers: usize, consumers: usize) -> EntityArena {
        let mut arena = EntityArena::new();
        for i in 0..producers {
            machine(&mut arena, PRODUCER, 0.0, i as f64 * 14.0);
        }
        for i in 0..consumers {
            machine(&mut arena, CONSUMER, 40.0, i as f64 * 14.0);
        }
        arena
    }

    fn edge(rate: f64) -> Edge {
        Edge {
            producer: PRODUCER,
            consumer: CONSUMER,
            slot: 0,
            item: "Rod".into(),
            rate,
        }
    }

    fn kinds(arena: &EntityArena) -> (usize, usize) {
        let splitters = arena
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Splitter { .. }))
            .count();
        let mergers = arena
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Merger { .. }))
            .count();
        (splitters, mergers)
    }

    /// Sum of rates arriving at the consumers' own input ports
    fn delivered(connections: &[Connection], arena: &EntityArena) -> f64 {
        connections
            .iter()
            .filter(|c| arena.get(c.to).demand == Some(CONSUMER))
            .map(|c| c.rate)
            .sum()
    }

    #[test]
    fn one_to_one_is_direct() {
        let mut arena = setup(1, 1);
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(30.0)], &mut arena, &PlannerConfig::default());

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].rate, 30.0);
        assert!(planner.junctions().is_empty());
    }

    #[test]
    fn fan_out_splits_evenly() {
        let mut arena = setup(1, 3);
        let config = PlannerConfig::default();
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(45.0)], &mut arena, &config);

        assert_eq!(kinds(&arena), (1, 0));
        assert_eq!(connections.len(), 4);
        assert_eq!(connections[0].rate, 45.0);
        assert!(!connections[0].trunk);
        let branches: Vec<f64> = connections[1..].iter().map(|c| c.rate).collect();
        assert_eq!(branches, vec![15.0, 15.0, 15.0]);
        assert_eq!(branches.iter().sum::<f64>(), 45.0);

        let splitter = arena.get(planner.junctions()[0]);
        let producer = arena.get(EntityId(0));
        assert!(splitter.position.x > producer.rect().right());
        assert!(!splitter.degraded);
    }

    #[test]
    fn fan_in_merges_evenly() {
        let mut arena = setup(2, 1);
        let config = PlannerConfig::default();
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(50.0)], &mut arena, &config);

        assert_eq!(kinds(&arena), (0, 1));
        assert_eq!(connections.len(), 3);
        assert_eq!(connections[0].rate + connections[1].rate, 50.0);
        assert_eq!(connections[2].rate, 50.0);
        assert_eq!(delivered(&connections, &arena), 50.0);

        let merger = arena.get(planner.junctions()[0]);
        let consumer = arena.get(EntityId(2));
        assert!(merger.rect().right() < consumer.position.x);
    }

    #[test]
    fn mesh_between_groups() {
        let mut arena = setup(2, 3);
        let config = PlannerConfig::default();
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(60.0)], &mut arena, &config);

        assert_eq!(kinds(&arena), (2, 3));
        // 2 stubs in, 6 mesh links, 3 stubs out
        assert_eq!(connections.len(), 11);
        let mesh: Vec<&Connection> = connections
            .iter()
            .filter(|c| matches!(arena.get(c.from).kind, EntityKind::Splitter { .. }))
            .collect();
        assert_eq!(mesh.len(), 6);
        assert!(mesh.iter().all(|c| c.rate == 10.0));
        assert_eq!(delivered(&connections, &arena), 60.0);
    }

    /// Every junction's branch ports are pairwise distinct
    fn assert_distinct_branch_ports(connections: &[Connection], arena: &EntityArena) {
        for &junction in arena.iter().filter(|e| e.kind.is_junction()).map(|e| &e.id) {
            let ports: Vec<Point> = connections
                .iter()
                .filter_map(|c| {
                    if c.from == junction && c.trunk {
                        Some(c.start(arena))
                    } else if c.to == junction && c.trunk {
                        Some(c.end(arena))
                    } else {
                        None
                    }
                })
                .collect();
            for (i, a) in ports.iter().enumerate() {
                for b in &ports[i + 1..] {
                    assert_ne!(a, b, "junction #{} reuses a port", junction.0);
                }
            }
        }
    }

    #[test]
    fn wide_fan_out_spreads_ports() {
        let mut arena = setup(1, 5);
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(100.0)], &mut arena, &PlannerConfig::default());

        let splitter = planner.junctions()[0];
        assert_eq!(arena.get(splitter).kind, EntityKind::Splitter { outputs: 5 });
        let slots: Vec<usize> = connections
            .iter()
            .filter(|c| c.from == splitter)
            .map(|c| c.from_slot)
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
        assert_distinct_branch_ports(&connections, &arena);
    }

    #[test]
    fn wide_mesh_spreads_ports() {
        let mut arena = setup(4, 5);
        let mut planner = JunctionPlanner::new();
        let connections = planner.plan(&[edge(100.0)], &mut arena, &PlannerConfig::default());

        assert_eq!(kinds(&arena), (4, 5));
        for entity in arena.iter() {
            match entity.kind {
                EntityKind::Splitter { outputs } => assert_eq!(outputs, 5),
                EntityKind::Merger { inputs } => assert_eq!(inputs, 4),
                EntityKind::Machine { .. } => {}
            }
        }
        assert_distinct_branch_ports(&connections, &arena);
    }

    #[test]
    fn junctions_are_shared_per_machine() {
        let mut arena = setup(2, 1);
        let config = PlannerConfig::default();
        let mut planner = JunctionPlanner::new();
        let second = Edge {
            slot: 0,
            item: "Screw".into(),
            ..edge(20.0)
        };
        planner.plan(&[edge(50.0), second], &mut arena, &config);
        assert_eq!(kinds(&arena), (0, 1));
    }

    #[test]
    fn junctions_keep_clearance() {
        let mut arena = setup(3, 2);
        let config = PlannerConfig::default();
        let mut planner = JunctionPlanner::new();
        planner.plan(&[edge(90.0)], &mut arena, &config);

        let entities: Vec<_> = arena.iter().collect();
        for (i, a) in entities.iter().enumerate() {
            for b in &entities[i + 1..] {
                let margin = config.clearance_margin;
                assert!(!a.rect().expand(margin).overlaps(&b.rect().expand(margin)));
            }
        }
    }

    proptest! {
        #[test]
        fn fan_out_conserves_rate(total in 1u32..2000, consumers in 2usize..8) {
            let total = total as f64 / 4.0;
            let mut arena = setup(1, consumers);
            let mut planner = JunctionPlanner::new();
            let connections = planner.plan(&[edge(total)], &mut arena, &PlannerConfig::default());
            let sum = delivered(&connections, &arena);
            prop_assert!((sum - total).abs() <= 1e-9 * total.max(1.0));
        }

        #[test]
        fn fan_in_conserves_rate(total in 1u32..2000, producers in 2usize..8) {
            let total = total as f64 / 4.0;
            let mut arena = setup(producers, 1);
            let mut planner = JunctionPlanner::new();
            let connections = planner.plan(&[edge(total)], &mut arena, &PlannerConfig::default());
            let into_merger: f64 = connections
                .iter()
                .filter(|c| matches!(arena.get(c.to).kind, EntityKind::Merger { .. }))
                .map(|c| c.rate)
                .sum();
            prop_assert!((into_merger - total).abs() <= 1e-9 * total.max(1.0));
            prop_assert_eq!(delivered(&connections, &arena), total);
        }
    }
}
