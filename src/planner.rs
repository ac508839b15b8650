//! End-to-end planning: target item to placed machines and routed belts.
//!
//! Stages run strictly in order on one growing entity arena: layout, edge
//! collection, junction placement, then routing against the final obstacle
//! set. Edge order is the depth-first collection order, which fixes the
//! order junctions are placed and links are routed, so identical requests
//! give identical plans.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::calculator::{DemandTree, build_demand_tree};
use crate::catalog::RecipeCatalog;
use crate::config::PlannerConfig;
use crate::edges::{Edge, collect_edges};
use crate::entity::{EntityArena, EntityId, PlacedEntity};
use crate::error::PlanError;
use crate::geometry::Point;
use crate::junction::JunctionPlanner;
use crate::lanes::LaneAssigner;
use crate::layout::layout;
use crate::routing::{PathRouter, RouteMode, Segment, polyline_length};
use crate::throughput::{ThroughputClassifier, Tier};

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub item: String,
    /// Items per minute
    pub rate: f64,
    pub prefer_alternate: bool,
    pub origin: Point,
}

impl PlanRequest {
    pub fn new(item: impl Into<String>, rate: f64) -> Self {
        Self {
            item: item.into(),
            rate,
            prefer_alternate: false,
            origin: Point::default(),
        }
    }
}

/// Link handle, assigned in routing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// A routed belt between two entities
#[derive(Debug, Clone)]
pub struct TransportLink {
    pub id: LinkId,
    pub item: String,
    pub rate: f64,
    pub tier: Tier,
    pub from: EntityId,
    pub to: EntityId,
    pub segments: Vec<Segment>,
    pub via_bus: bool,
    /// The router could not find a path and drew an unobstructed elbow
    pub fallback: bool,
}

impl TransportLink {
    pub fn length(&self) -> f64 {
        polyline_length(&self.segments)
    }
}

#[derive(Debug, Clone)]
pub struct PlanResult {
    pub tree: DemandTree,
    pub edges: Vec<Edge>,
    pub entities: Vec<PlacedEntity>,
    pub links: Vec<TransportLink>,
    /// Item to bus corridor `y`
    pub buses: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlanStats {
    pub machines: usize,
    pub junctions: usize,
    pub degraded: usize,
    pub links: usize,
    pub fallback_routes: usize,
    pub belt_length: f64,
}

impl PlanResult {
    pub fn stats(&self) -> PlanStats {
        let junctions = self.entities.iter().filter(|e| e.kind.is_junction()).count();
        PlanStats {
            machines: self.entities.len() - junctions,
            junctions,
            degraded: self.entities.iter().filter(|e| e.degraded).count(),
            links: self.links.len(),
            fallback_routes: self.links.iter().filter(|l| l.fallback).count(),
            belt_length: self.links.iter().map(TransportLink::length).sum(),
        }
    }
}

/// Run the whole pipeline for one request
pub fn plan(
    catalog: &RecipeCatalog,
    request: &PlanRequest,
    config: &PlannerConfig,
) -> Result<PlanResult, PlanError> {
    config.validate()?;
    let tree = build_demand_tree(
        catalog,
        &request.item,
        request.rate,
        request.prefer_alternate,
    )?;

    let mut arena = EntityArena::new();
    layout(&tree, request.origin, config, &mut arena);

    let edges = collect_edges(&tree);
    let mut junctions = JunctionPlanner::new();
    let connections = junctions.plan(&edges, &mut arena, config);
    if let Some(bounds) = arena.bounds() {
        debug!(
            "{} entities span {:.1} x {:.1}",
            arena.len(),
            bounds.width,
            bounds.height
        );
    }

    let obstacles = arena.obstacles(config.clearance_margin);
    let router = PathRouter::new(config, obstacles.clone());
    let mut lanes = LaneAssigner::new();
    let belts = ThroughputClassifier::new(config.tier_capacities.clone());

    let mut links = Vec::with_capacity(connections.len());
    for connection in &connections {
        let start = connection.start(&arena);
        let end = connection.end(&arena);

        let mode = if config.use_bus && connection.trunk {
            let lane_y = lanes.lane_for(&connection.item, &obstacles, (start.x, end.x), config);
            RouteMode::ViaBus { lane_y }
        } else {
            RouteMode::Direct
        };
        let route = router.route(start, end, mode);
        let tier = belts.tier_for(connection.rate);
        debug!(
            "{} @ {:.2}/min on {} ({:.0}/min)",
            connection.item,
            connection.rate,
            tier,
            belts.capacity(tier)
        );

        links.push(TransportLink {
            id: LinkId(links.len()),
            item: connection.item.clone(),
            rate: connection.rate,
            tier,
            from: connection.from,
            to: connection.to,
            segments: route.segments,
            via_bus: matches!(mode, RouteMode::ViaBus { .. }),
            fallback: route.fallback,
        });
    }

    let result = PlanResult {
        tree,
        edges,
        entities: arena.iter().cloned().collect(),
        links,
        buses: lanes.lanes().clone(),
    };
    let stats = result.stats();
    info!(
        "planned {}: {} machines, {} junctions, {} links, {} buses",
        request.item,
        stats.machines,
        stats.junctions,
        stats.links,
        result.buses.len()
    );
    Ok(result)
}

/// Format a plan as a readable listing
pub fn format_plan(result: &PlanResult) -> String {
    let mut output = String::new();

    output.push_str("Entities:\n");
    for entity in &result.entities {
        let owner = entity
            .demand
            .map(|id| format!(" -> {}", result.tree.node(id).item))
            .unwrap_or_default();
        output.push_str(&format!(
            "  #{:<4} {:<14} at ({:>7.1}, {:>7.1}) {}x{}{}{}\n",
            entity.id.0,
            entity.kind.label(),
            entity.position.x,
            entity.position.y,
            entity.width,
            entity.height,
            owner,
            if entity.degraded { " [overlapping]" } else { "" }
        ));
    }

    output.push_str("\nBelts:\n");
    for link in &result.links {
        output.push_str(&format!(
            "  #{:<4} {} @ {:.2}/min [{}] #{} -> #{}, {} segments, {:.1} long{}{}\n",
            link.id.0,
            link.item,
            link.rate,
            link.tier,
            link.from.0,
            link.to.0,
            link.segments.len(),
            link.length(),
            if link.via_bus { ", via bus" } else { "" },
            if link.fallback { " [unrouted]" } else { "" }
        ));
    }

    if !result.buses.is_empty() {
        output.push_str("\nBuses:\n");
        for (item, y) in &result.buses {
            output.push_str(&format!("  {} at y = {:.1}\n", item, y));
        }
    }

    let stats = result.stats();
    output.push_str(&format!(
        "\n{} machines, {} junctions, {} belts ({:.1} total length)\n",
        stats.machines, stats.junctions, stats.links, stats.belt_length
    ));
    if stats.degraded > 0 || stats.fallback_routes > 0 {
        output.push_str(&format!(
            "{} overlapping placements, {} unrouted belts\n",
            stats.degraded, stats.fallback_routes
        ));
    }

    output
}
