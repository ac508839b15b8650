//! Belt routing on a grid.
//!
//! Routes run on a square grid anchored at the start port. The search is a
//! best-first search whose step cost favours the intended flow direction
//! and straight runs, so belts come out flow-aligned with few bends.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::config::PlannerConfig;
use crate::geometry::{Direction, Point, Rect};

const EPSILON: f64 = 1e-6;

/// Axis-aligned straight piece of a belt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    pub fn length(&self) -> f64 {
        self.from.manhattan_distance(&self.to)
    }

    pub fn is_horizontal(&self) -> bool {
        (self.from.y - self.to.y).abs() <= EPSILON
    }

    pub fn is_vertical(&self) -> bool {
        (self.from.x - self.to.x).abs() <= EPSILON
    }

    fn heading(&self) -> Option<Direction> {
        if self.length() <= EPSILON {
            None
        } else if self.is_horizontal() {
            Some(Direction::horizontal_towards(self.from.x, self.to.x))
        } else if self.is_vertical() {
            Some(Direction::vertical_towards(self.from.y, self.to.y))
        } else {
            None
        }
    }
}

pub fn polyline_length(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::length).sum()
}

/// Join consecutive points into segments, inserting an elbow wherever two
/// points differ on both axes.
pub fn points_to_segments(points: &[Point]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if (a.x - b.x).abs() > EPSILON && (a.y - b.y).abs() > EPSILON {
            let elbow = Point::new(b.x, a.y);
            segments.push(Segment::new(a, elbow));
            segments.push(Segment::new(elbow, b));
        } else if a.manhattan_distance(&b) > EPSILON {
            segments.push(Segment::new(a, b));
        }
    }
    merge_colinear(segments)
}

/// Merge adjacent segments running the same way along the same line.
pub fn merge_colinear(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.length() <= EPSILON {
            continue;
        }
        if let Some(last) = merged.last_mut() {
            if last.heading() == segment.heading()
                && last.to.manhattan_distance(&segment.from) <= EPSILON
            {
                last.to = segment.to;
                continue;
            }
        }
        merged.push(segment);
    }
    merged
}

/// Grid cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
}

impl Cell {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn step(&self, dir: Direction) -> Cell {
        let (dx, dy) = dir.offset();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan_distance(&self, other: &Cell) -> u64 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

type SearchState = (Cell, Option<Direction>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchEntry {
    est: OrderedFloat<f64>,
    cost: OrderedFloat<f64>,
    seq: u64,
    state: SearchState,
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search over a 4-connected grid.
///
/// `step_cost` receives the heading of the move into the current cell
/// (`None` at the start) and the direction of the next move. `heuristic`
/// must not overestimate the remaining cost. Gives up with `None` after
/// `max_steps` expansions or when the reachable area is exhausted.
pub fn grid_search<P, C, G, H>(
    start: Cell,
    max_steps: usize,
    passable: P,
    step_cost: C,
    is_goal: G,
    heuristic: H,
) -> Option<Vec<Cell>>
where
    P: Fn(Cell) -> bool,
    C: Fn(Option<Direction>, Direction) -> f64,
    G: Fn(Cell) -> bool,
    H: Fn(Cell) -> f64,
{
    let mut best: HashMap<SearchState, f64> = HashMap::new();
    let mut prev: HashMap<SearchState, SearchState> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    let initial = (start, None);
    best.insert(initial, 0.0);
    heap.push(SearchEntry {
        est: OrderedFloat(heuristic(start)),
        cost: OrderedFloat(0.0),
        seq,
        state: initial,
    });

    let mut steps = 0usize;
    while let Some(SearchEntry { cost, state, .. }) = heap.pop() {
        steps += 1;
        if steps > max_steps {
            debug!("grid search gave up after {} expansions", max_steps);
            return None;
        }
        if best.get(&state).is_some_and(|&b| cost.0 > b) {
            continue;
        }

        let (cell, heading) = state;
        if is_goal(cell) {
            let mut cells = vec![cell];
            let mut cursor = state;
            while let Some(&before) = prev.get(&cursor) {
                cells.push(before.0);
                cursor = before;
            }
            cells.reverse();
            return Some(cells);
        }

        for dir in Direction::all() {
            let next = cell.step(dir);
            if !passable(next) {
                continue;
            }
            let next_cost = cost.0 + step_cost(heading, dir);
            let key = (next, Some(dir));
            if best.get(&key).is_some_and(|&b| next_cost >= b) {
                continue;
            }
            best.insert(key, next_cost);
            prev.insert(key, state);
            seq += 1;
            heap.push(SearchEntry {
                est: OrderedFloat(next_cost + heuristic(next)),
                cost: OrderedFloat(next_cost),
                seq,
                state: key,
            });
        }
    }

    None
}

/// Cells where the direction of travel changes, plus both ends
fn corners(cells: &[Cell]) -> Vec<Cell> {
    let mut out = Vec::new();
    for (i, &cell) in cells.iter().enumerate() {
        if i == 0 || i == cells.len() - 1 {
            out.push(cell);
            continue;
        }
        let prev = cells[i - 1];
        let next = cells[i + 1];
        let straight =
            (prev.x == cell.x && cell.x == next.x) || (prev.y == cell.y && cell.y == next.y);
        if !straight {
            out.push(cell);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteMode {
    Direct,
    /// Perpendicular to the bus, along it, then perpendicular to the target
    ViaBus { lane_y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub segments: Vec<Segment>,
    /// At least one leg fell back to the unobstructed elbow path
    pub fallback: bool,
}

/// Grid window for a single leg, anchored so the start sits on a grid point.
struct LegGrid {
    start: Point,
    end: Point,
    cell: f64,
    goal: Cell,
    min: Cell,
    max: Cell,
    blocked: HashSet<Cell>,
    tolerance: f64,
}

impl LegGrid {
    fn new(start: Point, end: Point, obstacles: &[Rect], config: &PlannerConfig) -> Self {
        let cell = config.grid_cell;
        // Truncating towards the start keeps the goal between both ends.
        let goal = Cell::new(
            ((end.x - start.x) / cell).trunc() as i64,
            ((end.y - start.y) / cell).trunc() as i64,
        );

        let mut window = Rect::new(
            start.x.min(end.x),
            start.y.min(end.y),
            (start.x - end.x).abs(),
            (start.y - end.y).abs(),
        );
        for obstacle in obstacles {
            window = window.union(obstacle);
        }
        let pad = config.search_padding_cells;
        let min = Cell::new(
            ((window.x - start.x) / cell).floor() as i64 - pad,
            ((window.y - start.y) / cell).floor() as i64 - pad,
        );
        let max = Cell::new(
            ((window.right() - start.x) / cell).ceil() as i64 + pad,
            ((window.bottom() - start.y) / cell).ceil() as i64 + pad,
        );

        let mut blocked = HashSet::new();
        for obstacle in obstacles {
            // Cells strictly inside the rectangle; its boundary stays open.
            let x0 = (((obstacle.x - start.x) / cell).floor() as i64 + 1).max(min.x);
            let x1 = (((obstacle.right() - start.x) / cell).ceil() as i64 - 1).min(max.x);
            let y0 = (((obstacle.y - start.y) / cell).floor() as i64 + 1).max(min.y);
            let y1 = (((obstacle.bottom() - start.y) / cell).ceil() as i64 - 1).min(max.y);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    blocked.insert(Cell::new(x, y));
                }
            }
        }

        Self {
            start,
            end,
            cell,
            goal,
            min,
            max,
            blocked,
            tolerance: config.port_tolerance,
        }
    }

    fn world(&self, c: Cell) -> Point {
        Point::new(
            self.start.x + c.x as f64 * self.cell,
            self.start.y + c.y as f64 * self.cell,
        )
    }

    /// World position of a path corner; the goal row and column snap onto
    /// the exact end coordinates.
    fn snapped(&self, c: Cell) -> Point {
        let mut p = self.world(c);
        if c.x == self.goal.x && self.goal.x != 0 {
            p.x = self.end.x;
        }
        if c.y == self.goal.y && self.goal.y != 0 {
            p.y = self.end.y;
        }
        p
    }

    fn passable(&self, c: Cell) -> bool {
        if c.x < self.min.x || c.x > self.max.x || c.y < self.min.y || c.y > self.max.y {
            return false;
        }
        if c == self.goal || !self.blocked.contains(&c) {
            return true;
        }
        let p = self.world(c);
        euclidean(p, self.start) <= self.tolerance || euclidean(p, self.end) <= self.tolerance
    }
}

fn euclidean(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Obstacle-avoiding belt router over a fixed obstacle set.
pub struct PathRouter<'a> {
    config: &'a PlannerConfig,
    obstacles: Vec<Rect>,
}

impl<'a> PathRouter<'a> {
    /// `obstacles` are the margin-expanded entity rectangles
    pub fn new(config: &'a PlannerConfig, obstacles: Vec<Rect>) -> Self {
        Self { config, obstacles }
    }

    pub fn route(&self, start: Point, end: Point, mode: RouteMode) -> Route {
        match mode {
            RouteMode::Direct => {
                let (points, found) = self.leg(start, end, Direction::dominant(start, end));
                Route {
                    segments: points_to_segments(&points),
                    fallback: !found,
                }
            }
            RouteMode::ViaBus { lane_y } => {
                let enter = Point::new(start.x, lane_y);
                let leave = Point::new(end.x, lane_y);
                let legs = [
                    self.leg(start, enter, Direction::vertical_towards(start.y, lane_y)),
                    self.leg(enter, leave, Direction::horizontal_towards(start.x, end.x)),
                    self.leg(leave, end, Direction::vertical_towards(lane_y, end.y)),
                ];

                let mut points: Vec<Point> = Vec::new();
                let mut fallback = false;
                for (leg, found) in legs {
                    fallback |= !found;
                    let skip = usize::from(!points.is_empty());
                    points.extend(leg.into_iter().skip(skip));
                }
                Route {
                    segments: points_to_segments(&points),
                    fallback,
                }
            }
        }
    }

    /// One searched leg as a list of corner points. The flag is false when
    /// the search failed and the elbow fallback was used instead.
    fn leg(&self, start: Point, end: Point, flow: Direction) -> (Vec<Point>, bool) {
        if start.manhattan_distance(&end) <= EPSILON {
            return (vec![start, end], true);
        }

        let grid = LegGrid::new(start, end, &self.obstacles, self.config);
        let config = self.config;
        let step_cost = |heading: Option<Direction>, dir: Direction| {
            let mut cost = 1.0;
            if dir == flow.opposite() {
                cost += config.against_flow_penalty;
            } else if dir != flow {
                cost += config.perpendicular_penalty;
            }
            if heading.is_some_and(|h| h != dir) {
                cost += config.turn_penalty;
            }
            cost
        };

        let goal = grid.goal;
        let cells = grid_search(
            Cell::new(0, 0),
            config.max_search_steps,
            |c| grid.passable(c),
            step_cost,
            |c| c == goal,
            |c| c.manhattan_distance(&goal) as f64,
        );

        match cells {
            Some(cells) => {
                let mut points = vec![start];
                for corner in corners(&cells).into_iter().skip(1) {
                    points.push(grid.snapped(corner));
                }
                points.push(end);
                (points, true)
            }
            None => {
                warn!(
                    "no route from ({:.1}, {:.1}) to ({:.1}, {:.1}), using elbow path",
                    start.x, start.y, end.x, end.y
                );
                (elbow_path(start, end), false)
            }
        }
    }
}

/// Horizontal, vertical, horizontal path through the midpoint column,
/// ignoring obstacles.
pub fn elbow_path(start: Point, end: Point) -> Vec<Point> {
    let mid_x = (start.x + end.x) / 2.0;
    vec![
        start,
        Point::new(mid_x, start.y),
        Point::new(mid_x, end.y),
        end,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlannerConfig {
        PlannerConfig::default()
    }

    fn assert_axis_aligned(segments: &[Segment]) {
        for s in segments {
            assert!(s.is_horizontal() || s.is_vertical(), "{:?}", s);
        }
        for pair in segments.windows(2) {
            assert!(pair[0].to.manhattan_distance(&pair[1].from) <= EPSILON);
        }
    }

    #[test]
    fn open_field_route_is_manhattan() {
        let config = config();
        let router = PathRouter::new(&config, Vec::new());
        let cases = [
            (Point::new(0.0, 0.0), Point::new(40.0, 0.0)),
            (Point::new(0.0, 0.0), Point::new(37.0, 13.0)),
            (Point::new(5.5, 2.0), Point::new(-20.25, 31.0)),
            (Point::new(0.0, 0.0), Point::new(1.0, 30.0)),
            (Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
        ];
        for (start, end) in cases {
            let route = router.route(start, end, RouteMode::Direct);
            assert!(!route.fallback);
            assert!(route.segments.len() <= 3, "{:?}", route.segments);
            let length = polyline_length(&route.segments);
            assert!((length - start.manhattan_distance(&end)).abs() < 1e-9);
            assert_eq!(route.segments.first().unwrap().from, start);
            assert_eq!(route.segments.last().unwrap().to, end);
            assert_axis_aligned(&route.segments);
        }
    }

    #[test]
    fn routes_around_a_wall() {
        let config = config();
        let wall = Rect::new(10.0, -20.0, 6.0, 40.0);
        let router = PathRouter::new(&config, vec![wall]);
        let start = Point::new(0.0, 0.0);
        let end = Point::new(30.0, 0.0);
        let route = router.route(start, end, RouteMode::Direct);

        assert!(!route.fallback);
        assert!(route.segments.len() > 1);
        assert_axis_aligned(&route.segments);
        for s in &route.segments {
            let covered = Rect::new(
                s.from.x.min(s.to.x),
                s.from.y.min(s.to.y),
                (s.from.x - s.to.x).abs(),
                (s.from.y - s.to.y).abs(),
            );
            assert!(!covered.overlaps(&wall), "{:?} crosses the wall", s);
        }
    }

    #[test]
    fn exhausted_search_falls_back() {
        let config = PlannerConfig {
            max_search_steps: 3,
            ..config()
        };
        let router = PathRouter::new(&config, Vec::new());
        let start = Point::new(0.0, 0.0);
        let end = Point::new(40.0, 20.0);
        let route = router.route(start, end, RouteMode::Direct);
        assert!(route.fallback);
        assert_eq!(
            route.segments,
            vec![
                Segment::new(start, Point::new(20.0, 0.0)),
                Segment::new(Point::new(20.0, 0.0), Point::new(20.0, 20.0)),
                Segment::new(Point::new(20.0, 20.0), end),
            ]
        );
    }

    #[test]
    fn bus_route_uses_the_lane() {
        let config = config();
        let router = PathRouter::new(&config, Vec::new());
        let start = Point::new(0.0, 10.0);
        let end = Point::new(50.0, 20.0);
        let route = router.route(start, end, RouteMode::ViaBus { lane_y: 60.0 });

        assert!(!route.fallback);
        assert_axis_aligned(&route.segments);
        assert_eq!(route.segments.len(), 3);
        assert_eq!(route.segments[1].from, Point::new(0.0, 60.0));
        assert_eq!(route.segments[1].to, Point::new(50.0, 60.0));
        assert_eq!(polyline_length(&route.segments), 50.0 + 40.0 + 50.0);
    }

    #[test]
    fn merges_colinear_runs() {
        let merged = merge_colinear(vec![
            Segment::new(Point::new(0.0, 0.0), Point::new(4.0, 0.0)),
            Segment::new(Point::new(4.0, 0.0), Point::new(9.0, 0.0)),
            Segment::new(Point::new(9.0, 0.0), Point::new(9.0, 0.0)),
            Segment::new(Point::new(9.0, 0.0), Point::new(9.0, 5.0)),
            Segment::new(Point::new(9.0, 5.0), Point::new(9.0, 2.0)),
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], Segment::new(Point::new(0.0, 0.0), Point::new(9.0, 0.0)));
    }

    #[test]
    fn grid_search_prefers_straight_runs() {
        let goal = Cell::new(3, 3);
        let cells = grid_search(
            Cell::new(0, 0),
            1_000,
            |c| c.x >= 0 && c.y >= 0 && c.x <= 5 && c.y <= 5,
            |heading, dir| if heading.is_some_and(|h| h != dir) { 6.0 } else { 1.0 },
            |c| c == goal,
            |c| c.manhattan_distance(&goal) as f64,
        )
        .unwrap();
        assert_eq!(cells.len(), 7);
        assert_eq!(corners(&cells).len(), 3);
    }

    #[test]
    fn grid_search_reports_unreachable() {
        let cells = grid_search(
            Cell::new(0, 0),
            1_000,
            |c| c.x.abs() <= 2 && c.y.abs() <= 2 && c != Cell::new(1, 0) && c.x < 1,
            |_, _| 1.0,
            |c| c == Cell::new(2, 0),
            |_| 0.0,
        );
        assert!(cells.is_none());
    }
}
