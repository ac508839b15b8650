//! Plane geometry: points, rectangles and orientations.
//!
//! The plane is unbounded with `y` growing downwards, so `North` is `-y`.

/// A point on the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// True when the interiors intersect; touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Unit grid step for this direction.
    pub fn offset(&self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// Dominant direction of travel from `from` to `to`; ties favour the
    /// horizontal axis.
    pub fn dominant(from: Point, to: Point) -> Direction {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx.abs() >= dy.abs() {
            if dx >= 0.0 { Direction::East } else { Direction::West }
        } else if dy >= 0.0 {
            Direction::South
        } else {
            Direction::North
        }
    }

    /// Vertical direction from `from` towards `to_y`
    pub fn vertical_towards(from_y: f64, to_y: f64) -> Direction {
        if to_y >= from_y { Direction::South } else { Direction::North }
    }

    /// Horizontal direction from `from` towards `to_x`
    pub fn horizontal_towards(from_x: f64, to_x: f64) -> Direction {
        if to_x >= from_x { Direction::East } else { Direction::West }
    }
}

/// Orientation of an entity. The unrotated entity takes input on its west
/// side and emits output on its east side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Direction the output side faces
    pub fn output_direction(&self) -> Direction {
        match self {
            Rotation::None => Direction::East,
            Rotation::Cw90 => Direction::South,
            Rotation::Cw180 => Direction::West,
            Rotation::Cw270 => Direction::North,
        }
    }

    /// Direction the input side faces
    pub fn input_direction(&self) -> Direction {
        self.output_direction().opposite()
    }
}

/// Which side of an entity a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Input,
    Output,
}

/// Connection point on the boundary of `rect`.
///
/// Slots are spread evenly along the side, each at the centre of its share
/// of the side's length.
pub fn port_position(
    rect: &Rect,
    rotation: Rotation,
    side: Side,
    slot: usize,
    slots: usize,
) -> Point {
    let facing = match side {
        Side::Input => rotation.input_direction(),
        Side::Output => rotation.output_direction(),
    };
    let slots = slots.max(1);
    let t = (slot.min(slots - 1) as f64 + 0.5) / slots as f64;
    match facing {
        Direction::East => Point::new(rect.right(), rect.y + rect.height * t),
        Direction::West => Point::new(rect.x, rect.y + rect.height * t),
        Direction::North => Point::new(rect.x + rect.width * t, rect.y),
        Direction::South => Point::new(rect.x + rect.width * t, rect.bottom()),
    }
}
