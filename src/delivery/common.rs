use std::fmt;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, (dx, dy): (i32, i32)) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_inside(&self, size: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < size && self.y < size
    }

    /// Whether the cell sits on the outer ring of the grid.
    pub fn is_on_boundary(&self, size: i32) -> bool {
        self.x == 0 || self.y == 0 || self.x == size - 1 || self.y == size - 1
    }

    /// Edges of the grid this cell touches, named by the direction of the edge.
    pub fn touched_edges(&self, size: i32) -> impl Iterator<Item = Direction> {
        let edges = [
            (self.x <= 0, Direction::Left),
            (self.y <= 0, Direction::Back),
            (self.x >= size - 1, Direction::Right),
            (self.y >= size - 1, Direction::Forward),
        ];
        edges
            .into_iter()
            .filter_map(|(touched, edge)| touched.then_some(edge))
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Either an absolute facing on the grid or a move relative to a facing.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Back,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Forward => Direction::Back,
            Direction::Back => Direction::Forward,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn unit_vector(&self) -> (i32, i32) {
        match self {
            Direction::Forward => (0, 1),
            Direction::Back => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn turn_left(&self) -> Self {
        match self {
            Direction::Forward => Direction::Left,
            Direction::Left => Direction::Back,
            Direction::Back => Direction::Right,
            Direction::Right => Direction::Forward,
        }
    }

    pub fn turn_right(&self) -> Self {
        match self {
            Direction::Forward => Direction::Right,
            Direction::Right => Direction::Back,
            Direction::Back => Direction::Left,
            Direction::Left => Direction::Forward,
        }
    }

    /// Absolute direction reached when `relative` is applied to this facing.
    pub fn heading(&self, relative: Direction) -> Self {
        match relative {
            Direction::Forward => *self,
            Direction::Back => self.opposite(),
            Direction::Left => self.turn_left(),
            Direction::Right => self.turn_right(),
        }
    }

    pub fn is_longitudinal(&self) -> bool {
        matches!(self, Direction::Forward | Direction::Back)
    }

    /// Code understood by the hint arrows widget.
    pub fn hint_code(&self) -> u8 {
        match self {
            Direction::Back => 0,
            Direction::Forward => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Forward => "FORWARD",
            Direction::Back => "BACK",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// A building cell plus the face of the building hosting the trigger.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub position: GridPosition,
    pub side: Direction,
}

impl DeliveryTarget {
    pub fn new(position: GridPosition, side: Direction) -> Self {
        Self { position, side }
    }
}

/// Working state of a walk: where the player faces, which building side it
/// rides along and which building that is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerNavState {
    pub facing: Direction,
    pub side: Direction,
    pub position: GridPosition,
}

impl PlayerNavState {
    pub fn new(facing: Direction, side: Direction, position: GridPosition) -> Self {
        Self {
            facing,
            side,
            position,
        }
    }

    pub fn target(&self) -> DeliveryTarget {
        DeliveryTarget::new(self.position, self.side)
    }
}

/// Relative moves for one delivery, in the order they should be shown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    pub moves: Vec<Direction>,
}

impl Route {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
