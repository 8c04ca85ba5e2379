//! Board Geometry
//!
//! Grid cells, cardinal directions and the board rectangle.
//! Origin is the bottom-left cell; x grows right, y grows up.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

// =============================================================================
// CELL
// =============================================================================

/// A grid cell.
///
/// Signed so a candidate head one step past the edge is representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column, 0 at the left edge.
    pub x: i32,
    /// Row, 0 at the bottom edge.
    pub y: i32,
}

impl Cell {
    /// Create a cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in `direction`.
    #[inline]
    pub fn step(self, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// True if `other` shares an edge with this cell.
    #[inline]
    pub fn is_adjacent(self, other: Cell) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }

    /// Direction of travel from `from` into `self`, if the cells are adjacent.
    pub fn direction_from(self, from: Cell) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| from.step(*d) == self)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// DIRECTION
// =============================================================================

/// One of the four cardinal moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// y + 1
    Up = 0,
    /// y - 1
    Down = 1,
    /// x - 1
    Left = 2,
    /// x + 1
    Right = 3,
}

impl Direction {
    /// All directions in a fixed order (the order fallback choices draw from).
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector for this direction.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The reverse direction.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Direction from its `repr(u8)` index.
    pub fn from_index(index: u8) -> Option<Direction> {
        Direction::ALL.get(index as usize).copied()
    }

    /// Upper-case wire name (`UP`, `DOWN`, `LEFT`, `RIGHT`).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// The fixed board rectangle `[0, width) x [0, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Board {
    /// Create a board, rejecting empty dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::EmptyBoard { width, height });
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(BoardError::TooLarge { width, height });
        }
        Ok(Self { width, height })
    }

    /// True if `cell` lies on the board.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every cell in row-major order from the bottom-left.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Cell::new(x, y)))
    }
}

/// Errors raised while constructing a board or spawning onto it.
///
/// All of these are fatal to match construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Width or height is zero.
    #[error("board must have positive dimensions, got {width}x{height}")]
    EmptyBoard {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Dimensions do not fit signed cell coordinates.
    #[error("board {width}x{height} is too large")]
    TooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// No agents were supplied.
    #[error("a match needs at least one agent")]
    NoAgents,

    /// The same agent was entered twice.
    #[error("agent {0} entered twice")]
    DuplicateAgent(String),

    /// Not enough free cells to spawn every agent.
    #[error("board has {cells} cells, cannot spawn {agents} agents")]
    BoardFull {
        /// Cells on the board.
        cells: usize,
        /// Agents requested.
        agents: usize,
    },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposites() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
            let (dx, dy) = d.delta();
            let (ox, oy) = d.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(" RIGHT\n".parse::<Direction>(), Ok(Direction::Right));
        assert!("north".parse::<Direction>().is_err());
        assert_eq!(Direction::Left.to_string(), "LEFT");
    }

    #[test]
    fn test_cell_step_and_direction_from() {
        let origin = Cell::new(2, 2);
        assert_eq!(origin.step(Direction::Up), Cell::new(2, 3));
        assert_eq!(origin.step(Direction::Left), Cell::new(1, 2));
        assert_eq!(Cell::new(2, 3).direction_from(origin), Some(Direction::Up));
        assert_eq!(Cell::new(4, 4).direction_from(origin), None);
        assert!(origin.is_adjacent(Cell::new(3, 2)));
        assert!(!origin.is_adjacent(Cell::new(3, 3)));
    }

    #[test]
    fn test_board_bounds() {
        let board = Board::new(5, 5).unwrap();
        assert!(board.contains(Cell::new(0, 0)));
        assert!(board.contains(Cell::new(4, 4)));
        assert!(!board.contains(Cell::new(5, 0)));
        assert!(!board.contains(Cell::new(0, -1)));
        assert_eq!(board.cells().count(), 25);
        assert_eq!(board.cell_count(), 25);
    }

    #[test]
    fn test_board_rejects_empty() {
        assert_eq!(
            Board::new(0, 4),
            Err(BoardError::EmptyBoard { width: 0, height: 4 })
        );
    }
}
