//! Types and wire protocol shared between the snake duel server and its clients.
//!
//! The server is authoritative: clients only ever send direction intents and
//! restart requests, and render whatever the server's snapshots say.

pub mod codec;
pub mod geometry;
pub mod protocol;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use codec::{read_frame, write_frame, CodecError, WireFormat, MAX_FRAME_LEN};
pub use geometry::Board;
pub use protocol::{
    Action, ClientEnvelope, InitialSnapshot, Intent, PlayerId, ServerEnvelope, ServerMessage,
    SnakeView, TickSnapshot, PROTOCOL_VERSION,
};

pub const WORLD_WIDTH: i32 = 800;
pub const WORLD_HEIGHT: i32 = 600;
pub const CELL_SIZE: i32 = 20;
pub const PLAYER_COUNT: usize = 2;

/// A pixel position on the board. On-board positions are multiples of the
/// cell size inside `[0, width) x [0, height)`. On the wire it is an `[x, y]`
/// integer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position one cell away in `direction`.
    pub fn offset(&self, direction: Direction, cell_size: i32) -> Position {
        let v = direction.vector();
        Position {
            x: self.x + v.x * cell_size,
            y: self.y + v.y * cell_size,
        }
    }
}

/// Raw direction vector as it travels over the wire, as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position::new(x, y)
    }
}

impl From<Position> for (i32, i32) {
    fn from(pos: Position) -> Self {
        (pos.x, pos.y)
    }
}

impl From<(i32, i32)> for Vector {
    fn from((x, y): (i32, i32)) -> Self {
        Vector::new(x, y)
    }
}

impl From<Vector> for (i32, i32) {
    fn from(v: Vector) -> Self {
        (v.x, v.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("({}, {}) is not a unit direction vector", .0.x, .0.y)]
pub struct InvalidDirection(pub Vector);

/// One of the four grid headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(&self) -> Vector {
        match self {
            Direction::Up => Vector::new(0, -1),
            Direction::Down => Vector::new(0, 1),
            Direction::Left => Vector::new(-1, 0),
            Direction::Right => Vector::new(1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(&self, other: Direction) -> bool {
        self.opposite() == other
    }
}

impl TryFrom<Vector> for Direction {
    type Error = InvalidDirection;

    fn try_from(v: Vector) -> Result<Self, Self::Error> {
        match (v.x, v.y) {
            (0, -1) => Ok(Direction::Up),
            (0, 1) => Ok(Direction::Down),
            (-1, 0) => Ok(Direction::Left),
            (1, 0) => Ok(Direction::Right),
            _ => Err(InvalidDirection(v)),
        }
    }
}

impl From<Direction> for Vector {
    fn from(direction: Direction) -> Self {
        direction.vector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_unit_vectors() {
        assert_eq!(Direction::try_from(Vector::new(1, 0)), Ok(Direction::Right));
        assert_eq!(Direction::try_from(Vector::new(-1, 0)), Ok(Direction::Left));
        assert_eq!(Direction::try_from(Vector::new(0, 1)), Ok(Direction::Down));
        assert_eq!(Direction::try_from(Vector::new(0, -1)), Ok(Direction::Up));
    }

    #[test]
    fn test_direction_rejects_non_unit_vectors() {
        for v in [
            Vector::new(0, 0),
            Vector::new(1, 1),
            Vector::new(2, 0),
            Vector::new(0, -5),
        ] {
            assert_eq!(Direction::try_from(v), Err(InvalidDirection(v)));
        }
    }

    #[test]
    fn test_opposites() {
        assert!(Direction::Left.is_opposite(Direction::Right));
        assert!(Direction::Up.is_opposite(Direction::Down));
        assert!(!Direction::Up.is_opposite(Direction::Left));
        assert!(!Direction::Up.is_opposite(Direction::Up));
    }

    #[test]
    fn test_position_offset() {
        let p = Position::new(100, 100);
        assert_eq!(p.offset(Direction::Right, CELL_SIZE), Position::new(120, 100));
        assert_eq!(p.offset(Direction::Up, CELL_SIZE), Position::new(100, 80));
    }

    #[test]
    fn test_invalid_direction_message() {
        let err = InvalidDirection(Vector::new(3, 4));
        assert_eq!(err.to_string(), "(3, 4) is not a unit direction vector");
    }

    #[test]
    fn test_position_and_vector_are_integer_pairs_on_the_wire() {
        assert_eq!(serde_json::to_string(&Position::new(20, 40)).unwrap(), "[20,40]");
        assert_eq!(serde_json::to_string(&Vector::new(-1, 0)).unwrap(), "[-1,0]");

        let pos: Position = serde_json::from_str("[780,0]").unwrap();
        assert_eq!(pos, Position::new(780, 0));
        assert!(serde_json::from_str::<Position>(r#"{"x":1,"y":2}"#).is_err());
    }
}
