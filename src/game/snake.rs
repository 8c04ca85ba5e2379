//! Agent Bodies
//!
//! A snake is an ordered run of cells, head first. Bodies live in a
//! `VecDeque` so a move is one head push and at most one tail pop.

use std::collections::VecDeque;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::game::board::{Board, Cell, Direction};

/// Why an agent died.
///
/// Declaration order is precedence order: when several apply on the same
/// tick, the earliest variant is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeathCause {
    /// Candidate head left the board.
    Wall = 0,
    /// Candidate head hit the agent's own body.
    SelfCollision = 1,
    /// Two or more candidate heads landed on the same cell.
    HeadCollision = 2,
    /// Candidate head hit another agent's body.
    BodyCollision = 3,
}

impl DeathCause {
    /// Short lower-case name used in logs and records.
    pub fn as_str(self) -> &'static str {
        match self {
            DeathCause::Wall => "wall",
            DeathCause::SelfCollision => "self",
            DeathCause::HeadCollision => "head_collision",
            DeathCause::BodyCollision => "body_collision",
        }
    }
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When and how an agent died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Death {
    /// Cause of death.
    pub cause: DeathCause,
    /// Tick the death was recorded on.
    pub tick: u32,
}

/// One agent's body and standing in a match.
///
/// Deserializing rejects an empty body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnakeData")]
pub struct Snake {
    /// Body cells, head at the front.
    body: VecDeque<Cell>,

    /// Last resolved move, `None` before the first tick.
    pub heading: Option<Direction>,

    /// Still taking part in the match.
    pub alive: bool,

    /// Apples eaten.
    pub score: u32,

    /// Set once, on the tick the agent dies.
    pub death: Option<Death>,
}

/// Wire form of [`Snake`], checked before it becomes one.
#[derive(Deserialize)]
struct SnakeData {
    body: VecDeque<Cell>,
    heading: Option<Direction>,
    alive: bool,
    score: u32,
    death: Option<Death>,
}

/// A serialized snake with no body cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("snake body must have at least one cell")]
pub struct EmptyBodyError;

impl TryFrom<SnakeData> for Snake {
    type Error = EmptyBodyError;

    fn try_from(data: SnakeData) -> Result<Self, Self::Error> {
        if data.body.is_empty() {
            return Err(EmptyBodyError);
        }
        Ok(Self {
            body: data.body,
            heading: data.heading,
            alive: data.alive,
            score: data.score,
            death: data.death,
        })
    }
}

impl Snake {
    /// Spawn a length-1 snake at `cell`.
    pub fn spawn(cell: Cell) -> Self {
        let mut body = VecDeque::with_capacity(8);
        body.push_back(cell);
        Self {
            body,
            heading: None,
            alive: true,
            score: 0,
            death: None,
        }
    }

    /// Build a snake from explicit cells, head first.
    ///
    /// Returns `None` for an empty body.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Option<Self> {
        let body: VecDeque<Cell> = cells.into_iter().collect();
        let head = *body.front()?;
        let heading = body.get(1).and_then(|neck| head.direction_from(*neck));
        Some(Self {
            body,
            heading,
            alive: true,
            score: 0,
            death: None,
        })
    }

    /// Head cell.
    #[inline]
    pub fn head(&self) -> Cell {
        // Bodies are never empty: constructors reject it and `advance` only
        // pops after a push.
        self.body[0]
    }

    /// Tail cell.
    #[inline]
    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    /// Body length.
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Always false; kept alongside `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body cells, head first.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.body.iter().copied()
    }

    /// True if any segment occupies `cell`.
    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// The body this snake would have after moving its head to `head`.
    pub fn proposed_body(&self, head: Cell, grows: bool) -> Vec<Cell> {
        let keep = if grows { self.body.len() } else { self.body.len() - 1 };
        let mut body = Vec::with_capacity(keep + 1);
        body.push(head);
        body.extend(self.body.iter().take(keep).copied());
        body
    }

    /// Move the head one step in `direction`, keeping the tail when growing.
    pub fn advance(&mut self, direction: Direction, grows: bool) {
        let head = self.head().step(direction);
        self.body.push_front(head);
        if !grows {
            self.body.pop_back();
        }
        self.heading = Some(direction);
    }

    /// Mark dead. The body stays where it was.
    pub fn kill(&mut self, cause: DeathCause, tick: u32) {
        if self.alive {
            self.alive = false;
            self.death = Some(Death { cause, tick });
        }
    }

    /// Check the body invariants against `board`.
    ///
    /// In bounds, no repeated cell, consecutive segments 4-connected.
    pub fn is_well_formed(&self, board: &Board) -> bool {
        if self.body.is_empty() {
            return false;
        }
        if !self.body.iter().all(|c| board.contains(*c)) {
            return false;
        }
        let connected = self
            .body
            .iter()
            .zip(self.body.iter().skip(1))
            .all(|(a, b)| a.is_adjacent(*b));
        if !connected {
            return false;
        }
        let mut seen: Vec<Cell> = self.body.iter().copied().collect();
        seen.sort_unstable();
        seen.windows(2).all(|w| w[0] != w[1])
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_is_single_cell() {
        let snake = Snake::spawn(Cell::new(3, 3));
        assert_eq!(snake.len(), 1);
        assert_eq!(snake.head(), snake.tail());
        assert!(snake.alive);
        assert!(snake.heading.is_none());
    }

    #[test]
    fn test_advance_moves_and_grows() {
        let mut snake = Snake::spawn(Cell::new(1, 1));

        snake.advance(Direction::Right, true);
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.head(), Cell::new(2, 1));
        assert_eq!(snake.tail(), Cell::new(1, 1));

        snake.advance(Direction::Up, false);
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.head(), Cell::new(2, 2));
        assert_eq!(snake.tail(), Cell::new(2, 1));
        assert_eq!(snake.heading, Some(Direction::Up));
    }

    #[test]
    fn test_proposed_body_drops_tail_unless_growing() {
        let snake = Snake::from_cells([Cell::new(2, 2), Cell::new(1, 2), Cell::new(0, 2)]).unwrap();
        let moved = snake.proposed_body(Cell::new(3, 2), false);
        assert_eq!(moved, vec![Cell::new(3, 2), Cell::new(2, 2), Cell::new(1, 2)]);

        let grown = snake.proposed_body(Cell::new(3, 2), true);
        assert_eq!(grown.len(), 4);
        assert_eq!(grown[3], Cell::new(0, 2));
    }

    #[test]
    fn test_from_cells_infers_heading() {
        let snake = Snake::from_cells([Cell::new(2, 3), Cell::new(2, 2)]).unwrap();
        assert_eq!(snake.heading, Some(Direction::Up));
        assert!(Snake::from_cells(Vec::new()).is_none());
    }

    #[test]
    fn test_kill_records_first_death_only() {
        let mut snake = Snake::spawn(Cell::new(0, 0));
        snake.kill(DeathCause::Wall, 4);
        snake.kill(DeathCause::BodyCollision, 5);
        assert!(!snake.alive);
        assert_eq!(snake.death, Some(Death { cause: DeathCause::Wall, tick: 4 }));
        assert_eq!(snake.len(), 1);
    }

    #[test]
    fn test_well_formed() {
        let board = Board::new(5, 5).unwrap();
        let good = Snake::from_cells([Cell::new(1, 1), Cell::new(1, 0), Cell::new(0, 0)]).unwrap();
        assert!(good.is_well_formed(&board));

        let gap = Snake::from_cells([Cell::new(1, 1), Cell::new(3, 1)]).unwrap();
        assert!(!gap.is_well_formed(&board));

        let outside = Snake::from_cells([Cell::new(5, 0)]).unwrap();
        assert!(!outside.is_well_formed(&board));
    }

    #[test]
    fn test_deserialize_rejects_empty_body() {
        let snake = Snake::from_cells([Cell::new(2, 2), Cell::new(2, 1)]).unwrap();
        let json = serde_json::to_string(&snake).unwrap();
        let back: Snake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snake);

        let empty = r#"{"body":[],"heading":null,"alive":true,"score":0,"death":null}"#;
        let err = serde_json::from_str::<Snake>(empty).unwrap_err();
        assert!(err.to_string().contains("at least one cell"));
    }

    #[test]
    fn test_death_cause_precedence_order() {
        assert!(DeathCause::Wall < DeathCause::SelfCollision);
        assert!(DeathCause::SelfCollision < DeathCause::HeadCollision);
        assert!(DeathCause::HeadCollision < DeathCause::BodyCollision);
    }
}
