//! Game Logic Module
//!
//! All grid simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `board`: Cells, directions, board bounds
//! - `snake`: Agent bodies and death records
//! - `state`: Match state, snapshots, identifiers
//! - `input`: Move intents and fallback resolution
//! - `collision`: Death detection on the proposed board
//! - `apple`: Apple consumption and replenishment
//! - `events`: Per-tick events
//! - `tick`: The round engine and replay
//! - `outcome`: Termination checks and match results

pub mod board;
pub mod snake;
pub mod state;
pub mod input;
pub mod collision;
pub mod apple;
pub mod events;
pub mod tick;
pub mod outcome;

// Re-export key types
pub use board::{Board, BoardError, Cell, Direction};
pub use snake::{Death, DeathCause, EmptyBodyError, Snake};
pub use state::{AgentId, MatchId, MatchState, SharedSnapshot, Snapshot};
pub use input::{FallbackReason, MoveIntent, MoveRecord};
pub use events::{GameEvent, GameEventData};
pub use tick::{MatchConfig, Replay, TickResult, replay_match, tick};
pub use outcome::{MatchResult, Outcome, ParticipantResult, TerminationReason};
