//! # Snake Arena
//!
//! Deterministic multi-agent snake matches, a skill ladder and binary-search
//! placement of new entrants.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SNAKE ARENA                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - Snapshot hashing for verification         │
//! │                                                              │
//! │  game/           - Round engine (deterministic)              │
//! │  ├── board.rs    - Cells, directions, bounds                 │
//! │  ├── snake.rs    - Bodies, headings, deaths                  │
//! │  ├── input.rs    - Move intents and random fallback          │
//! │  ├── collision.rs- Wall / self / head / body deaths          │
//! │  ├── apple.rs    - Apple consumption and respawn             │
//! │  ├── tick.rs     - One atomic tick, replay                   │
//! │  └── outcome.rs  - Termination and adjudication              │
//! │                                                              │
//! │  arena/          - Match state machine (async)               │
//! │  ├── agent.rs    - Move collaborators                        │
//! │  ├── session.rs  - Initializing → Running → Terminated       │
//! │  ├── runner.rs   - run_match / run_match_blocking            │
//! │  └── recorder.rs - Persistence collaborator                  │
//! │                                                              │
//! │  rating/         - Elo and TrueSkill behind one trait,       │
//! │                    ladder with serialized updates            │
//! │  placement/      - Binary-search placement of entrants       │
//! │  proof/          - Transcripts and replay verification       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+, seeded from the match id
//!   and the sorted agent ids
//!
//! Given the same match id, agents and resolved moves, a match replays to
//! the same snapshots and the same state hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod core;
pub mod game;
pub mod placement;
pub mod proof;
pub mod rating;

// Re-export commonly used types
pub use arena::{ArenaError, MatchOutcome, MatchRecorder, SessionConfig, run_match, run_match_blocking};
pub use config::{ArenaConfig, ConfigError};
pub use core::rng::DeterministicRng;
pub use game::{AgentId, Direction, MatchConfig, MatchId, MatchResult, Outcome, Snapshot};
pub use placement::{PlacementState, advance, run_placement};
pub use rating::{Ladder, Rating, RatingModel, RatingSystem};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
