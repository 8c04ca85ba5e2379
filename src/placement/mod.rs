//! Placement / Matchmaking
//!
//! Finds an unranked entrant's starting rank with a bounded binary search
//! over the ranked ladder:
//!
//! ```text
//!   ladder (best first)      0 ──────────── target ──────────── N-1
//!   bracket                 [low ........... mid ........... high]
//!   win vs rank r           [low ..... r-1]
//!   loss vs rank r                            [r+1 ..... high]
//!   tie vs rank r                     [r-3 .. r+3] ∩ [low, high]
//! ```
//!
//! `search` holds the pure state machine; `controller` plays the matches,
//! feeds the rating engine and promotes the entrant when done.

pub mod controller;
pub mod search;

pub use controller::{ArenaHost, MatchHost, PlacementError, PlacementProgress, advance, run_placement};
pub use search::{DEFAULT_ATTEMPTS, PlacementState, PlacementStep, update_interval};
