//! Move Intents and Resolution
//!
//! An agent's intent is a direction or the reason it has none. Resolution
//! turns every living agent's intent into exactly one direction: anything
//! unusable (missing, unparseable, timed out, failed, or a reversal into the
//! neck) becomes a uniform random pick among the non-reversing directions.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::rng::DeterministicRng;
use crate::game::board::Direction;
use crate::game::snake::Snake;
use crate::game::state::{AgentId, MatchState};

// =============================================================================
// INTENT TYPES
// =============================================================================

/// Why a substitute direction was used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FallbackReason {
    /// No intent was supplied for the agent.
    Missing = 0,
    /// The reply did not name a direction.
    Invalid = 1,
    /// The collaborator did not answer in time.
    Timeout = 2,
    /// The collaborator returned an error.
    AgentFailed = 3,
    /// The direction would reverse into the agent's own neck.
    Reversal = 4,
}

/// What an agent asked for on one tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// The requested direction, or why there is none.
    pub requested: Result<Direction, FallbackReason>,
    /// Free-text explanation from the agent. Opaque to the engine.
    pub rationale: Option<String>,
}

impl MoveIntent {
    /// Intent to move in `direction`.
    pub fn direction(direction: Direction) -> Self {
        Self {
            requested: Ok(direction),
            rationale: None,
        }
    }

    /// No usable intent.
    pub fn unusable(reason: FallbackReason) -> Self {
        Self {
            requested: Err(reason),
            rationale: None,
        }
    }

    /// No intent at all.
    pub fn missing() -> Self {
        Self::unusable(FallbackReason::Missing)
    }

    /// Parse a textual reply; anything that is not a direction is `Invalid`.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Direction>() {
            Ok(direction) => Self::direction(direction),
            Err(_) => Self::unusable(FallbackReason::Invalid),
        }
    }

    /// Attach a rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// What an agent asked for and the direction it actually moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Direction requested, if the agent gave one.
    pub requested: Option<Direction>,
    /// Direction applied by the round engine.
    pub resolved: Direction,
    /// Set when `resolved` is a substitute.
    pub fallback: Option<FallbackReason>,
    /// Agent's rationale, passed through untouched.
    pub rationale: Option<String>,
}

impl MoveRecord {
    /// A record for an already-resolved direction (used by replay).
    pub fn resolved(direction: Direction) -> Self {
        Self {
            requested: Some(direction),
            resolved: direction,
            fallback: None,
            rationale: None,
        }
    }

    /// True if the engine substituted the direction.
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Directions that do not reverse `heading`. All four if there is none.
pub fn legal_directions(heading: Option<Direction>) -> Vec<Direction> {
    match heading {
        Some(h) => Direction::ALL
            .into_iter()
            .filter(|d| *d != h.opposite())
            .collect(),
        None => Direction::ALL.to_vec(),
    }
}

/// Resolve one agent's intent against its current heading.
pub fn resolve_intent(snake: &Snake, intent: &MoveIntent, rng: &mut DeterministicRng) -> MoveRecord {
    let requested = intent.requested.ok();

    let fallback = match intent.requested {
        Ok(direction) if snake.heading == Some(direction.opposite()) => Some(FallbackReason::Reversal),
        Ok(_) => None,
        Err(reason) => Some(reason),
    };

    let resolved = match (fallback, requested) {
        (None, Some(direction)) => direction,
        _ => {
            let options = legal_directions(snake.heading);
            options[rng.next_index(options.len())]
        }
    };

    MoveRecord {
        requested,
        resolved,
        fallback,
        rationale: intent.rationale.clone(),
    }
}

/// Resolve intents for every living agent, in id order.
///
/// Agents absent from `intents` are treated as `Missing`. Intents for dead
/// or unknown agents are ignored.
pub fn resolve_intents(
    state: &mut MatchState,
    intents: &BTreeMap<AgentId, MoveIntent>,
) -> BTreeMap<AgentId, MoveRecord> {
    let missing = MoveIntent::missing();
    let mut resolved = BTreeMap::new();

    for (id, snake) in state.snakes.iter().filter(|(_, s)| s.alive) {
        let intent = intents.get(id).unwrap_or(&missing);
        let record = resolve_intent(snake, intent, &mut state.fallback_rng);

        if let Some(reason) = record.fallback {
            debug!(
                agent = %id,
                tick = state.tick + 1,
                ?reason,
                direction = %record.resolved,
                "Substituted move"
            );
        }

        resolved.insert(*id, record);
    }

    resolved
}

// =============================================================================
// TESTS
// =============================================================================
