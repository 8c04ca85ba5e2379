//! Match Transcript Recording
//!
//! Records everything needed to re-run a match and check its outcome: the
//! seed, the rules, every resolved move, periodic state hashes and the result.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::board::Direction;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::MoveRecord;
use crate::game::outcome::MatchResult;
use crate::game::snake::DeathCause;
use crate::game::state::{AgentId, MatchId};
use crate::game::tick::MatchConfig;

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Checkpoint interval in ticks.
pub const CHECKPOINT_INTERVAL: u32 = 10;

/// Complete match transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchTranscript {
    /// Version for forward compatibility.
    pub version: u8,

    /// Match metadata.
    pub metadata: MatchMetadata,

    /// Hash of the tick-0 board.
    pub initial_hash: StateHash,

    /// Resolved moves, one entry per tick played.
    pub moves: Vec<TickMoves>,

    /// State hash checkpoints (every `CHECKPOINT_INTERVAL` ticks).
    pub checkpoints: Vec<StateCheckpoint>,

    /// Final match result.
    pub result: Option<MatchResult>,

    /// Significant events (deaths, apples eaten).
    pub events: Vec<TranscriptEvent>,
}

/// Match metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Unique match identifier.
    pub match_id: MatchId,

    /// Sorted agent IDs (deterministic ordering).
    pub agent_ids: Vec<AgentId>,

    /// RNG seed derived from match_id + agent_ids.
    pub rng_seed: u64,

    /// Unix timestamp (seconds) when the match started.
    pub start_timestamp: i64,

    /// Board and rule parameters.
    pub config: MatchConfig,

    /// Hash of `config`.
    pub config_hash: StateHash,
}

/// Resolved directions for one tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMoves {
    /// Tick the moves were applied on.
    pub tick: u32,
    /// `(agent, direction)` in agent order.
    pub moves: Vec<(AgentId, Direction)>,
}

/// State checkpoint for partial verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCheckpoint {
    /// Tick number.
    pub tick: u32,

    /// State hash at this tick.
    pub state_hash: StateHash,

    /// Board RNG state at this tick.
    pub rng_state: [u64; 2],
}

/// Transcript event (subset of GameEvent for compact storage).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptEvent {
    /// Agent died.
    AgentDied {
        /// Tick of death.
        tick: u32,
        /// Agent.
        agent_id: AgentId,
        /// Cause.
        cause: DeathCause,
    },

    /// Agent ate an apple.
    AppleEaten {
        /// Tick.
        tick: u32,
        /// Agent.
        agent_id: AgentId,
        /// Score after eating.
        new_score: u32,
    },
}

impl MatchTranscript {
    /// Create a new transcript from match metadata.
    pub fn new(metadata: MatchMetadata, initial_hash: StateHash) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            metadata,
            initial_hash,
            moves: Vec::new(),
            checkpoints: Vec::new(),
            result: None,
            events: Vec::new(),
        }
    }

    /// Record the resolved moves of one tick.
    pub fn record_moves<'a>(
        &mut self,
        tick: u32,
        moves: impl IntoIterator<Item = (&'a AgentId, &'a MoveRecord)>,
    ) {
        self.moves.push(TickMoves {
            tick,
            moves: moves.into_iter().map(|(id, r)| (*id, r.resolved)).collect(),
        });
    }

    /// Record a state checkpoint.
    pub fn add_checkpoint(&mut self, tick: u32, state_hash: StateHash, rng_state: [u64; 2]) {
        self.checkpoints.push(StateCheckpoint {
            tick,
            state_hash,
            rng_state,
        });
    }

    /// Record a game event.
    ///
    /// Only significant events are kept.
    pub fn record_event(&mut self, event: &GameEvent) {
        if let Some(transcript_event) = TranscriptEvent::from_game_event(event) {
            self.events.push(transcript_event);
        }
    }

    /// Finalize the transcript with match result.
    pub fn finalize(&mut self, result: MatchResult) {
        self.result = Some(result);
    }

    /// Check if transcript is complete.
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscriptError> {
        bincode::serialize(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TranscriptError> {
        let transcript: Self = bincode::deserialize(data)
            .map_err(|e| TranscriptError::DeserializationFailed(e.to_string()))?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(TranscriptError::VersionMismatch {
                expected: TRANSCRIPT_VERSION,
                got: transcript.version,
            });
        }
        Ok(transcript)
    }

    /// Resolved directions per tick, in the shape `replay_match` takes.
    pub fn move_table(&self) -> Vec<std::collections::BTreeMap<AgentId, Direction>> {
        self.moves
            .iter()
            .map(|t| t.moves.iter().copied().collect())
            .collect()
    }

    /// Get agent count.
    pub fn agent_count(&self) -> usize {
        self.metadata.agent_ids.len()
    }
}

impl TranscriptEvent {
    /// Convert a GameEvent to TranscriptEvent (if relevant).
    pub fn from_game_event(event: &GameEvent) -> Option<Self> {
        match &event.data {
            GameEventData::AgentDied { agent_id, cause, .. } => Some(TranscriptEvent::AgentDied {
                tick: event.tick,
                agent_id: *agent_id,
                cause: *cause,
            }),
            GameEventData::AppleEaten { agent_id, new_score, .. } => Some(TranscriptEvent::AppleEaten {
                tick: event.tick,
                agent_id: *agent_id,
                new_score: *new_score,
            }),
            // Other events are not recorded in transcript
            _ => None,
        }
    }
}

/// Errors that can occur with transcripts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// Serialization failed.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
    /// Deserialization failed.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
    /// Version mismatch.
    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version.
        expected: u8,
        /// Version found.
        got: u8,
    },
}
