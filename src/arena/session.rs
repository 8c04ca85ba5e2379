//! Match Session
//!
//! Drives one match through `Initializing -> Running -> Terminated`. Each tick
//! asks every living agent for a move concurrently, each under its own
//! timeout, then hands the resolved moves to the round engine. A match can
//! also be `Aborted`, in which case it produces no result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::arena::agent::{AgentError, AgentHandle};
use crate::core::hash::short_hex;
use crate::core::rng::derive_match_seed;
use crate::game::board::BoardError;
use crate::game::input::{FallbackReason, MoveIntent, resolve_intents};
use crate::game::outcome::{MatchResult, build_result, check_termination};
use crate::game::state::{AgentId, MatchId, MatchState, SharedSnapshot};
use crate::game::tick::{MatchConfig, TickResult, tick};
use crate::proof::transcript::{CHECKPOINT_INTERVAL, MatchMetadata, MatchTranscript};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Board being built.
    Initializing,
    /// Ticks in progress.
    Running,
    /// Finished with a result.
    Terminated,
    /// Cancelled; no result.
    Aborted,
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Board and rule parameters.
    pub match_config: MatchConfig,
    /// Per-move collaborator deadline.
    pub move_timeout: Duration,
    /// Whole-match deadline; exceeding it aborts the match.
    pub match_timeout: Option<Duration>,
    /// Record a transcript.
    pub record_transcript: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            move_timeout: Duration::from_secs(5),
            match_timeout: None,
            record_transcript: true,
        }
    }
}

/// Everything a finished match hands back.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// The result record.
    pub result: MatchResult,
    /// Snapshots from tick 0 to the last tick.
    pub history: Vec<SharedSnapshot>,
    /// Transcript, if recorded.
    pub transcript: Option<MatchTranscript>,
}

/// A match session.
pub struct MatchSession {
    /// Current state.
    state: SessionState,
    /// Session configuration.
    config: SessionConfig,
    /// Agents by id (BTreeMap for deterministic order).
    agents: BTreeMap<AgentId, AgentHandle>,
    /// Simulation state.
    game_state: MatchState,
    /// Snapshot history, tick 0 first.
    history: Vec<SharedSnapshot>,
    /// Transcript (if recording).
    transcript: Option<MatchTranscript>,
    /// Result once terminated.
    result: Option<MatchResult>,
}

impl MatchSession {
    /// Build the board and spawn every agent.
    ///
    /// The seed is derived from the match id and the sorted agent ids, so
    /// building the same match twice yields the same board.
    pub fn new(
        match_id: MatchId,
        config: SessionConfig,
        agents: Vec<(AgentId, AgentHandle)>,
    ) -> Result<Self, ArenaError> {
        let mut roster: BTreeMap<AgentId, AgentHandle> = BTreeMap::new();
        for (id, agent) in agents {
            if roster.insert(id, agent).is_some() {
                return Err(BoardError::DuplicateAgent(id.to_uuid_string()).into());
            }
        }

        let ids: Vec<AgentId> = roster.keys().copied().collect();
        let id_bytes: Vec<[u8; 16]> = ids.iter().map(|id| *id.as_bytes()).collect();
        let rng_seed = derive_match_seed(match_id.as_bytes(), &id_bytes);

        let game_state = MatchState::new(match_id, &config.match_config, &ids, rng_seed)?;
        let initial = Arc::new(game_state.snapshot(BTreeMap::new(), Vec::new()));

        let transcript = config.record_transcript.then(|| {
            let metadata = MatchMetadata {
                match_id,
                agent_ids: ids.clone(),
                rng_seed,
                start_timestamp: chrono::Utc::now().timestamp(),
                config: config.match_config,
                config_hash: config.match_config.config_hash(),
            };
            MatchTranscript::new(metadata, initial.hash)
        });

        info!(
            match_id = %match_id,
            agents = ids.len(),
            seed = rng_seed,
            width = config.match_config.width,
            height = config.match_config.height,
            "Match initialized"
        );

        let mut session = Self {
            state: SessionState::Initializing,
            config,
            agents: roster,
            game_state,
            history: vec![initial],
            transcript,
            result: None,
        };
        session.state = SessionState::Running;
        Ok(session)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Match identifier.
    pub fn match_id(&self) -> MatchId {
        self.game_state.match_id
    }

    /// Snapshots so far.
    pub fn history(&self) -> &[SharedSnapshot] {
        &self.history
    }

    /// Latest snapshot.
    pub fn latest(&self) -> Option<&SharedSnapshot> {
        self.history.last()
    }

    /// Result, once terminated.
    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// Ask every living agent for a move, concurrently.
    ///
    /// Failures and timeouts come back as unusable intents.
    pub async fn gather_intents(&self) -> BTreeMap<AgentId, MoveIntent> {
        let Some(view) = self.history.last().cloned() else {
            return BTreeMap::new();
        };
        let timeout = self.config.move_timeout;

        let requests = self.game_state.alive_agents().into_iter().filter_map(|id| {
            let agent = self.agents.get(&id)?.clone();
            let view = view.clone();
            Some(async move {
                let intent = match tokio::time::timeout(timeout, agent.request_move(view, id)).await {
                    Ok(Ok(reply)) => reply.into_intent(),
                    Ok(Err(AgentError::Timeout(_))) | Err(_) => {
                        warn!(agent = %id, name = agent.name(), ?timeout, "Agent timed out");
                        MoveIntent::unusable(FallbackReason::Timeout)
                    }
                    Ok(Err(e)) => {
                        warn!(agent = %id, name = agent.name(), error = %e, "Agent failed");
                        MoveIntent::unusable(FallbackReason::AgentFailed)
                    }
                };
                (id, intent)
            })
        });

        join_all(requests).await.into_iter().collect()
    }

    /// Run one tick with the given intents.
    ///
    /// Synchronous core of [`step`](Self::step); also used directly by tests
    /// and benchmarks.
    pub fn apply_intents(&mut self, intents: &BTreeMap<AgentId, MoveIntent>) -> Result<TickResult, ArenaError> {
        if self.state != SessionState::Running {
            return Err(ArenaError::InvalidState(self.state));
        }

        let resolved = resolve_intents(&mut self.game_state, intents);
        if let Some(ref mut transcript) = self.transcript {
            transcript.record_moves(self.game_state.tick + 1, resolved.iter());
        }

        let result = tick(&mut self.game_state, resolved);
        let now = self.game_state.tick;

        if let Some(ref mut transcript) = self.transcript {
            for event in &result.snapshot.events {
                transcript.record_event(event);
            }
            if now % CHECKPOINT_INTERVAL == 0 {
                transcript.add_checkpoint(now, result.snapshot.hash, self.game_state.rng.state());
            }
        }

        self.history.push(Arc::new(result.snapshot.clone()));

        if let Some(reason) = check_termination(&self.game_state, self.config.match_config.max_ticks) {
            let match_result = build_result(&self.game_state, reason);
            info!(
                match_id = %self.game_state.match_id,
                ticks = now,
                ?reason,
                winners = ?match_result.winners().iter().map(|w| w.short()).collect::<Vec<_>>(),
                hash = %short_hex(&match_result.final_hash),
                "Match terminated"
            );
            if let Some(ref mut transcript) = self.transcript {
                transcript.finalize(match_result.clone());
            }
            self.result = Some(match_result);
            self.state = SessionState::Terminated;
        }

        Ok(result)
    }

    /// Gather moves and run one tick.
    pub async fn step(&mut self) -> Result<TickResult, ArenaError> {
        if self.state != SessionState::Running {
            return Err(ArenaError::InvalidState(self.state));
        }
        let intents = self.gather_intents().await;
        self.apply_intents(&intents)
    }

    /// Run until termination.
    #[instrument(skip(self), fields(match_id = %self.game_state.match_id))]
    pub async fn run(mut self) -> Result<MatchOutcome, ArenaError> {
        while self.state == SessionState::Running {
            self.step().await?;
        }
        self.into_outcome()
    }

    /// Cancel the match. It will never produce a result.
    pub fn abort(&mut self) {
        if self.state != SessionState::Terminated {
            debug!(match_id = %self.game_state.match_id, tick = self.game_state.tick, "Match aborted");
            self.state = SessionState::Aborted;
            self.result = None;
        }
    }

    /// Consume a terminated session.
    pub fn into_outcome(self) -> Result<MatchOutcome, ArenaError> {
        match (self.state, self.result) {
            (SessionState::Terminated, Some(result)) => Ok(MatchOutcome {
                result,
                history: self.history,
                transcript: self.transcript,
            }),
            (SessionState::Aborted, _) => Err(ArenaError::Aborted(self.game_state.match_id)),
            (state, _) => Err(ArenaError::InvalidState(state)),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The match could not be built; no tick ran.
    #[error("match construction failed: {0}")]
    Construction(#[from] BoardError),

    /// The match was cancelled before it terminated.
    #[error("match {0} aborted")]
    Aborted(MatchId),

    /// Operation not allowed in this state.
    #[error("invalid session state: {0:?}")]
    InvalidState(SessionState),

    /// Async runtime could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),
}
