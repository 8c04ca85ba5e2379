//! Placement controller: one match per `advance`.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::{info, instrument, warn};

use crate::arena::agent::AgentHandle;
use crate::arena::recorder::MatchRecorder;
use crate::arena::runner::run_match;
use crate::arena::session::{ArenaError, SessionConfig};
use crate::game::outcome::MatchResult;
use crate::game::state::{AgentId, MatchId};
use crate::placement::search::PlacementState;
use crate::rating::RatingError;
use crate::rating::ladder::{Ladder, LadderStatus};

/// Placement errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The agent is not in placement.
    #[error("agent {0} is not placing")]
    NotPlacing(AgentId),

    /// Placement already finished.
    #[error("placement of {0} already complete")]
    AlreadyComplete(AgentId),

    /// The match could not be played. No attempt was consumed.
    #[error("placement match failed: {0}")]
    MatchFailed(#[from] ArenaError),

    /// Rating update failed.
    #[error("rating update failed: {0}")]
    Rating(#[from] RatingError),

    /// The match result does not include the entrant.
    #[error("entrant {0} missing from match result")]
    MissingEntrant(AgentId),

    /// Too many matches in a row could not be played.
    #[error("gave up placing {agent} after {failures} failed matches")]
    TooManyFailures {
        /// Entrant.
        agent: AgentId,
        /// Consecutive failures.
        failures: u32,
    },
}

/// Plays placement matches.
pub trait MatchHost: Send + Sync {
    /// Play one match between `entrant` and `opponent`.
    fn play(&self, match_id: MatchId, entrant: AgentId, opponent: AgentId) -> BoxFuture<'_, Result<MatchResult, ArenaError>>;
}

/// Hosts placement matches on the arena with registered agents.
pub struct ArenaHost {
    config: SessionConfig,
    agents: BTreeMap<AgentId, AgentHandle>,
    recorder: Arc<dyn MatchRecorder>,
}

impl ArenaHost {
    /// Create a host for `agents`.
    pub fn new(config: SessionConfig, agents: BTreeMap<AgentId, AgentHandle>, recorder: Arc<dyn MatchRecorder>) -> Self {
        Self { config, agents, recorder }
    }
}

impl MatchHost for ArenaHost {
    fn play(&self, match_id: MatchId, entrant: AgentId, opponent: AgentId) -> BoxFuture<'_, Result<MatchResult, ArenaError>> {
        async move {
            let mut roster = Vec::with_capacity(2);
            for id in [entrant, opponent] {
                let agent = self
                    .agents
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ArenaError::Runtime(format!("no agent registered for {id}")))?;
                roster.push((id, agent));
            }
            let outcome = run_match(match_id, self.config.clone(), roster, self.recorder.as_ref()).await?;
            Ok::<_, ArenaError>(outcome.result)
        }
        .boxed()
    }
}

/// What one call to [`advance`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementProgress {
    /// Updated search state.
    pub state: PlacementState,
    /// Placement finished and the entrant is ranked.
    pub complete: bool,
}

/// Advance placement by exactly one match.
///
/// Picks an opponent near the middle of the bracket, plays, rates the result,
/// and narrows the bracket. When the search completes the entrant is promoted
/// onto the ranked ladder. A failed match leaves the state untouched.
#[instrument(skip_all, fields(entrant = %state.agent_id))]
pub async fn advance(
    mut state: PlacementState,
    ladder: &Ladder,
    host: &dyn MatchHost,
) -> Result<PlacementProgress, PlacementError> {
    let entrant = state.agent_id;
    if state.is_complete() {
        return Err(PlacementError::AlreadyComplete(entrant));
    }
    match ladder.record(entrant).await {
        Some(record) if record.status == LadderStatus::Placing => {}
        Some(_) => return Err(PlacementError::NotPlacing(entrant)),
        None => return Err(RatingError::UnknownAgent(entrant).into()),
    }

    let ranked: Vec<_> = ladder
        .ranked_view()
        .await
        .into_iter()
        .filter(|r| r.agent_id != entrant)
        .collect();

    let Some((opponent_rank, opponent)) = state.select_opponent(&ranked) else {
        // Nobody to play: top of an empty ladder
        state.final_rank = Some(0);
        ladder.promote(entrant, 0).await?;
        info!(agent = %entrant, "Ladder empty, placed at rank 0");
        return Ok(PlacementProgress { state, complete: true });
    };

    let match_id = MatchId::random();
    let result = host.play(match_id, entrant, opponent).await.map_err(|e| {
        warn!(agent = %entrant, opponent = %opponent, error = %e, "Placement match failed");
        PlacementError::from(e)
    })?;

    let outcome = result.outcome_of(&entrant).ok_or(PlacementError::MissingEntrant(entrant))?;
    ladder.apply_result(&result).await?;

    state.record(result.match_id, opponent, opponent_rank, outcome, ranked.len());
    info!(
        agent = %entrant,
        opponent = %opponent,
        opponent_rank,
        %outcome,
        low = state.low,
        high = state.high,
        attempts_remaining = state.attempts_remaining,
        "Placement step"
    );

    let complete = if let Some(rank) = state.final_rank {
        ladder.promote(entrant, rank).await?;
        info!(agent = %entrant, rank, matches = state.matches_played(), "Placement complete");
        true
    } else {
        false
    };

    Ok(PlacementProgress { state, complete })
}

/// Place an entrant from scratch, looping [`advance`] until done.
///
/// Registers the entrant if needed. Gives up after `attempts` consecutive
/// failed matches.
pub async fn run_placement(
    entrant: AgentId,
    ladder: &Ladder,
    host: &dyn MatchHost,
    attempts: u32,
) -> Result<PlacementState, PlacementError> {
    if ladder.record(entrant).await.is_none() {
        ladder.register_entrant(entrant).await?;
    }

    let ranked = ladder.ranked_view().await.iter().filter(|r| r.agent_id != entrant).count();
    let mut state = PlacementState::new(entrant, ranked, attempts.max(1));
    let mut failures = 0;

    loop {
        match advance(state.clone(), ladder, host).await {
            Ok(progress) => {
                failures = 0;
                state = progress.state;
                if progress.complete {
                    return Ok(state);
                }
            }
            Err(PlacementError::MatchFailed(_)) if failures + 1 < attempts.max(1) => failures += 1,
            Err(PlacementError::MatchFailed(_)) => {
                return Err(PlacementError::TooManyFailures {
                    agent: entrant,
                    failures: failures + 1,
                });
            }
            Err(PlacementError::AlreadyComplete(_)) => {
                // Born complete on an empty ladder
                let rank = state.finish();
                ladder.promote(entrant, rank).await?;
                return Ok(state);
            }
            Err(e) => return Err(e),
        }
    }
}
