//! Round Engine
//!
//! Resolves one simultaneous tick. Given the same state and the same resolved
//! moves, a tick always produces the same snapshot.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::apple::{consume_apple, replenish_apples};
use crate::game::board::{Board, BoardError, Direction};
use crate::game::collision::{detect_deaths, propose_moves};
use crate::game::events::{GameEvent, sort_events};
use crate::game::input::{MoveIntent, MoveRecord, resolve_intent};
use crate::game::outcome::{MatchResult, build_result, check_termination};
use crate::game::snake::Death;
use crate::game::state::{AgentId, MatchId, MatchState, Snapshot};

/// Board and rule parameters for one match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Board columns
    pub width: u32,
    /// Board rows
    pub height: u32,
    /// Apples kept on the board
    pub apple_target: u32,
    /// Tick cap
    pub max_ticks: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            apple_target: 5,
            max_ticks: 100,
        }
    }
}

impl MatchConfig {
    /// Validated board rectangle.
    pub fn board(&self) -> Result<Board, BoardError> {
        Board::new(self.width, self.height)
    }

    /// Hash of the rules, stored in transcripts.
    pub fn config_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_config();
        hasher.update_u32(self.width);
        hasher.update_u32(self.height);
        hasher.update_u32(self.apple_target);
        hasher.update_u32(self.max_ticks);
        hasher.finalize()
    }
}

/// Result of a tick.
#[derive(Clone, Debug)]
pub struct TickResult {
    /// The new immutable snapshot
    pub snapshot: Snapshot,
    /// Agents that died this tick
    pub deaths: BTreeMap<AgentId, Death>,
    /// Agents that grew this tick
    pub grew: Vec<AgentId>,
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The match state (will be mutated)
/// * `moves` - Resolved move per living agent (BTreeMap for deterministic order!)
///
/// Living agents without an entry get a `Missing` fallback drawn from the
/// fallback stream. Entries for dead agents are ignored.
///
/// # Determinism
///
/// Apple draws come from `state.rng` and substitute moves from
/// `state.fallback_rng`, both in agent-id order.
pub fn tick(state: &mut MatchState, mut moves: BTreeMap<AgentId, MoveRecord>) -> TickResult {
    // 0. Advance tick counter
    state.tick += 1;
    let now = state.tick;

    let missing = MoveIntent::missing();
    for (id, snake) in state.snakes.iter().filter(|(_, s)| s.alive) {
        if !moves.contains_key(id) {
            moves.insert(*id, resolve_intent(snake, &missing, &mut state.fallback_rng));
        }
    }

    let mut events = Vec::new();

    // 1. Record substitutions
    for (id, record) in &moves {
        if let Some(reason) = record.fallback {
            events.push(GameEvent::move_substituted(now, *id, reason, record.resolved));
        }
    }

    // 2. Build the proposed board
    let directions: BTreeMap<AgentId, Direction> = moves
        .iter()
        .map(|(id, record)| (*id, record.resolved))
        .collect();
    let proposals = propose_moves(state, &directions);

    // 3. Detect deaths on it
    let causes = detect_deaths(&state.board, &proposals);
    let mut deaths = BTreeMap::new();
    for (id, cause) in &causes {
        if let Some(snake) = state.snakes.get_mut(id) {
            snake.kill(*cause, now);
            deaths.insert(*id, Death { cause: *cause, tick: now });
        }
        if let Some(proposal) = proposals.get(id) {
            info!(agent = %id, tick = now, cause = %cause, at = %proposal.head, "Agent died");
            events.push(GameEvent::agent_died(now, *id, *cause, proposal.head));
        }
    }

    // 4. Commit survivors' moves
    let mut grew = Vec::new();
    for (id, proposal) in &proposals {
        if causes.contains_key(id) {
            continue;
        }
        let Some(snake) = state.snakes.get_mut(id) else {
            continue;
        };
        snake.advance(proposal.direction, proposal.grows);
        if proposal.grows {
            snake.score += 1;
            let new_score = snake.score;
            consume_apple(state, proposal.head);
            events.push(GameEvent::apple_eaten(now, *id, proposal.head, new_score));
            grew.push(*id);
        }
    }

    // 5. Replenish apples
    for cell in replenish_apples(state) {
        events.push(GameEvent::apple_spawned(now, cell));
    }

    sort_events(&mut events);
    let snapshot = state.snapshot(moves, events);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(tick = now, "\n{}", snapshot);

    debug!(
        tick = now,
        alive = state.alive_count(),
        hash = %crate::core::hash::short_hex(&snapshot.hash),
        "Tick resolved"
    );

    TickResult { snapshot, deaths, grew }
}

/// Output of a replay.
#[derive(Clone, Debug)]
pub struct Replay {
    /// Snapshots from tick 0 on
    pub snapshots: Vec<Snapshot>,
    /// Set if the match terminated within the supplied moves
    pub result: Option<MatchResult>,
}

/// Re-run a match from its seed and its recorded resolved directions.
///
/// Stops at termination even if more moves are supplied.
pub fn replay_match(
    match_id: MatchId,
    config: &MatchConfig,
    agents: &[AgentId],
    rng_seed: u64,
    moves: &[BTreeMap<AgentId, Direction>],
) -> Result<Replay, BoardError> {
    let mut state = MatchState::new(match_id, config, agents, rng_seed)?;
    let mut snapshots = vec![state.snapshot(BTreeMap::new(), Vec::new())];
    let mut result = None;

    for tick_moves in moves {
        let records = tick_moves
            .iter()
            .map(|(id, direction)| (*id, MoveRecord::resolved(*direction)))
            .collect();
        snapshots.push(tick(&mut state, records).snapshot);

        if let Some(reason) = check_termination(&state, config.max_ticks) {
            result = Some(build_result(&state, reason));
            break;
        }
    }

    Ok(Replay { snapshots, result })
}

// =============================================================================
// TESTS
// =============================================================================
