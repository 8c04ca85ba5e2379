//! Binary-search placement state.
//!
//! The entrant's rank is bracketed by `[low, high]` over the `N` ranked
//! agents (0 is best). Each match against the agent near the middle halves
//! the bracket: a win moves `high` above the opponent, a loss moves `low`
//! below it, a tie narrows the bracket to within three ranks of it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::outcome::Outcome;
use crate::game::state::{AgentId, MatchId};
use crate::rating::ladder::SkillRecord;

/// Default number of placement matches.
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Ranks a tie narrows the bracket to on either side of the opponent.
pub const TIE_WINDOW: usize = 3;

/// One placement match as seen by the search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementStep {
    /// Match played.
    pub match_id: MatchId,
    /// Opponent faced.
    pub opponent: AgentId,
    /// Opponent's rank at the time.
    pub opponent_rank: usize,
    /// Entrant's outcome.
    pub outcome: Outcome,
    /// Bracket after the update.
    pub low: usize,
    /// Bracket after the update.
    pub high: usize,
}

/// Per-entrant search state. Owned by a single placement run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementState {
    /// Agent being placed.
    pub agent_id: AgentId,
    /// Best rank still possible.
    pub low: usize,
    /// Worst rank still possible.
    pub high: usize,
    /// Matches left in the budget.
    pub attempts_remaining: u32,
    /// Opponents already faced.
    pub faced: BTreeSet<AgentId>,
    /// Matches played so far.
    pub steps: Vec<PlacementStep>,
    /// Set once placement is over.
    pub final_rank: Option<usize>,
}

impl PlacementState {
    /// Start a search over a ladder of `ladder_size` ranked agents.
    ///
    /// An empty ladder places the entrant at rank 0 immediately.
    pub fn new(agent_id: AgentId, ladder_size: usize, attempts: u32) -> Self {
        let mut state = Self {
            agent_id,
            low: 0,
            high: ladder_size.saturating_sub(1),
            attempts_remaining: attempts,
            faced: BTreeSet::new(),
            steps: Vec::new(),
            final_rank: None,
        };
        if ladder_size == 0 {
            state.final_rank = Some(0);
        } else if attempts == 0 {
            state.final_rank = Some(state.midpoint());
        }
        state
    }

    /// Is placement over?
    pub fn is_complete(&self) -> bool {
        self.final_rank.is_some()
    }

    /// Matches played.
    pub fn matches_played(&self) -> usize {
        self.steps.len()
    }

    fn midpoint(&self) -> usize {
        (self.low + self.high) / 2
    }

    /// Rank to look for an opponent at, clamped to `[0, ladder_size - 1]`.
    pub fn target_rank(&self, ladder_size: usize) -> usize {
        self.midpoint().min(ladder_size.saturating_sub(1))
    }

    /// Pick an opponent from `ranked` (best first).
    ///
    /// Prefers agents inside the bracket, then agents not yet faced, then the
    /// one closest to the target rank (lower rank on equal distance). The
    /// entrant itself is never picked.
    pub fn select_opponent(&self, ranked: &[SkillRecord]) -> Option<(usize, AgentId)> {
        let candidates: Vec<(usize, AgentId)> = ranked
            .iter()
            .enumerate()
            .filter(|(_, r)| r.agent_id != self.agent_id)
            .map(|(rank, r)| (rank, r.agent_id))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let target = self.target_rank(ranked.len());
        let in_bracket: Vec<(usize, AgentId)> = candidates
            .iter()
            .copied()
            .filter(|(rank, _)| (self.low..=self.high).contains(rank))
            .collect();
        let pool = if in_bracket.is_empty() { candidates } else { in_bracket };

        let fresh: Vec<(usize, AgentId)> = pool.iter().copied().filter(|(_, id)| !self.faced.contains(id)).collect();
        let pool = if fresh.is_empty() { pool } else { fresh };

        pool.into_iter().min_by_key(|(rank, _)| (rank.abs_diff(target), *rank))
    }

    /// Feed one match result into the search.
    ///
    /// Consumes one attempt and completes the search once the bracket
    /// collapses or the budget runs out.
    pub fn record(
        &mut self,
        match_id: MatchId,
        opponent: AgentId,
        opponent_rank: usize,
        outcome: Outcome,
        ladder_size: usize,
    ) {
        let (low, high) = update_interval(self.low, self.high, opponent_rank, outcome, ladder_size);
        self.low = low;
        self.high = high;
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        self.faced.insert(opponent);
        self.steps.push(PlacementStep {
            match_id,
            opponent,
            opponent_rank,
            outcome,
            low,
            high,
        });

        if self.low >= self.high {
            self.final_rank = Some(self.low);
        } else if self.attempts_remaining == 0 {
            self.final_rank = Some(self.midpoint());
        }
    }

    /// Close the search now, at the bracket midpoint if still open.
    pub fn finish(&mut self) -> usize {
        let rank = self.final_rank.unwrap_or_else(|| if self.low >= self.high { self.low } else { self.midpoint() });
        self.final_rank = Some(rank);
        rank
    }
}

/// Narrow `[low, high]` after a match against the agent at `opponent_rank`.
///
/// The result is clamped to `[0, ladder_size - 1]`. If it would cross
/// (`low > high`), it collapses onto the opponent's rank.
pub fn update_interval(
    low: usize,
    high: usize,
    opponent_rank: usize,
    outcome: Outcome,
    ladder_size: usize,
) -> (usize, usize) {
    let last = ladder_size.saturating_sub(1);
    let opponent_rank = opponent_rank.min(last);

    let (low, high) = match outcome {
        Outcome::Won if opponent_rank == 0 => (0, 0),
        Outcome::Won => (low, opponent_rank - 1),
        Outcome::Lost if opponent_rank == last => (last, last),
        Outcome::Lost => (opponent_rank + 1, high),
        Outcome::Tied => (
            low.max(opponent_rank.saturating_sub(TIE_WINDOW)),
            high.min(opponent_rank + TIE_WINDOW),
        ),
    };

    let (low, high) = (low.min(last), high.min(last));
    if low > high { (opponent_rank, opponent_rank) } else { (low, high) }
}
