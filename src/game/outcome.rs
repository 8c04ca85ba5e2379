//! Termination and Match Results
//!
//! When a match stops and who won it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::snake::Death;
use crate::game::state::{AgentId, MatchId, MatchState};

/// Per-participant result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Outcome {
    /// Won
    Won = 0,
    /// Tied
    Tied = 1,
    /// Lost
    Lost = 2,
}

impl Outcome {
    /// Lower-case name (`won`, `tied`, `lost`).
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Won => "won",
            Outcome::Tied => "tied",
            Outcome::Lost => "lost",
        }
    }

    /// The opponent's outcome in a two-player match.
    pub fn flipped(self) -> Outcome {
        match self {
            Outcome::Won => Outcome::Lost,
            Outcome::Tied => Outcome::Tied,
            Outcome::Lost => Outcome::Won,
        }
    }

    /// Actual score for pairwise rating: 1, 0.5 or 0.
    pub fn score(self) -> f64 {
        match self {
            Outcome::Won => 1.0,
            Outcome::Tied => 0.5,
            Outcome::Lost => 0.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a match stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// One agent left alive out of a field of two or more.
    LastSurvivor,
    /// Nobody left alive.
    AllDead,
    /// The tick cap was reached.
    MaxTicks,
}

/// Final line for one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResult {
    /// Agent
    pub agent_id: AgentId,
    /// Apples eaten
    pub score: u32,
    /// Won, lost or tied
    pub outcome: Outcome,
    /// Cause and tick, if the agent died
    pub death: Option<Death>,
    /// Body length at the end
    pub final_length: u32,
}

/// Produced exactly once, when a match terminates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Match identifier
    pub match_id: MatchId,
    /// Seed the match ran from
    pub rng_seed: u64,
    /// Participants in id order
    pub participants: Vec<ParticipantResult>,
    /// Ticks played
    pub ticks_played: u32,
    /// Why it stopped
    pub termination: TerminationReason,
    /// Hash of the final state
    pub final_hash: StateHash,
}

impl MatchResult {
    /// Look up one participant.
    pub fn participant(&self, id: &AgentId) -> Option<&ParticipantResult> {
        self.participants.iter().find(|p| p.agent_id == *id)
    }

    /// Outcome for one participant.
    pub fn outcome_of(&self, id: &AgentId) -> Option<Outcome> {
        self.participant(id).map(|p| p.outcome)
    }

    /// Winners, in id order.
    pub fn winners(&self) -> Vec<AgentId> {
        self.participants
            .iter()
            .filter(|p| p.outcome == Outcome::Won)
            .map(|p| p.agent_id)
            .collect()
    }

    /// True if every participant tied.
    pub fn is_draw(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.outcome == Outcome::Tied)
    }
}

/// Check whether the match is over after the latest tick.
///
/// Order: nobody alive, then a lone survivor of a multi-agent field, then the
/// tick cap.
pub fn check_termination(state: &MatchState, max_ticks: u32) -> Option<TerminationReason> {
    let alive = state.alive_count();

    if alive == 0 {
        Some(TerminationReason::AllDead)
    } else if alive == 1 && state.field_size() >= 2 {
        Some(TerminationReason::LastSurvivor)
    } else if state.tick >= max_ticks {
        Some(TerminationReason::MaxTicks)
    } else {
        None
    }
}

/// Assign an outcome to every participant.
pub fn adjudicate(state: &MatchState, reason: TerminationReason) -> BTreeMap<AgentId, Outcome> {
    let mut outcomes = BTreeMap::new();

    match reason {
        TerminationReason::LastSurvivor => {
            for (id, snake) in &state.snakes {
                let outcome = if snake.alive { Outcome::Won } else { Outcome::Lost };
                outcomes.insert(*id, outcome);
            }
        }
        TerminationReason::AllDead => {
            // Those who died on the final tick share it; alone, it is a loss.
            let final_tick = state.tick;
            let last_deaths = state
                .snakes
                .values()
                .filter(|s| s.death.map(|d| d.tick) == Some(final_tick))
                .count();
            for (id, snake) in &state.snakes {
                let died_last = snake.death.map(|d| d.tick) == Some(final_tick);
                let outcome = if died_last && last_deaths >= 2 {
                    Outcome::Tied
                } else {
                    Outcome::Lost
                };
                outcomes.insert(*id, outcome);
            }
        }
        TerminationReason::MaxTicks => {
            let alive: Vec<(&AgentId, u32)> = state
                .snakes
                .iter()
                .filter(|(_, s)| s.alive)
                .map(|(id, s)| (id, s.score))
                .collect();
            let top = alive.iter().map(|(_, score)| *score).max();
            let leaders = alive
                .iter()
                .filter(|(_, score)| Some(*score) == top)
                .count();

            for (id, snake) in &state.snakes {
                let outcome = if !snake.alive || Some(snake.score) != top {
                    Outcome::Lost
                } else if leaders == 1 {
                    Outcome::Won
                } else {
                    Outcome::Tied
                };
                outcomes.insert(*id, outcome);
            }
        }
    }

    outcomes
}

/// Build the result record from a terminated state.
pub fn build_result(state: &MatchState, reason: TerminationReason) -> MatchResult {
    let outcomes = adjudicate(state, reason);

    let participants = state
        .snakes
        .iter()
        .map(|(id, snake)| ParticipantResult {
            agent_id: *id,
            score: snake.score,
            outcome: outcomes.get(id).copied().unwrap_or(Outcome::Lost),
            death: snake.death,
            final_length: snake.len() as u32,
        })
        .collect();

    MatchResult {
        match_id: state.match_id,
        rng_seed: state.rng_seed,
        participants,
        ticks_played: state.tick,
        termination: reason,
        final_hash: state.compute_hash(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snake::DeathCause;
    use crate::game::state::MatchId;
    use crate::game::tick::MatchConfig;

    fn id(n: u8) -> AgentId {
        AgentId::new([n; 16])
    }

    fn state(n: u8) -> MatchState {
        let ids: Vec<AgentId> = (1..=n).map(id).collect();
        MatchState::new(MatchId::default(), &MatchConfig::default(), &ids, 3).unwrap()
    }

    #[test]
    fn test_no_termination_mid_match() {
        let mut s = state(2);
        s.tick = 5;
        assert_eq!(check_termination(&s, 100), None);
    }

    #[test]
    fn test_last_survivor_wins() {
        let mut s = state(3);
        s.tick = 7;
        s.snakes.get_mut(&id(1)).unwrap().kill(DeathCause::Wall, 3);
        s.snakes.get_mut(&id(3)).unwrap().kill(DeathCause::BodyCollision, 7);

        assert_eq!(check_termination(&s, 100), Some(TerminationReason::LastSurvivor));
        let result = build_result(&s, TerminationReason::LastSurvivor);
        assert_eq!(result.winners(), vec![id(2)]);
        assert_eq!(result.outcome_of(&id(1)), Some(Outcome::Lost));
        assert_eq!(result.outcome_of(&id(3)), Some(Outcome::Lost));
    }

    #[test]
    fn test_simultaneous_final_deaths_tie() {
        let mut s = state(2);
        s.tick = 9;
        for n in 1..=2 {
            s.snakes.get_mut(&id(n)).unwrap().kill(DeathCause::HeadCollision, 9);
        }
        assert_eq!(check_termination(&s, 100), Some(TerminationReason::AllDead));
        let result = build_result(&s, TerminationReason::AllDead);
        assert!(result.is_draw());
    }

    #[test]
    fn test_single_agent_death_is_loss() {
        let mut s = state(1);
        s.tick = 1;
        s.snakes.get_mut(&id(1)).unwrap().kill(DeathCause::Wall, 1);
        assert_eq!(check_termination(&s, 100), Some(TerminationReason::AllDead));
        let result = build_result(&s, TerminationReason::AllDead);
        assert_eq!(result.outcome_of(&id(1)), Some(Outcome::Lost));
    }

    #[test]
    fn test_single_agent_field_keeps_running() {
        let mut s = state(1);
        s.tick = 4;
        assert_eq!(check_termination(&s, 100), None);
        s.tick = 100;
        assert_eq!(check_termination(&s, 100), Some(TerminationReason::MaxTicks));
        let result = build_result(&s, TerminationReason::MaxTicks);
        assert_eq!(result.winners(), vec![id(1)]);
    }

    #[test]
    fn test_tick_cap_scores() {
        let mut s = state(3);
        s.tick = 100;
        s.snakes.get_mut(&id(1)).unwrap().score = 4;
        s.snakes.get_mut(&id(2)).unwrap().score = 4;
        s.snakes.get_mut(&id(3)).unwrap().score = 2;

        let outcomes = adjudicate(&s, TerminationReason::MaxTicks);
        assert_eq!(outcomes[&id(1)], Outcome::Tied);
        assert_eq!(outcomes[&id(2)], Outcome::Tied);
        assert_eq!(outcomes[&id(3)], Outcome::Lost);

        s.snakes.get_mut(&id(2)).unwrap().score = 5;
        let outcomes = adjudicate(&s, TerminationReason::MaxTicks);
        assert_eq!(outcomes[&id(2)], Outcome::Won);
        assert_eq!(outcomes[&id(1)], Outcome::Lost);
    }

    #[test]
    fn test_dead_high_scorer_loses_at_cap() {
        let mut s = state(3);
        s.tick = 100;
        s.snakes.get_mut(&id(1)).unwrap().score = 9;
        s.snakes.get_mut(&id(1)).unwrap().kill(DeathCause::Wall, 50);
        s.snakes.get_mut(&id(2)).unwrap().score = 1;

        let outcomes = adjudicate(&s, TerminationReason::MaxTicks);
        assert_eq!(outcomes[&id(1)], Outcome::Lost);
        assert_eq!(outcomes[&id(2)], Outcome::Won);
        assert_eq!(outcomes[&id(3)], Outcome::Lost);
    }

    #[test]
    fn test_outcome_flip_and_score() {
        assert_eq!(Outcome::Won.flipped(), Outcome::Lost);
        assert_eq!(Outcome::Tied.flipped(), Outcome::Tied);
        assert_eq!(Outcome::Lost.score(), 0.0);
    }
}
