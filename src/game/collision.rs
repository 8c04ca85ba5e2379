//! Collision Detection
//!
//! Works on the *proposed* board: every moving agent's body after its move,
//! computed before anything is committed. Each agent is judged on its own;
//! one agent's death never saves another.

use std::collections::BTreeMap;

use crate::game::board::{Board, Cell, Direction};
use crate::game::snake::DeathCause;
use crate::game::state::{AgentId, MatchState};

/// One agent's move, before it is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    /// Resolved direction.
    pub direction: Direction,
    /// Candidate head cell (may be off the board).
    pub head: Cell,
    /// True if the candidate head is on an apple.
    pub grows: bool,
    /// Body after the move, head first.
    pub body: Vec<Cell>,
}

/// Build proposals for every living agent that has a resolved direction.
pub fn propose_moves(
    state: &MatchState,
    moves: &BTreeMap<AgentId, Direction>,
) -> BTreeMap<AgentId, Proposal> {
    let mut proposals = BTreeMap::new();

    for (id, snake) in state.snakes.iter().filter(|(_, s)| s.alive) {
        let Some(direction) = moves.get(id).copied() else {
            continue;
        };
        let head = snake.head().step(direction);
        let grows = state.apples.contains(&head);
        proposals.insert(
            *id,
            Proposal {
                direction,
                head,
                grows,
                body: snake.proposed_body(head, grows),
            },
        );
    }

    proposals
}

/// Decide who dies this tick.
///
/// Per agent, the first matching cause wins:
/// 1. head off the board
/// 2. head on its own proposed body (the vacated tail excluded)
/// 3. head shares a cell with another candidate head (everyone there dies)
/// 4. head on another agent's proposed body
pub fn detect_deaths(
    board: &Board,
    proposals: &BTreeMap<AgentId, Proposal>,
) -> BTreeMap<AgentId, DeathCause> {
    let mut head_counts: BTreeMap<Cell, usize> = BTreeMap::new();
    for proposal in proposals.values() {
        if board.contains(proposal.head) {
            *head_counts.entry(proposal.head).or_insert(0) += 1;
        }
    }

    let mut deaths = BTreeMap::new();

    for (id, proposal) in proposals {
        let head = proposal.head;

        let cause = if !board.contains(head) {
            Some(DeathCause::Wall)
        } else if proposal.body[1..].contains(&head) {
            Some(DeathCause::SelfCollision)
        } else if head_counts.get(&head).copied().unwrap_or(0) > 1 {
            Some(DeathCause::HeadCollision)
        } else if proposals
            .iter()
            .filter(|(other, _)| *other != id)
            .any(|(_, p)| p.body[1..].contains(&head))
        {
            Some(DeathCause::BodyCollision)
        } else {
            None
        };

        if let Some(cause) = cause {
            deaths.insert(*id, cause);
        }
    }

    deaths
}

// =============================================================================
// TESTS
// =============================================================================
