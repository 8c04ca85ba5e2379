//! Game Events
//!
//! Events generated during a tick for logs, records and replay checks.

use serde::{Serialize, Deserialize};

use crate::game::board::{Cell, Direction};
use crate::game::input::FallbackReason;
use crate::game::snake::DeathCause;
use crate::game::state::AgentId;

/// Priority for event ordering within a tick.
///
/// Lower value = listed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Substituted moves, known before anything moves
    MoveSubstituted = 0,
    /// Deaths
    AgentDeath = 1,
    /// Then pickups
    AppleEaten = 2,
    /// Then replenishment
    AppleSpawned = 3,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// The engine replaced an agent's intent
    MoveSubstituted {
        /// Agent whose move was replaced
        agent_id: AgentId,
        /// Why the intent was unusable
        reason: FallbackReason,
        /// Direction actually applied
        direction: Direction,
    },

    /// Agent died
    AgentDied {
        /// Agent that died
        agent_id: AgentId,
        /// Cause of death
        cause: DeathCause,
        /// Candidate head that killed it
        at: Cell,
    },

    /// Agent ate an apple
    AppleEaten {
        /// Agent that ate
        agent_id: AgentId,
        /// Cell the apple was on
        cell: Cell,
        /// Score after eating
        new_score: u32,
    },

    /// Apple placed
    AppleSpawned {
        /// Cell the apple was placed on
        cell: Cell,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Ordering priority
    pub priority: EventPriority,

    /// Agent involved (for tie-breaking)
    pub agent_id: Option<AgentId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let agent_id = match &data {
            GameEventData::MoveSubstituted { agent_id, .. } => Some(*agent_id),
            GameEventData::AgentDied { agent_id, .. } => Some(*agent_id),
            GameEventData::AppleEaten { agent_id, .. } => Some(*agent_id),
            GameEventData::AppleSpawned { .. } => None,
        };

        Self {
            tick,
            priority,
            agent_id,
            data,
        }
    }

    /// Create move substituted event.
    pub fn move_substituted(tick: u32, agent_id: AgentId, reason: FallbackReason, direction: Direction) -> Self {
        Self::new(
            tick,
            EventPriority::MoveSubstituted,
            GameEventData::MoveSubstituted { agent_id, reason, direction },
        )
    }

    /// Create agent died event.
    pub fn agent_died(tick: u32, agent_id: AgentId, cause: DeathCause, at: Cell) -> Self {
        Self::new(
            tick,
            EventPriority::AgentDeath,
            GameEventData::AgentDied { agent_id, cause, at },
        )
    }

    /// Create apple eaten event.
    pub fn apple_eaten(tick: u32, agent_id: AgentId, cell: Cell, new_score: u32) -> Self {
        Self::new(
            tick,
            EventPriority::AppleEaten,
            GameEventData::AppleEaten { agent_id, cell, new_score },
        )
    }

    /// Create apple spawned event.
    pub fn apple_spawned(tick: u32, cell: Cell) -> Self {
        Self::new(tick, EventPriority::AppleSpawned, GameEventData::AppleSpawned { cell })
    }

    /// Sort key: tick, then priority, then agent.
    pub fn sort_key(&self) -> (u32, EventPriority, Option<AgentId>) {
        (self.tick, self.priority, self.agent_id)
    }
}

/// Stable sort into canonical order. Events with equal keys keep emission order.
pub fn sort_events(events: &mut [GameEvent]) {
    events.sort_by_key(GameEvent::sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let id1 = AgentId::new([1; 16]);
        let id2 = AgentId::new([2; 16]);

        let mut events = vec![
            GameEvent::apple_spawned(10, Cell::new(0, 0)),
            GameEvent::apple_eaten(10, id1, Cell::new(1, 1), 3),
            GameEvent::agent_died(10, id2, DeathCause::Wall, Cell::new(-1, 0)),
            GameEvent::agent_died(10, id1, DeathCause::HeadCollision, Cell::new(2, 2)),
            GameEvent::move_substituted(10, id2, FallbackReason::Timeout, Direction::Up),
        ];
        sort_events(&mut events);

        assert!(matches!(events[0].data, GameEventData::MoveSubstituted { .. }));
        // Same tick and priority, but id1 < id2
        assert_eq!(events[1].agent_id, Some(id1));
        assert_eq!(events[2].agent_id, Some(id2));
        assert!(matches!(events[3].data, GameEventData::AppleEaten { .. }));
        assert!(matches!(events[4].data, GameEventData::AppleSpawned { .. }));
    }

    #[test]
    fn test_priority_follows_tick_phases() {
        let id = AgentId::new([1; 16]);
        let phases = [
            GameEvent::move_substituted(3, id, FallbackReason::Missing, Direction::Left),
            GameEvent::agent_died(3, id, DeathCause::SelfCollision, Cell::new(1, 1)),
            GameEvent::apple_eaten(3, id, Cell::new(2, 2), 1),
            GameEvent::apple_spawned(3, Cell::new(4, 4)),
        ];
        let priorities: Vec<u8> = phases.iter().map(|e| e.priority as u8).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3]);
        assert_eq!(phases[3].agent_id, None);
    }
}
