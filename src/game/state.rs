//! Match State Definitions
//!
//! The mutable state a match evolves, and the immutable per-tick `Snapshot`
//! it publishes. Uses BTreeMap/BTreeSet for deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, StateHasher, compute_state_hash, short_hex};
use crate::game::apple::replenish_apples;
use crate::game::board::{Board, BoardError, Cell};
use crate::game::events::GameEvent;
use crate::game::input::MoveRecord;
use crate::game::snake::Snake;
use crate::game::tick::MatchConfig;

/// Salt mixed into the seed for the fallback-move stream.
const FALLBACK_STREAM_SALT: u64 = 0x5EED_FA11_BACC_0001;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique agent identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct AgentId(pub [u8; 16]);

impl AgentId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random identifier.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex form for log lines.
    pub fn short(&self) -> String {
        short_hex(&self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Unique match identifier. Rating updates are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct MatchId(pub [u8; 16]);

impl MatchId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random identifier.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Complete mutable state of one match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    /// Match identifier
    pub match_id: MatchId,

    /// Board rectangle
    pub board: Board,

    /// Number of apples kept on the board
    pub apple_target: u32,

    /// Ticks played so far
    pub tick: u32,

    /// Seed the match was created from
    pub rng_seed: u64,

    /// Stream for spawn and apple cells
    pub rng: DeterministicRng,

    /// Stream for substitute moves; kept apart so replaying resolved moves
    /// reproduces the board stream exactly
    pub fallback_rng: DeterministicRng,

    /// Every entrant, alive or dead (BTreeMap for deterministic order!)
    pub snakes: BTreeMap<AgentId, Snake>,

    /// Apple cells
    pub apples: BTreeSet<Cell>,
}

impl MatchState {
    /// Build the initial state: spawn every agent on a distinct random cell,
    /// then place the initial apples.
    pub fn new(
        match_id: MatchId,
        config: &MatchConfig,
        agents: &[AgentId],
        rng_seed: u64,
    ) -> Result<Self, BoardError> {
        let board = config.board()?;

        if agents.is_empty() {
            return Err(BoardError::NoAgents);
        }

        let mut roster = BTreeSet::new();
        for id in agents {
            if !roster.insert(*id) {
                return Err(BoardError::DuplicateAgent(id.to_uuid_string()));
            }
        }

        if roster.len() > board.cell_count() {
            return Err(BoardError::BoardFull {
                cells: board.cell_count(),
                agents: roster.len(),
            });
        }

        let mut rng = DeterministicRng::new(rng_seed);
        let fallback_rng = DeterministicRng::new(rng_seed ^ FALLBACK_STREAM_SALT);

        let mut free: Vec<Cell> = board.cells().collect();
        let mut snakes = BTreeMap::new();
        for id in roster {
            let idx = rng.next_index(free.len());
            let cell = free.swap_remove(idx);
            snakes.insert(id, Snake::spawn(cell));
        }

        let mut state = Self {
            match_id,
            board,
            apple_target: config.apple_target,
            tick: 0,
            rng_seed,
            rng,
            fallback_rng,
            snakes,
            apples: BTreeSet::new(),
        };

        replenish_apples(&mut state);

        Ok(state)
    }

    /// Get a snake by agent.
    pub fn snake(&self, id: &AgentId) -> Option<&Snake> {
        self.snakes.get(id)
    }

    /// Number of entrants.
    pub fn field_size(&self) -> usize {
        self.snakes.len()
    }

    /// Agents still alive, in id order.
    pub fn alive_agents(&self) -> Vec<AgentId> {
        self.snakes
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Count of living agents.
    pub fn alive_count(&self) -> usize {
        self.snakes.values().filter(|s| s.alive).count()
    }

    /// True if a living body covers `cell`.
    pub fn occupied_by_living(&self, cell: Cell) -> bool {
        self.snakes.values().any(|s| s.alive && s.occupies(cell))
    }

    /// Compute deterministic hash of current state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u32(self.board.width);
            hasher.update_u32(self.board.height);

            for (id, snake) in &self.snakes {
                hash_snake(hasher, id, snake);
            }

            hasher.update_u32(self.apples.len() as u32);
            for apple in &self.apples {
                hasher.update_cell(apple.x, apple.y);
            }
        })
    }

    /// Freeze the current state into a snapshot.
    pub fn snapshot(
        &self,
        moves: BTreeMap<AgentId, MoveRecord>,
        events: Vec<GameEvent>,
    ) -> Snapshot {
        Snapshot {
            tick: self.tick,
            board: self.board,
            snakes: self.snakes.clone(),
            apples: self.apples.iter().copied().collect(),
            moves,
            events,
            hash: self.compute_hash(),
        }
    }
}

fn hash_snake(hasher: &mut StateHasher, id: &AgentId, snake: &Snake) {
    hasher.update_id(id.as_bytes());
    hasher.update_bool(snake.alive);
    hasher.update_u32(snake.score);
    hasher.update_u32(snake.len() as u32);
    for cell in snake.cells() {
        hasher.update_cell(cell.x, cell.y);
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable record of the board after one tick.
///
/// Tick 0 is the initial board. Once built a snapshot is never mutated;
/// it is handed to agents behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick index
    pub tick: u32,
    /// Board rectangle
    pub board: Board,
    /// Every entrant's body, aliveness and score
    pub snakes: BTreeMap<AgentId, Snake>,
    /// Apple cells, sorted
    pub apples: Vec<Cell>,
    /// What each agent asked for and what it got this tick
    pub moves: BTreeMap<AgentId, MoveRecord>,
    /// Events emitted this tick, in emission order
    pub events: Vec<GameEvent>,
    /// State hash after this tick
    pub hash: StateHash,
}

/// Shared handle passed to agents.
pub type SharedSnapshot = Arc<Snapshot>;

impl Snapshot {
    /// Scores by agent.
    pub fn scores(&self) -> BTreeMap<AgentId, u32> {
        self.snakes.iter().map(|(id, s)| (*id, s.score)).collect()
    }

    /// Living agents, in id order.
    pub fn alive_agents(&self) -> Vec<AgentId> {
        self.snakes
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(id, _)| *id)
            .collect()
    }

    /// True if `cell` holds an apple.
    pub fn has_apple(&self, cell: Cell) -> bool {
        self.apples.binary_search(&cell).is_ok()
    }
}

impl fmt::Display for Snapshot {
    /// ASCII board, top row first: `.` empty, `A` apple, a digit for each
    /// living agent's head (agent index in id order), `T` for body segments.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.board.width as usize;
        let height = self.board.height as usize;
        let mut grid = vec![vec!['.'; width]; height];

        for apple in &self.apples {
            if self.board.contains(*apple) {
                grid[apple.y as usize][apple.x as usize] = 'A';
            }
        }

        for (index, snake) in self.snakes.values().enumerate() {
            if !snake.alive {
                continue;
            }
            let head_mark = std::char::from_digit(index as u32 % 10, 10).unwrap_or('H');
            for (segment, cell) in snake.cells().enumerate() {
                if !self.board.contains(cell) {
                    continue;
                }
                grid[cell.y as usize][cell.x as usize] = if segment == 0 { head_mark } else { 'T' };
            }
        }

        for row in grid.iter().rev() {
            let line: String = row.iter().collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(n: u8) -> Vec<AgentId> {
        (1..=n).map(|i| AgentId::new([i; 16])).collect()
    }

    #[test]
    fn test_agent_id_uuid_roundtrip() {
        let id = AgentId::random();
        let parsed = AgentId::from_uuid_str(&id.to_uuid_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(AgentId::from_uuid_str("not-a-uuid").is_none());
    }

    #[test]
    fn test_new_spawns_distinct_cells() {
        let config = MatchConfig::default();
        let state = MatchState::new(MatchId::new([7; 16]), &config, &agents(4), 99).unwrap();

        assert_eq!(state.field_size(), 4);
        let mut heads: Vec<Cell> = state.snakes.values().map(|s| s.head()).collect();
        heads.sort();
        heads.dedup();
        assert_eq!(heads.len(), 4);

        assert_eq!(state.apples.len(), config.apple_target as usize);
        for apple in &state.apples {
            assert!(!state.occupied_by_living(*apple));
        }
    }

    #[test]
    fn test_new_rejects_bad_rosters() {
        let config = MatchConfig::default();
        let id = MatchId::default();

        assert_eq!(
            MatchState::new(id, &config, &[], 1).unwrap_err(),
            BoardError::NoAgents
        );

        let dup = [AgentId::new([1; 16]), AgentId::new([1; 16])];
        assert!(matches!(
            MatchState::new(id, &config, &dup, 1),
            Err(BoardError::DuplicateAgent(_))
        ));

        let tiny = MatchConfig { width: 1, height: 2, ..MatchConfig::default() };
        assert_eq!(
            MatchState::new(id, &tiny, &agents(3), 1).unwrap_err(),
            BoardError::BoardFull { cells: 2, agents: 3 }
        );

        let empty = MatchConfig { width: 0, ..MatchConfig::default() };
        assert!(matches!(
            MatchState::new(id, &empty, &agents(1), 1),
            Err(BoardError::EmptyBoard { .. })
        ));
    }

    #[test]
    fn test_same_seed_same_board() {
        let config = MatchConfig::default();
        let a = MatchState::new(MatchId::default(), &config, &agents(2), 1234).unwrap();
        let b = MatchState::new(MatchId::default(), &config, &agents(2), 1234).unwrap();
        assert_eq!(a.compute_hash(), b.compute_hash());

        let c = MatchState::new(MatchId::default(), &config, &agents(2), 4321).unwrap();
        assert_ne!(a.compute_hash(), c.compute_hash());
    }

    #[test]
    fn test_snapshot_render() {
        let config = MatchConfig { width: 3, height: 2, apple_target: 0, ..MatchConfig::default() };
        let mut state = MatchState::new(MatchId::default(), &config, &agents(1), 5).unwrap();

        let snake = Snake::from_cells([Cell::new(1, 1), Cell::new(0, 1)]).unwrap();
        state.snakes.insert(AgentId::new([1; 16]), snake);
        state.apples.insert(Cell::new(2, 0));

        let rendered = state.snapshot(BTreeMap::new(), Vec::new()).to_string();
        assert_eq!(rendered, "T0.\n..A\n");
    }
}
