//! Apple Spawning and Consumption
//!
//! Apples are kept at a target count. Replenishment draws uniformly from the
//! empty cells: no living body, no apple. Dead bodies do not block spawns.

use crate::game::board::Cell;
use crate::game::state::MatchState;

/// Cells an apple may spawn on, in row-major order.
pub fn free_cells(state: &MatchState) -> Vec<Cell> {
    state
        .board
        .cells()
        .filter(|c| !state.apples.contains(c) && !state.occupied_by_living(*c))
        .collect()
}

/// Remove an eaten apple. Returns false if no apple was there.
pub fn consume_apple(state: &mut MatchState, cell: Cell) -> bool {
    state.apples.remove(&cell)
}

/// Top the apple set back up to the target count.
///
/// Stops early when the board has no empty cell left. Returns the cells
/// spawned, in draw order.
pub fn replenish_apples(state: &mut MatchState) -> Vec<Cell> {
    let target = state.apple_target as usize;
    if state.apples.len() >= target {
        return Vec::new();
    }

    let mut free = free_cells(state);
    let mut spawned = Vec::with_capacity(target - state.apples.len());

    while state.apples.len() < target && !free.is_empty() {
        let idx = state.rng.next_index(free.len());
        let cell = free.swap_remove(idx);
        state.apples.insert(cell);
        spawned.push(cell);
    }

    spawned
}

// =============================================================================
// TESTS
// =============================================================================
