//! Property-based tests for the round engine, rating ladder and placement.
//!
//! Run with: cargo test --release --test properties

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use snake_arena::game::input::{MoveIntent, resolve_intents};
use snake_arena::game::outcome::{TerminationReason, build_result, check_termination};
use snake_arena::game::{
    AgentId, Cell, DeathCause, Direction, MatchConfig, MatchId, MatchState, Outcome, Snake, Snapshot, replay_match,
    tick,
};
use snake_arena::placement::PlacementState;
use snake_arena::rating::{Elo, Ladder, RatingModel, TrueSkill};
use snake_arena::game::outcome::{MatchResult, ParticipantResult};

fn agent_ids(n: usize) -> Vec<AgentId> {
    (0..n).map(|i| AgentId::new([i as u8 + 1; 16])).collect()
}

/// Per-tick intent code: 0..4 a direction, anything else no reply.
fn intents_for(state: &MatchState, codes: &[u8], tick: usize) -> BTreeMap<AgentId, MoveIntent> {
    state
        .alive_agents()
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let code = codes.get((tick * 7 + i) % codes.len().max(1)).copied().unwrap_or(9);
            Direction::from_index(code).map(|d| (id, MoveIntent::direction(d)))
        })
        .collect()
}

/// Play a whole match, returning each snapshot and the resolved directions.
fn play(
    config: MatchConfig,
    agents: &[AgentId],
    seed: u64,
    codes: &[u8],
) -> (Vec<Snapshot>, Vec<BTreeMap<AgentId, Direction>>, MatchResult) {
    let mut state = MatchState::new(MatchId::new([7; 16]), &config, agents, seed).unwrap();
    let mut snapshots = vec![state.snapshot(BTreeMap::new(), Vec::new())];
    let mut played = Vec::new();

    for t in 0.. {
        let intents = intents_for(&state, codes, t);
        let resolved = resolve_intents(&mut state, &intents);
        played.push(resolved.iter().map(|(id, r)| (*id, r.resolved)).collect());
        snapshots.push(tick(&mut state, resolved).snapshot);
        if let Some(reason) = check_termination(&state, config.max_ticks) {
            return (snapshots, played, build_result(&state, reason));
        }
    }
    unreachable!("max_ticks bounds the loop")
}

/// Apples sit on distinct free cells, and there are `min(target, free cells)` of them.
fn check_apples(snapshot: &Snapshot, target: u32) -> Result<(), String> {
    let occupied: BTreeSet<Cell> = snapshot
        .snakes
        .values()
        .filter(|s| s.alive)
        .flat_map(|s| s.cells())
        .collect();
    let unique: BTreeSet<Cell> = snapshot.apples.iter().copied().collect();
    if unique.len() != snapshot.apples.len() {
        return Err(format!("tick {}: repeated apple", snapshot.tick));
    }
    if let Some(apple) = snapshot.apples.iter().find(|a| occupied.contains(*a) || !snapshot.board.contains(**a)) {
        return Err(format!("tick {}: apple at {} is not on a free cell", snapshot.tick, apple));
    }
    let free = snapshot.board.cell_count() - occupied.len();
    let expected = (target as usize).min(free);
    if snapshot.apples.len() != expected {
        return Err(format!("tick {}: {} apples, expected {}", snapshot.tick, snapshot.apples.len(), expected));
    }
    Ok(())
}

fn config_strategy() -> impl Strategy<Value = MatchConfig> {
    (3u32..12, 3u32..12, 0u32..6, 1u32..60).prop_map(|(width, height, apple_target, max_ticks)| MatchConfig {
        width,
        height,
        apple_target,
        max_ticks,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every body stays in bounds, connected and free of repeated cells, and
    /// apples only ever occupy free cells.
    #[test]
    fn prop_bodies_well_formed(
        config in config_strategy(),
        agents in 1usize..5,
        seed in any::<u64>(),
        codes in prop::collection::vec(0u8..6, 1..64),
    ) {
        let (snapshots, _, _) = play(config, &agent_ids(agents), seed, &codes);
        for snapshot in &snapshots {
            for snake in snapshot.snakes.values() {
                prop_assert!(snake.is_well_formed(&snapshot.board), "tick {}", snapshot.tick);
            }
            if let Err(msg) = check_apples(snapshot, config.apple_target) {
                prop_assert!(false, "{}", msg);
            }
        }
    }

    /// Survivors grow by exactly one when they eat, otherwise keep their length.
    #[test]
    fn prop_growth_length(
        config in config_strategy(),
        agents in 1usize..4,
        seed in any::<u64>(),
        codes in prop::collection::vec(0u8..4, 1..64),
    ) {
        let (snapshots, _, _) = play(config, &agent_ids(agents), seed, &codes);
        for pair in snapshots.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            for (id, snake) in after.snakes.iter().filter(|(_, s)| s.alive) {
                let previous = before.snakes[id].len();
                let ate = before.has_apple(snake.head());
                let expected = if ate { previous + 1 } else { previous };
                prop_assert_eq!(snake.len(), expected);
                prop_assert_eq!(snake.score as usize + 1, snake.len());
            }
        }
    }

    /// Two heads entering the same cell both die, and the match is a tie.
    #[test]
    fn prop_head_on_is_mutual(
        width in 3u32..15,
        height in 1u32..15,
        x in 1i32..14,
        y in 0i32..15,
    ) {
        prop_assume!(x + 1 < width as i32 && y < height as i32);
        let config = MatchConfig { width, height, apple_target: 0, max_ticks: 100 };
        let ids = agent_ids(2);
        let mut state = MatchState::new(MatchId::default(), &config, &ids, 1).unwrap();
        state.snakes.insert(ids[0], Snake::spawn(Cell::new(x - 1, y)));
        state.snakes.insert(ids[1], Snake::spawn(Cell::new(x + 1, y)));

        let intents = BTreeMap::from([
            (ids[0], MoveIntent::direction(Direction::Right)),
            (ids[1], MoveIntent::direction(Direction::Left)),
        ]);
        let resolved = resolve_intents(&mut state, &intents);
        let result = tick(&mut state, resolved);

        prop_assert_eq!(result.deaths.len(), 2);
        prop_assert!(result.deaths.values().all(|d| d.cause == DeathCause::HeadCollision));

        let reason = check_termination(&state, config.max_ticks);
        prop_assert_eq!(reason, Some(TerminationReason::AllDead));
        let outcome = build_result(&state, TerminationReason::AllDead);
        prop_assert!(outcome.participants.iter().all(|p| p.outcome == Outcome::Tied));
    }

    /// Replaying the resolved directions reproduces every state hash and the result.
    #[test]
    fn prop_replay_reproduces_match(
        config in config_strategy(),
        agents in 1usize..4,
        seed in any::<u64>(),
        codes in prop::collection::vec(0u8..6, 1..64),
    ) {
        let ids = agent_ids(agents);
        let (snapshots, played, result) = play(config, &ids, seed, &codes);
        let replay = replay_match(MatchId::new([7; 16]), &config, &ids, seed, &played).unwrap();

        let live: Vec<_> = snapshots.iter().map(|s| s.hash).collect();
        let again: Vec<_> = replay.snapshots.iter().map(|s| s.hash).collect();
        prop_assert_eq!(live, again);
        prop_assert_eq!(replay.result, Some(result));
    }

    /// Replaying the rating log from reset equals applying it incrementally.
    #[test]
    fn prop_rating_replay_matches_incremental(
        use_elo in any::<bool>(),
        games in prop::collection::vec((0usize..4, 1usize..4, 0u8..3), 1..40),
    ) {
        let model = if use_elo { RatingModel::Elo(Elo::default()) } else { RatingModel::TrueSkill(TrueSkill::default()) };
        let ids = agent_ids(4);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let (incremental, replayed) = runtime.block_on(async {
            let ladder = Ladder::new(model.build());
            for id in &ids {
                ladder.register_ranked(*id).await.unwrap();
            }
            for (n, (a, offset, code)) in games.iter().enumerate() {
                let (a, b) = (ids[*a], ids[(a + offset) % 4]);
                let outcome = [Outcome::Won, Outcome::Lost, Outcome::Tied][*code as usize];
                let part = |agent_id, outcome| ParticipantResult { agent_id, score: 1, outcome, death: None, final_length: 2 };
                let mut match_id = [0u8; 16];
                match_id[..8].copy_from_slice(&(n as u64).to_le_bytes());
                let result = MatchResult {
                    match_id: MatchId::new(match_id),
                    rng_seed: 0,
                    participants: vec![part(a, outcome), part(b, outcome.flipped())],
                    ticks_played: 1,
                    termination: TerminationReason::MaxTicks,
                    final_hash: [0; 32],
                };
                ladder.apply_result(&result).await.unwrap();
            }
            let incremental = ladder.records().await;
            let replayed = ladder.replay_from_reset().await.unwrap();
            (incremental, replayed)
        });

        prop_assert_eq!(incremental, replayed);
    }

    /// An entrant that always wins reaches rank 0; one that always loses reaches N-1.
    #[test]
    fn prop_placement_converges(n in 1usize..500, wins in any::<bool>()) {
        let bound = (n as f64).log2().ceil() as usize + 2;
        let mut state = PlacementState::new(AgentId::new([0xEE; 16]), n, 64);
        let outcome = if wins { Outcome::Won } else { Outcome::Lost };

        while !state.is_complete() {
            let rank = state.target_rank(n);
            state.record(MatchId::random(), AgentId::new([1; 16]), rank, outcome, n);
        }

        prop_assert_eq!(state.final_rank, Some(if wins { 0 } else { n - 1 }));
        prop_assert!(state.matches_played() <= bound, "{} matches for n = {}", state.matches_played(), n);
    }
}

#[test]
fn test_placement_scenario_hundred() {
    let mut state = PlacementState::new(AgentId::new([0xEE; 16]), 100, 10);
    state.record(MatchId::random(), AgentId::new([1; 16]), 50, Outcome::Won, 100);
    assert_eq!((state.low, state.high), (0, 49));
}

#[test]
fn test_lone_agent_walks_into_wall() {
    let config = MatchConfig { width: 5, height: 5, apple_target: 0, max_ticks: 100 };
    let ids = agent_ids(1);
    let mut state = MatchState::new(MatchId::default(), &config, &ids, 3).unwrap();
    state.snakes.insert(ids[0], Snake::spawn(Cell::new(4, 2)));

    let intents = BTreeMap::from([(ids[0], MoveIntent::direction(Direction::Right))]);
    let resolved = resolve_intents(&mut state, &intents);
    let result = tick(&mut state, resolved);

    assert_eq!(result.deaths[&ids[0]].cause, DeathCause::Wall);
    let reason = check_termination(&state, config.max_ticks).unwrap();
    let outcome = build_result(&state, reason);
    assert_eq!(outcome.participants.len(), 1);
    assert_eq!(outcome.participants[0].outcome, Outcome::Lost);
    assert_eq!(outcome.ticks_played, 1);
}

#[test]
fn test_apples_capped_by_free_cells() {
    let config = MatchConfig { width: 3, height: 3, apple_target: 5, max_ticks: 10 };
    let ids = agent_ids(1);
    let mut state = MatchState::new(MatchId::default(), &config, &ids, 9).unwrap();
    let body = [(1, 2), (0, 2), (0, 1), (1, 1), (2, 1), (2, 0), (1, 0)];
    state.snakes.insert(ids[0], Snake::from_cells(body.iter().map(|(x, y)| Cell::new(*x, *y))).unwrap());
    state.apples.clear();

    let intents = BTreeMap::from([(ids[0], MoveIntent::direction(Direction::Right))]);
    let resolved = resolve_intents(&mut state, &intents);
    let snapshot = tick(&mut state, resolved).snapshot;

    assert!(snapshot.snakes[&ids[0]].alive);
    assert_eq!(snapshot.apples, vec![Cell::new(0, 0), Cell::new(1, 0)]);
    check_apples(&snapshot, config.apple_target).unwrap();
}
