//! Benchmarks for the round engine and replay.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use snake_arena::game::input::resolve_intents;
use snake_arena::game::outcome::check_termination;
use snake_arena::game::{AgentId, Direction, MatchConfig, MatchId, MatchState, replay_match, tick};
use snake_arena::rating::{Ladder, RatingModel};

fn agents(n: u8) -> Vec<AgentId> {
    (1..=n).map(|i| AgentId::new([i; 16])).collect()
}

/// Play a full match on fallback moves only, returning the resolved directions.
fn play_full(config: &MatchConfig, ids: &[AgentId], seed: u64) -> Vec<BTreeMap<AgentId, Direction>> {
    let mut state = MatchState::new(MatchId::new([1; 16]), config, ids, seed).expect("valid board");
    let mut played = Vec::new();
    loop {
        let resolved = resolve_intents(&mut state, &BTreeMap::new());
        played.push(resolved.iter().map(|(id, r)| (*id, r.resolved)).collect());
        tick(&mut state, resolved);
        if check_termination(&state, config.max_ticks).is_some() {
            return played;
        }
    }
}

fn bench_full_match(c: &mut Criterion) {
    let config = MatchConfig::default();
    let ids = agents(2);

    c.bench_function("full_match_2p_10x10", |b| {
        b.iter(|| black_box(play_full(black_box(&config), &ids, black_box(42))))
    });

    let big = MatchConfig { width: 40, height: 40, apple_target: 30, max_ticks: 500 };
    let ids = agents(8);
    c.bench_function("full_match_8p_40x40", |b| {
        b.iter(|| black_box(play_full(black_box(&big), &ids, black_box(42))))
    });
}

fn bench_replay(c: &mut Criterion) {
    let config = MatchConfig { max_ticks: 500, ..MatchConfig::default() };
    let ids = agents(2);
    let moves = play_full(&config, &ids, 7);

    c.bench_function("replay_recorded_match", |b| {
        b.iter(|| black_box(replay_match(MatchId::new([1; 16]), &config, &ids, 7, black_box(&moves))))
    });
}

fn bench_rating_replay(c: &mut Criterion) {
    use snake_arena::game::outcome::{MatchResult, Outcome, ParticipantResult, TerminationReason};

    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
    let ids = agents(16);
    let ladder = Ladder::new(RatingModel::default().build());

    runtime.block_on(async {
        for id in &ids {
            ladder.register_ranked(*id).await.expect("register");
        }
        for n in 0..1000u32 {
            let a = ids[(n as usize * 7) % ids.len()];
            let b = ids[(n as usize * 7 + 1 + n as usize % 5) % ids.len()];
            let part = |agent_id, outcome| ParticipantResult { agent_id, score: 0, outcome, death: None, final_length: 1 };
            let mut match_id = [0u8; 16];
            match_id[..4].copy_from_slice(&n.to_le_bytes());
            let result = MatchResult {
                match_id: MatchId::new(match_id),
                rng_seed: 0,
                participants: vec![part(a, Outcome::Won), part(b, Outcome::Lost)],
                ticks_played: 1,
                termination: TerminationReason::MaxTicks,
                final_hash: [0; 32],
            };
            ladder.apply_result(&result).await.expect("apply");
        }
    });

    c.bench_function("rating_replay_1000_matches", |b| {
        b.iter(|| runtime.block_on(async { black_box(ladder.replay_from_reset().await) }))
    });
}

criterion_group!(benches, bench_full_match, bench_replay, bench_rating_replay);
criterion_main!(benches);
