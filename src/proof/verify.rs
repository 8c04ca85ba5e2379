//! Verification API
//!
//! Verify matches by deterministic replay of their recorded moves.

use crate::core::hash::StateHash;
use crate::core::rng::derive_match_seed;
use crate::game::input::MoveRecord;
use crate::game::outcome::{build_result, check_termination};
use crate::game::state::MatchState;
use crate::game::tick::tick;
use crate::proof::transcript::MatchTranscript;

/// Verification result.
#[derive(Debug)]
pub struct VerificationResult {
    /// Did verification pass?
    pub valid: bool,

    /// Final state hash (from replay).
    pub computed_final_hash: StateHash,

    /// Expected final hash (from transcript).
    pub expected_final_hash: StateHash,

    /// Checkpoint verification results.
    pub checkpoint_results: Vec<CheckpointResult>,

    /// Detailed error if verification failed.
    pub error: Option<VerificationError>,
}

/// Result of verifying a single checkpoint.
#[derive(Debug)]
pub struct CheckpointResult {
    /// Tick number.
    pub tick: u32,
    /// Expected hash from transcript.
    pub expected: StateHash,
    /// Computed hash from replay.
    pub computed: StateHash,
    /// Did this checkpoint match?
    pub valid: bool,
}

/// Errors that can occur during verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// Recorded seed does not follow from the match identity.
    #[error("RNG seed mismatch: expected {expected}, got {got}")]
    SeedMismatch {
        /// Seed derived from match id and agents.
        expected: u64,
        /// Seed in the transcript.
        got: u64,
    },

    /// Recorded rules hash does not match the recorded rules.
    #[error("Config hash mismatch")]
    ConfigMismatch,

    /// The recorded board could not be rebuilt.
    #[error("Cannot rebuild board: {0}")]
    Construction(String),

    /// Initial state hash mismatch.
    #[error("Initial state hash mismatch")]
    InitialStateMismatch {
        /// Expected hash.
        expected: StateHash,
        /// Computed hash.
        computed: StateHash,
    },

    /// Checkpoint hash mismatch.
    #[error("Checkpoint mismatch at tick {tick}")]
    CheckpointMismatch {
        /// Tick where mismatch occurred.
        tick: u32,
        /// Expected hash.
        expected: StateHash,
        /// Computed hash.
        computed: StateHash,
    },

    /// Replay ended at a different tick than recorded.
    #[error("Replay ended at tick {computed}, transcript says {expected}")]
    LengthMismatch {
        /// Ticks in the transcript.
        expected: u32,
        /// Ticks the replay ran.
        computed: u32,
    },

    /// Final state hash mismatch.
    #[error("Final state hash mismatch")]
    FinalStateMismatch {
        /// Expected hash.
        expected: StateHash,
        /// Computed hash.
        computed: StateHash,
    },

    /// Match result mismatch.
    #[error("Match result mismatch")]
    ResultMismatch,

    /// Transcript is incomplete.
    #[error("Transcript is incomplete")]
    IncompleteTranscript,
}

impl VerificationResult {
    fn failed(expected: StateHash, computed: StateHash, checkpoints: Vec<CheckpointResult>, error: VerificationError) -> Self {
        Self {
            valid: false,
            computed_final_hash: computed,
            expected_final_hash: expected,
            checkpoint_results: checkpoints,
            error: Some(error),
        }
    }
}

/// Verify a match transcript by full replay.
///
/// Replays every recorded tick, compares each checkpoint, then compares the
/// recomputed result with the recorded one.
pub fn verify_transcript(transcript: &MatchTranscript) -> VerificationResult {
    // Check transcript is complete
    let result = match &transcript.result {
        Some(r) => r,
        None => {
            return VerificationResult::failed([0; 32], [0; 32], vec![], VerificationError::IncompleteTranscript);
        }
    };
    let meta = &transcript.metadata;

    // 1. Seed and rules
    let ids: Vec<[u8; 16]> = meta.agent_ids.iter().map(|id| *id.as_bytes()).collect();
    let expected_seed = derive_match_seed(meta.match_id.as_bytes(), &ids);
    if expected_seed != meta.rng_seed {
        return VerificationResult::failed(
            result.final_hash,
            [0; 32],
            vec![],
            VerificationError::SeedMismatch { expected: expected_seed, got: meta.rng_seed },
        );
    }
    if meta.config.config_hash() != meta.config_hash {
        return VerificationResult::failed(result.final_hash, [0; 32], vec![], VerificationError::ConfigMismatch);
    }

    // 2. Rebuild and check the initial board
    let mut state = match MatchState::new(meta.match_id, &meta.config, &meta.agent_ids, meta.rng_seed) {
        Ok(state) => state,
        Err(e) => {
            return VerificationResult::failed(
                result.final_hash,
                [0; 32],
                vec![],
                VerificationError::Construction(e.to_string()),
            );
        }
    };

    let initial_hash = state.compute_hash();
    if initial_hash != transcript.initial_hash {
        return VerificationResult::failed(
            transcript.initial_hash,
            initial_hash,
            vec![],
            VerificationError::InitialStateMismatch {
                expected: transcript.initial_hash,
                computed: initial_hash,
            },
        );
    }

    // 3. Replay tick by tick with checkpoint verification
    let mut checkpoint_results = Vec::new();
    let mut checkpoint_idx = 0;
    let mut termination = None;

    for recorded in &transcript.moves {
        let moves = recorded
            .moves
            .iter()
            .map(|(id, direction)| (*id, MoveRecord::resolved(*direction)))
            .collect();
        tick(&mut state, moves);

        if checkpoint_idx < transcript.checkpoints.len()
            && transcript.checkpoints[checkpoint_idx].tick == state.tick
        {
            let checkpoint = &transcript.checkpoints[checkpoint_idx];
            let computed = state.compute_hash();
            let valid = computed == checkpoint.state_hash && state.rng.state() == checkpoint.rng_state;

            checkpoint_results.push(CheckpointResult {
                tick: checkpoint.tick,
                expected: checkpoint.state_hash,
                computed,
                valid,
            });

            if !valid {
                let error = VerificationError::CheckpointMismatch {
                    tick: checkpoint.tick,
                    expected: checkpoint.state_hash,
                    computed,
                };
                return VerificationResult::failed(checkpoint.state_hash, computed, checkpoint_results, error);
            }

            checkpoint_idx += 1;
        }

        termination = check_termination(&state, meta.config.max_ticks);
        if termination.is_some() {
            break;
        }
    }

    // 4. Verify final state and result
    let final_hash = state.compute_hash();

    if state.tick != result.ticks_played {
        let error = VerificationError::LengthMismatch { expected: result.ticks_played, computed: state.tick };
        return VerificationResult::failed(result.final_hash, final_hash, checkpoint_results, error);
    }

    if final_hash != result.final_hash {
        let error = VerificationError::FinalStateMismatch { expected: result.final_hash, computed: final_hash };
        return VerificationResult::failed(result.final_hash, final_hash, checkpoint_results, error);
    }

    let recomputed = termination.map(|reason| build_result(&state, reason));
    if recomputed.as_ref() != Some(result) {
        return VerificationResult::failed(result.final_hash, final_hash, checkpoint_results, VerificationError::ResultMismatch);
    }

    VerificationResult {
        valid: true,
        computed_final_hash: final_hash,
        expected_final_hash: result.final_hash,
        checkpoint_results,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::game::input::resolve_intents;
    use crate::game::state::{AgentId, MatchId};
    use crate::game::tick::MatchConfig;
    use crate::proof::transcript::{CHECKPOINT_INTERVAL, MatchMetadata};

    /// Play a random match and record it the way a session does.
    fn record_match() -> MatchTranscript {
        let config = MatchConfig::default();
        let match_id = MatchId::new([1; 16]);
        let agent_ids = vec![AgentId::new([3; 16]), AgentId::new([4; 16])];
        let ids: Vec<[u8; 16]> = agent_ids.iter().map(|id| *id.as_bytes()).collect();
        let rng_seed = derive_match_seed(match_id.as_bytes(), &ids);

        let mut state = MatchState::new(match_id, &config, &agent_ids, rng_seed).unwrap();
        let metadata = MatchMetadata {
            match_id,
            agent_ids,
            rng_seed,
            start_timestamp: 0,
            config,
            config_hash: config.config_hash(),
        };
        let mut transcript = MatchTranscript::new(metadata, state.compute_hash());

        loop {
            let resolved = resolve_intents(&mut state, &BTreeMap::new());
            transcript.record_moves(state.tick + 1, resolved.iter());
            let result = tick(&mut state, resolved);
            for event in &result.snapshot.events {
                transcript.record_event(event);
            }
            if state.tick % CHECKPOINT_INTERVAL == 0 {
                transcript.add_checkpoint(state.tick, state.compute_hash(), state.rng.state());
            }
            if let Some(reason) = check_termination(&state, config.max_ticks) {
                transcript.finalize(build_result(&state, reason));
                return transcript;
            }
        }
    }

    #[test]
    fn test_incomplete_transcript_fails() {
        let mut transcript = record_match();
        transcript.result = None;

        let result = verify_transcript(&transcript);
        assert!(!result.valid);
        assert_eq!(result.error, Some(VerificationError::IncompleteTranscript));
    }

    #[test]
    fn test_recorded_match_verifies() {
        let transcript = record_match();
        let result = verify_transcript(&transcript);
        assert!(result.valid, "{:?}", result.error);
        assert!(result.checkpoint_results.iter().all(|c| c.valid));
        assert_eq!(result.computed_final_hash, result.expected_final_hash);
    }

    #[test]
    fn test_tampered_seed_fails() {
        let mut transcript = record_match();
        transcript.metadata.rng_seed ^= 1;
        let result = verify_transcript(&transcript);
        assert!(matches!(result.error, Some(VerificationError::SeedMismatch { .. })));
    }

    #[test]
    fn test_tampered_result_fails() {
        let mut transcript = record_match();
        if let Some(result) = transcript.result.as_mut() {
            for p in &mut result.participants {
                p.score += 1;
            }
        }
        let result = verify_transcript(&transcript);
        assert_eq!(result.error, Some(VerificationError::ResultMismatch));
    }

    #[test]
    fn test_truncated_moves_fail() {
        let mut transcript = record_match();
        if transcript.moves.len() < 2 {
            return;
        }
        transcript.moves.pop();
        let played = transcript.moves.len() as u32;
        transcript.checkpoints.retain(|c| c.tick <= played);
        let result = verify_transcript(&transcript);
        assert!(!result.valid);
    }
}
