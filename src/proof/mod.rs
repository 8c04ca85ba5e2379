//! Match Transcripts and Verification
//!
//! Provides verifiable match outcomes through:
//! - Match transcript recording
//! - Verification by deterministic replay
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF LAYER                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transcript.rs   - Seed, rules, resolved moves, checkpoints │
//! │  verify.rs       - Verification by replay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod transcript;
pub mod verify;

// Re-export key types
pub use transcript::{
    MatchTranscript, MatchMetadata, TickMoves, StateCheckpoint,
    TranscriptEvent, TranscriptError, CHECKPOINT_INTERVAL,
};
pub use verify::{verify_transcript, VerificationResult, VerificationError, CheckpointResult};
