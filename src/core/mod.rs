//! Core deterministic primitives.
//!
//! Everything a match draws on for reproducibility: the seeded PRNG and the
//! snapshot hasher.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, derive_match_seed};
pub use hash::{StateHash, StateHasher, compute_state_hash, short_hex};
