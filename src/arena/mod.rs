//! Arena Layer
//!
//! Everything between the pure round engine and the outside world: agents
//! answering moves, the per-match state machine, the sync/async entry points
//! and the persistence collaborator.

pub mod agent;
pub mod recorder;
pub mod runner;
pub mod session;

pub use agent::{
    Agent, AgentError, AgentHandle, CautiousAgent, DelayedAgent, FailingAgent, MoveReply, RandomAgent,
    ScriptedAgent,
};
pub use recorder::{JsonlRecorder, MatchRecorder, MemoryRecorder, NullRecorder, RecorderError};
pub use runner::{run_match, run_match_blocking};
pub use session::{ArenaError, MatchOutcome, MatchSession, SessionConfig, SessionState};
