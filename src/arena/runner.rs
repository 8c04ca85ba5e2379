//! Match Entry Points
//!
//! `run_match` plays one match to completion on the caller's runtime.
//! `run_match_blocking` is the synchronous boundary: it builds a private
//! single-threaded runtime, runs the match and returns.

use tracing::{info, warn};

use crate::arena::agent::AgentHandle;
use crate::arena::recorder::{MatchRecorder, report_match};
use crate::arena::session::{ArenaError, MatchOutcome, MatchSession, SessionConfig};
use crate::game::state::{AgentId, MatchId};

/// Run one match to completion and hand it to `recorder`.
///
/// If `config.match_timeout` elapses first, the match is dropped and
/// `ArenaError::Aborted` is returned; nothing is recorded.
pub async fn run_match(
    match_id: MatchId,
    config: SessionConfig,
    agents: Vec<(AgentId, AgentHandle)>,
    recorder: &dyn MatchRecorder,
) -> Result<MatchOutcome, ArenaError> {
    let deadline = config.match_timeout;
    let session = MatchSession::new(match_id, config, agents)?;

    let outcome = match deadline {
        Some(limit) => match tokio::time::timeout(limit, session.run()).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(match_id = %match_id, ?limit, "Match exceeded its deadline, aborting");
                return Err(ArenaError::Aborted(match_id));
            }
        },
        None => session.run().await?,
    };

    report_match(recorder, &outcome.result, &outcome.history);
    Ok(outcome)
}

/// Synchronous wrapper around [`run_match`].
///
/// Returns `ArenaError::Runtime` when called from inside an async runtime;
/// use [`run_match`] there.
pub fn run_match_blocking(
    match_id: MatchId,
    config: SessionConfig,
    agents: Vec<(AgentId, AgentHandle)>,
    recorder: &dyn MatchRecorder,
) -> Result<MatchOutcome, ArenaError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ArenaError::Runtime(
            "run_match_blocking called from inside an async runtime".into(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ArenaError::Runtime(e.to_string()))?;

    let outcome = runtime.block_on(run_match(match_id, config, agents, recorder))?;
    info!(
        match_id = %match_id,
        ticks = outcome.result.ticks_played,
        termination = ?outcome.result.termination,
        "Blocking match finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::arena::agent::{DelayedAgent, RandomAgent};
    use crate::arena::recorder::{MemoryRecorder, NullRecorder};

    fn agents() -> Vec<(AgentId, AgentHandle)> {
        vec![
            (AgentId::new([1; 16]), Arc::new(RandomAgent::new("a", 11)) as AgentHandle),
            (AgentId::new([2; 16]), Arc::new(RandomAgent::new("b", 12)) as AgentHandle),
        ]
    }

    #[test]
    fn test_blocking_entry_point() {
        let recorder = MemoryRecorder::new();
        let outcome =
            run_match_blocking(MatchId::new([3; 16]), SessionConfig::default(), agents(), &recorder).unwrap();

        assert_eq!(outcome.history.len(), outcome.result.ticks_played as usize + 1);
        assert_eq!(recorder.matches(), vec![outcome.result.clone()]);
    }

    #[test]
    fn test_blocking_is_reproducible() {
        // Seeded agents plus a derived board seed: same request, same match
        let a = run_match_blocking(MatchId::new([4; 16]), SessionConfig::default(), agents(), &NullRecorder).unwrap();
        let b = run_match_blocking(MatchId::new([4; 16]), SessionConfig::default(), agents(), &NullRecorder).unwrap();
        assert_eq!(a.result, b.result);
    }

    #[tokio::test]
    async fn test_blocking_inside_runtime_is_rejected() {
        let recorder = MemoryRecorder::new();
        let result = run_match_blocking(MatchId::new([6; 16]), SessionConfig::default(), agents(), &recorder);
        assert!(matches!(result, Err(ArenaError::Runtime(_))));
        assert!(recorder.matches().is_empty());
    }

    #[tokio::test]
    async fn test_match_deadline_aborts_without_recording() {
        let slow: Vec<(AgentId, AgentHandle)> = agents()
            .into_iter()
            .map(|(id, agent)| (id, Arc::new(DelayedAgent::new(agent, Duration::from_millis(200))) as AgentHandle))
            .collect();
        let config = SessionConfig {
            match_timeout: Some(Duration::from_millis(50)),
            ..SessionConfig::default()
        };
        let recorder = MemoryRecorder::new();

        let result = run_match(MatchId::new([5; 16]), config, slow, &recorder).await;
        assert_eq!(result.err(), Some(ArenaError::Aborted(MatchId::new([5; 16]))));
        assert!(recorder.matches().is_empty());
    }
}
