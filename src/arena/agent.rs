//! Move Collaborators
//!
//! An agent is anything that can answer "which way now?" for a snapshot. The
//! engine treats the answer as opaque text plus an optional rationale; it may
//! also fail or never arrive. Both are recovered by the round engine's
//! fallback, never surfaced as a match error.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use crate::core::rng::DeterministicRng;
use crate::game::board::Direction;
use crate::game::input::{MoveIntent, legal_directions};
use crate::game::state::{AgentId, SharedSnapshot};

/// An agent's reply for one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReply {
    /// Raw direction text (`UP`, `down`, ...). Anything else is invalid.
    pub raw: String,
    /// Optional free-text explanation.
    pub rationale: Option<String>,
}

impl MoveReply {
    /// Reply with a well-formed direction.
    pub fn direction(direction: Direction) -> Self {
        Self {
            raw: direction.as_str().to_string(),
            rationale: None,
        }
    }

    /// Reply with arbitrary text.
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            rationale: None,
        }
    }

    /// Attach a rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Parse into an intent. Unparseable text becomes an invalid intent.
    pub fn into_intent(self) -> MoveIntent {
        let intent = MoveIntent::parse(&self.raw);
        match self.rationale {
            Some(rationale) => intent.with_rationale(rationale),
            None => intent,
        }
    }
}

/// Errors an agent may return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// Reply did not arrive in time.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The agent cannot be reached or refused to answer.
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    /// The agent answered with something unusable.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

/// Per-agent move collaborator.
///
/// The returned future must be `'static` so a session can run every agent's
/// request concurrently under its own timeout.
pub trait Agent: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Choose a move for `me` given the latest snapshot.
    fn request_move(&self, view: SharedSnapshot, me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>>;
}

/// Shared handle to an agent.
pub type AgentHandle = Arc<dyn Agent>;

// =============================================================================
// BUILT-IN AGENTS
// =============================================================================

/// Picks any of the four directions uniformly.
pub struct RandomAgent {
    name: String,
    rng: Mutex<DeterministicRng>,
}

impl RandomAgent {
    /// Create with a seed.
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: Mutex::new(DeterministicRng::new(seed)),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_move(&self, _view: SharedSnapshot, _me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>> {
        let pick = self
            .rng
            .lock()
            .map(|mut rng| Direction::ALL[rng.next_index(Direction::ALL.len())])
            .map_err(|_| AgentError::Unavailable("rng lock poisoned".to_string()));
        async move { pick.map(MoveReply::direction) }.boxed()
    }
}

/// Random among moves that keep it on the board and off its own body.
///
/// Its own tail is treated as free, since it moves away this tick. Other
/// agents are ignored. With no safe move left it picks any legal direction.
pub struct CautiousAgent {
    name: String,
    rng: Mutex<DeterministicRng>,
}

impl CautiousAgent {
    /// Create with a seed.
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: Mutex::new(DeterministicRng::new(seed)),
        }
    }

    /// Directions that avoid walls and the agent's own body.
    pub fn safe_directions(view: &SharedSnapshot, me: AgentId) -> Vec<Direction> {
        let Some(snake) = view.snakes.get(&me) else {
            return Vec::new();
        };
        let head = snake.head();
        let body: Vec<_> = snake.cells().collect();
        let without_tail = &body[..body.len().saturating_sub(1)];

        legal_directions(snake.heading)
            .into_iter()
            .filter(|d| {
                let next = head.step(*d);
                view.board.contains(next) && !without_tail.contains(&next)
            })
            .collect()
    }
}

impl Agent for CautiousAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_move(&self, view: SharedSnapshot, me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>> {
        let mut options = Self::safe_directions(&view, me);
        let rationale = if options.is_empty() {
            options = legal_directions(view.snakes.get(&me).and_then(|s| s.heading));
            "no safe move"
        } else {
            "random safe move"
        };

        let pick = self
            .rng
            .lock()
            .map_err(|_| AgentError::Unavailable("rng lock poisoned".to_string()))
            .and_then(|mut rng| {
                rng.choose(&options)
                    .copied()
                    .ok_or_else(|| AgentError::Unavailable("no legal move".to_string()))
            });
        async move { pick.map(|d| MoveReply::direction(d).with_rationale(rationale)) }.boxed()
    }
}

/// Replays a fixed list of replies, one per tick. Errors once the list runs out.
pub struct ScriptedAgent {
    name: String,
    script: Vec<String>,
}

impl ScriptedAgent {
    /// Script of raw replies; entry `i` answers the snapshot of tick `i`.
    pub fn new(name: impl Into<String>, script: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            script: script.into_iter().map(Into::into).collect(),
        }
    }

    /// Script of well-formed directions.
    pub fn from_directions(name: impl Into<String>, directions: &[Direction]) -> Self {
        Self::new(name, directions.iter().map(|d| d.as_str()))
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_move(&self, view: SharedSnapshot, _me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>> {
        let reply = self
            .script
            .get(view.tick as usize)
            .map(MoveReply::text)
            .ok_or_else(|| AgentError::Unavailable(format!("script ended at tick {}", view.tick)));
        async move { reply }.boxed()
    }
}

/// Always fails.
pub struct FailingAgent {
    name: String,
}

impl FailingAgent {
    /// Create.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_move(&self, _view: SharedSnapshot, _me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>> {
        async { Err(AgentError::Unavailable("always fails".to_string())) }.boxed()
    }
}

/// Wraps another agent and answers only after a delay.
pub struct DelayedAgent {
    inner: AgentHandle,
    delay: Duration,
}

impl DelayedAgent {
    /// Delay every reply of `inner` by `delay`.
    pub fn new(inner: AgentHandle, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl Agent for DelayedAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn request_move(&self, view: SharedSnapshot, me: AgentId) -> BoxFuture<'static, Result<MoveReply, AgentError>> {
        let reply = self.inner.request_move(view, me);
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            reply.await
        }
        .boxed()
    }
}

// =============================================================================
// TESTS
// =============================================================================
