//! Rating Engine
//!
//! Two interchangeable skill models behind [`RatingSystem`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RatingSystem                          │
//! │    initial_rating · rate_pair · conservative/display score   │
//! ├───────────────────────────┬──────────────────────────────────┤
//! │           Elo             │            TrueSkill             │
//! │  logistic expected score  │  Gaussian belief (mu, sigma),    │
//! │  fixed K, sigma unused    │  two-player factor graph         │
//! └───────────────────────────┴──────────────────────────────────┘
//!                              │
//!                       ┌──────┴──────┐
//!                       │   Ladder    │  per-agent serialized updates,
//!                       └─────────────┘  idempotency, replay, rollback
//! ```
//!
//! Callers pick a model through [`RatingModel`] and never depend on which one
//! is active.

pub mod elo;
pub mod gaussian;
pub mod ladder;
pub mod trueskill;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::game::outcome::{MatchResult, Outcome};
use crate::game::state::{AgentId, MatchId};

pub use elo::Elo;
pub use ladder::{AgentStats, Ladder, LadderStatus, RatedMatch, SkillRecord};
pub use trueskill::TrueSkill;

/// A skill estimate. Elo uses `mu` as the rating and leaves `sigma` at zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Mean skill.
    pub mu: f64,
    /// Uncertainty (standard deviation).
    pub sigma: f64,
}

impl Rating {
    /// Create a rating.
    pub const fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sigma == 0.0 {
            write!(f, "{:.1}", self.mu)
        } else {
            write!(f, "{:.2}±{:.2}", self.mu, self.sigma)
        }
    }
}

/// Rating errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    /// Only head-to-head results can be rated.
    #[error("expected 2 participants, got {0}")]
    ParticipantCount(usize),

    /// Agent has no skill record.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// Agent already has a skill record.
    #[error("agent {0} already registered")]
    DuplicateAgent(AgentId),

    /// This match was already rated.
    #[error("match {0} already applied")]
    AlreadyApplied(MatchId),

    /// No rated match with this id.
    #[error("match {0} not in rating log")]
    UnknownMatch(MatchId),

    /// Model name not recognised.
    #[error("unknown rating model: {0}")]
    UnknownModel(String),
}

/// A pairwise skill model.
pub trait RatingSystem: Send + Sync + fmt::Debug {
    /// Short model name.
    fn name(&self) -> &'static str;

    /// Rating of a brand-new agent.
    fn initial_rating(&self) -> Rating;

    /// Update both ratings after `a` got `outcome` against `b`.
    fn rate_pair(&self, a: Rating, b: Rating, outcome: Outcome) -> (Rating, Rating);

    /// Score used for ladder ordering.
    fn conservative_score(&self, rating: &Rating) -> f64;

    /// Score shown to humans.
    fn display_score(&self, rating: &Rating) -> f64 {
        self.conservative_score(rating)
    }

    /// Rate a finished head-to-head match.
    ///
    /// `current` must hold a rating for both participants; the returned map
    /// holds the updated ratings for exactly those two.
    fn rate_result(
        &self,
        result: &MatchResult,
        current: &BTreeMap<AgentId, Rating>,
    ) -> Result<BTreeMap<AgentId, Rating>, RatingError> {
        let [first, second] = result.participants.as_slice() else {
            return Err(RatingError::ParticipantCount(result.participants.len()));
        };
        let a = *current.get(&first.agent_id).ok_or(RatingError::UnknownAgent(first.agent_id))?;
        let b = *current.get(&second.agent_id).ok_or(RatingError::UnknownAgent(second.agent_id))?;

        let (a, b) = self.rate_pair(a, b, first.outcome);
        Ok(BTreeMap::from([(first.agent_id, a), (second.agent_id, b)]))
    }
}

/// Shared handle to a rating model.
pub type SharedRatingSystem = Arc<dyn RatingSystem>;

/// Model selection, as read from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RatingModel {
    /// Pairwise logistic update.
    Elo(Elo),
    /// Gaussian-belief update.
    TrueSkill(TrueSkill),
}

impl RatingModel {
    /// Build the selected model.
    pub fn build(&self) -> SharedRatingSystem {
        match self {
            RatingModel::Elo(elo) => Arc::new(elo.clone()),
            RatingModel::TrueSkill(ts) => Arc::new(ts.clone()),
        }
    }

    /// Model name.
    pub fn name(&self) -> &'static str {
        match self {
            RatingModel::Elo(_) => "elo",
            RatingModel::TrueSkill(_) => "trueskill",
        }
    }
}

impl Default for RatingModel {
    fn default() -> Self {
        RatingModel::TrueSkill(TrueSkill::default())
    }
}

impl FromStr for RatingModel {
    type Err = RatingError;

    /// Parse a model name with default constants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elo" => Ok(RatingModel::Elo(Elo::default())),
            "trueskill" | "true_skill" => Ok(RatingModel::TrueSkill(TrueSkill::default())),
            other => Err(RatingError::UnknownModel(other.to_string())),
        }
    }
}
