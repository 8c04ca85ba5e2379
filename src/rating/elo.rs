//! Elo: fixed-rate update towards a logistic expected score.

use serde::{Deserialize, Serialize};

use crate::game::outcome::Outcome;
use crate::rating::{Rating, RatingSystem};

/// Elo constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Elo {
    /// Update rate.
    pub k_factor: f64,
    /// Rating of a new agent.
    pub initial: f64,
}

impl Default for Elo {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            initial: 1500.0,
        }
    }
}

impl Elo {
    /// Expected score of a player rated `ra` against one rated `rb`.
    pub fn expected_score(ra: f64, rb: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf((rb - ra) / 400.0))
    }
}

impl RatingSystem for Elo {
    fn name(&self) -> &'static str {
        "elo"
    }

    fn initial_rating(&self) -> Rating {
        Rating::new(self.initial, 0.0)
    }

    fn rate_pair(&self, a: Rating, b: Rating, outcome: Outcome) -> (Rating, Rating) {
        let ea = Self::expected_score(a.mu, b.mu);
        let eb = Self::expected_score(b.mu, a.mu);
        let sa = outcome.score();
        let sb = outcome.flipped().score();

        (
            Rating::new(a.mu + self.k_factor * (sa - ea), 0.0),
            Rating::new(b.mu + self.k_factor * (sb - eb), 0.0),
        )
    }

    fn conservative_score(&self, rating: &Rating) -> f64 {
        rating.mu
    }
}
