//! TrueSkill for two single-player teams.
//!
//! With two players the factor graph reduces to one truncated-Gaussian
//! message: add dynamics noise, compare the performance difference against
//! the draw margin, then shift both means and shrink both variances.

use serde::{Deserialize, Serialize};

use crate::game::outcome::Outcome;
use crate::rating::gaussian::{ppf, v_draw, v_win, w_draw, w_win};
use crate::rating::{Rating, RatingSystem};

/// Display multiplier applied to the conservative score.
pub const DISPLAY_MULTIPLIER: f64 = 50.0;

/// Sigma multiple subtracted from the mean for ranking.
pub const CONSERVATIVE_SIGMAS: f64 = 3.0;

/// TrueSkill environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrueSkill {
    /// Initial mean.
    pub mu: f64,
    /// Initial standard deviation.
    pub sigma: f64,
    /// Performance noise.
    pub beta: f64,
    /// Dynamics noise added before every update.
    pub tau: f64,
    /// Prior probability of a draw.
    pub draw_probability: f64,
}

impl Default for TrueSkill {
    fn default() -> Self {
        Self {
            mu: 25.0,
            sigma: 25.0 / 3.0,
            beta: 25.0 / 6.0,
            tau: 0.5,
            draw_probability: 0.1,
        }
    }
}

impl TrueSkill {
    /// Draw margin for a two-player match.
    pub fn draw_margin(&self) -> f64 {
        ppf((self.draw_probability + 1.0) / 2.0) * 2f64.sqrt() * self.beta
    }
}

impl RatingSystem for TrueSkill {
    fn name(&self) -> &'static str {
        "trueskill"
    }

    fn initial_rating(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }

    fn rate_pair(&self, a: Rating, b: Rating, outcome: Outcome) -> (Rating, Rating) {
        // Put the better-placed player first; a draw keeps the given order
        let (winner, loser, swapped) = match outcome {
            Outcome::Lost => (b, a, true),
            Outcome::Won | Outcome::Tied => (a, b, false),
        };
        let draw = outcome == Outcome::Tied;

        let var_w = winner.sigma * winner.sigma + self.tau * self.tau;
        let var_l = loser.sigma * loser.sigma + self.tau * self.tau;
        let c = (2.0 * self.beta * self.beta + var_w + var_l).sqrt();

        let t = (winner.mu - loser.mu) / c;
        let eps = self.draw_margin() / c;
        let (v, w) = if draw {
            (v_draw(t, eps), w_draw(t, eps))
        } else {
            (v_win(t, eps), w_win(t, eps))
        };

        let winner = Rating::new(
            winner.mu + var_w / c * v,
            (var_w * (1.0 - var_w / (c * c) * w)).sqrt(),
        );
        let loser = Rating::new(
            loser.mu - var_l / c * v,
            (var_l * (1.0 - var_l / (c * c) * w)).sqrt(),
        );

        if swapped { (loser, winner) } else { (winner, loser) }
    }

    fn conservative_score(&self, rating: &Rating) -> f64 {
        rating.mu - CONSERVATIVE_SIGMAS * rating.sigma
    }

    fn display_score(&self, rating: &Rating) -> f64 {
        self.conservative_score(rating) * DISPLAY_MULTIPLIER
    }
}
