//! Arena Configuration
//!
//! Plain defaults, overridable from `SNAKE_ARENA_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::arena::session::SessionConfig;
use crate::game::tick::MatchConfig;
use crate::placement::DEFAULT_ATTEMPTS;
use crate::rating::{Elo, RatingModel, TrueSkill};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SNAKE_ARENA_";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// Values parsed but do not make sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the arena core reads from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Board and rule parameters.
    pub match_config: MatchConfig,
    /// Per-move collaborator deadline.
    pub move_timeout: Duration,
    /// Optional whole-match deadline.
    pub match_timeout: Option<Duration>,
    /// Placement match budget.
    pub placement_attempts: u32,
    /// Rating model and constants.
    pub rating: RatingModel,
    /// JSON-lines persistence file.
    pub record_path: Option<PathBuf>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            move_timeout: Duration::from_millis(5000),
            match_timeout: None,
            placement_attempts: DEFAULT_ATTEMPTS,
            rating: RatingModel::default(),
            record_path: None,
        }
    }
}

impl ArenaConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to fetch variables by full name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup: &lookup };
        let mut config = Self::default();

        let m = &mut config.match_config;
        vars.set("WIDTH", &mut m.width)?;
        vars.set("HEIGHT", &mut m.height)?;
        vars.set("APPLES", &mut m.apple_target)?;
        vars.set("MAX_TICKS", &mut m.max_ticks)?;

        if let Some(ms) = vars.get::<u64>("MOVE_TIMEOUT_MS")? {
            config.move_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = vars.get::<u64>("MATCH_TIMEOUT_MS")? {
            config.match_timeout = Some(Duration::from_millis(ms));
        }
        vars.set("PLACEMENT_ATTEMPTS", &mut config.placement_attempts)?;

        if let Some(name) = vars.raw("RATING") {
            config.rating = name.parse().map_err(|_| vars.invalid("RATING", &name))?;
        }
        match &mut config.rating {
            RatingModel::Elo(Elo { k_factor, initial }) => {
                vars.set("ELO_K", k_factor)?;
                vars.set("ELO_INITIAL", initial)?;
            }
            RatingModel::TrueSkill(TrueSkill { mu, sigma, beta, tau, draw_probability }) => {
                vars.set("TS_MU", mu)?;
                vars.set("TS_SIGMA", sigma)?;
                vars.set("TS_BETA", beta)?;
                vars.set("TS_TAU", tau)?;
                vars.set("TS_DRAW_PROBABILITY", draw_probability)?;
            }
        }

        config.record_path = vars.raw("RECORD_PATH").filter(|p| !p.is_empty()).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.match_config;
        if m.width == 0 || m.height == 0 {
            return Err(ConfigError::Invalid(format!("board must be non-empty, got {}x{}", m.width, m.height)));
        }
        if m.max_ticks == 0 {
            return Err(ConfigError::Invalid("max ticks must be positive".into()));
        }
        if self.placement_attempts == 0 {
            return Err(ConfigError::Invalid("placement attempts must be positive".into()));
        }
        if self.move_timeout.is_zero() {
            return Err(ConfigError::Invalid("move timeout must be positive".into()));
        }

        match &self.rating {
            RatingModel::Elo(elo) => {
                if !(elo.k_factor > 0.0 && elo.k_factor.is_finite()) {
                    return Err(ConfigError::Invalid(format!("Elo K must be positive, got {}", elo.k_factor)));
                }
                if !elo.initial.is_finite() {
                    return Err(ConfigError::Invalid("Elo initial rating must be finite".into()));
                }
            }
            RatingModel::TrueSkill(ts) => {
                for (name, value) in [("mu", ts.mu), ("sigma", ts.sigma), ("beta", ts.beta), ("tau", ts.tau)] {
                    if !(value > 0.0 && value.is_finite()) {
                        return Err(ConfigError::Invalid(format!("TrueSkill {name} must be positive, got {value}")));
                    }
                }
                if !(ts.draw_probability > 0.0 && ts.draw_probability < 1.0) {
                    return Err(ConfigError::Invalid(format!(
                        "draw probability must be in (0, 1), got {}",
                        ts.draw_probability
                    )));
                }
            }
        }
        Ok(())
    }

    /// Session settings for one match.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            match_config: self.match_config,
            move_timeout: self.move_timeout,
            match_timeout: self.match_timeout,
            ..SessionConfig::default()
        }
    }
}

struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Vars<'_> {
    fn raw(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{suffix}")).map(|v| v.trim().to_string())
    }

    fn invalid(&self, suffix: &str, value: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{suffix}"),
            value: value.to_string(),
        }
    }

    fn get<T: FromStr>(&self, suffix: &str) -> Result<Option<T>, ConfigError> {
        match self.raw(suffix) {
            Some(value) => value.parse().map(Some).map_err(|_| self.invalid(suffix, &value)),
            None => Ok(None),
        }
    }

    fn set<T: FromStr>(&self, suffix: &str, field: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(suffix)? {
            *field = value;
        }
        Ok(())
    }
}
