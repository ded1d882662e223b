use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use common::{
    DEFAULT_ENGINE_NAME, DEFAULT_FIGHTER_NUM, DEFAULT_MATCHING_DELAY_MS, DEFAULT_MAX_PRODUCTION,
    DEFAULT_MAX_SEARCH, DEFAULT_TEAM_MUST_MATCH_TEAM, DEFAULT_TIMEOUT_LOOP,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables of a matching engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Engine instance label, used in logs
    pub name: String,
    /// Milliseconds between two matching rounds
    pub matching_delay_ms: u64,
    /// How many queue entries a candidate search may inspect
    pub max_search: usize,
    /// Max matches produced per queue per round
    pub max_production: usize,
    /// Team seeds only pair with other teams; solo backfill still happens
    pub team_must_match_team: bool,
    /// Wait rounds after which a timeout is reported
    pub timeout_loop: u32,
    /// Total seats per match, both sides
    pub fighter_num: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENGINE_NAME.to_string(),
            matching_delay_ms: DEFAULT_MATCHING_DELAY_MS,
            max_search: DEFAULT_MAX_SEARCH,
            max_production: DEFAULT_MAX_PRODUCTION,
            team_must_match_team: DEFAULT_TEAM_MUST_MATCH_TEAM,
            timeout_loop: DEFAULT_TIMEOUT_LOOP,
            fighter_num: DEFAULT_FIGHTER_NUM,
        }
    }
}

impl MatchingConfig {
    /// Load the config from `MOBA_MATCHING_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            name: env::var("MOBA_MATCHING_NAME").unwrap_or(defaults.name),
            matching_delay_ms: env_or("MOBA_MATCHING_DELAY_MS", defaults.matching_delay_ms)?,
            max_search: env_or("MOBA_MATCHING_MAX_SEARCH", defaults.max_search)?,
            max_production: env_or("MOBA_MATCHING_MAX_PRODUCTION", defaults.max_production)?,
            team_must_match_team: env_or(
                "MOBA_MATCHING_TEAM_MUST_MATCH_TEAM",
                defaults.team_must_match_team,
            )?,
            timeout_loop: env_or("MOBA_MATCHING_TIMEOUT_LOOP", defaults.timeout_loop)?,
            fighter_num: env_or("MOBA_MATCHING_FIGHTER_NUM", defaults.fighter_num)?,
        };
        config.validate().context("Invalid matching configuration in environment")?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fighter_num == 0 || self.fighter_num % 2 != 0 {
            return Err(ConfigError::InvalidFighterNum(self.fighter_num));
        }
        if self.matching_delay_ms == 0 {
            return Err(ConfigError::Zero("matching_delay_ms"));
        }
        if self.max_search == 0 {
            return Err(ConfigError::Zero("max_search"));
        }
        if self.max_production == 0 {
            return Err(ConfigError::Zero("max_production"));
        }
        if self.timeout_loop == 0 {
            return Err(ConfigError::Zero("timeout_loop"));
        }
        Ok(())
    }

    /// Seats available on one side
    pub fn side_capacity(&self) -> u32 {
        self.fighter_num / 2
    }

    pub fn matching_delay(&self) -> Duration {
        Duration::from_millis(self.matching_delay_ms)
    }
}

/// Parse `key` from the environment, falling back to `default` when unset
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
