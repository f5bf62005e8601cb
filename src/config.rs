//! Scheduler configuration
//!
//! Loaded from `config.toml` in the data directory. Every section is optional
//! and falls back to the defaults below:
//!
//! ```toml
//! [familiarity]
//! intervals_days = [0, 1, 3, 7, 14]
//!
//! [sm2]
//! quality_map = [2, 3, 4, 5]
//! initial_easiness = 2.5
//!
//! [queue]
//! default_limit = 20
//! backfill = false
//!
//! [goals]
//! words_per_week = 20
//! sessions_per_week = 3
//!
//! [stats]
//! window_days = 30
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::algorithm::{QualityMap, MIN_EASE_FACTOR};
use crate::review::queue::QueuePolicy;
use crate::vocab::familiarity::IntervalTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub familiarity: FamiliarityConfig,
    pub sm2: Sm2Config,
    pub queue: QueueConfig,
    pub goals: GoalsConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FamiliarityConfig {
    /// Days until the next review, indexed by familiarity level 1..=5
    pub intervals_days: Vec<u32>,
}

impl Default for FamiliarityConfig {
    fn default() -> Self {
        Self {
            intervals_days: IntervalTable::DEFAULT_DAYS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sm2Config {
    /// SM-2 quality for Again, Hard, Good, Easy
    pub quality_map: Vec<u8>,
    pub initial_easiness: f64,
}

impl Default for Sm2Config {
    fn default() -> Self {
        Self {
            quality_map: QualityMap::DEFAULT.to_vec(),
            initial_easiness: 2.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub default_limit: usize,
    /// Fill a short due queue with not-yet-due items
    pub backfill: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            backfill: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsConfig {
    pub words_per_week: u32,
    pub sessions_per_week: u32,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            words_per_week: 20,
            sessions_per_week: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Days of review history the statistics cover, today included
    pub window_days: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

impl SchedulerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, validating the result
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from a file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        log::info!("Loaded scheduler config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interval_table()?;
        self.quality_map()?;
        if !self.sm2.initial_easiness.is_finite() || self.sm2.initial_easiness < MIN_EASE_FACTOR {
            return Err(ConfigError::Invalid(format!(
                "sm2.initial_easiness must be at least {}, got {}",
                MIN_EASE_FACTOR, self.sm2.initial_easiness
            )));
        }
        if self.stats.window_days == 0 {
            return Err(ConfigError::Invalid("stats.window_days must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn interval_table(&self) -> Result<IntervalTable, ConfigError> {
        IntervalTable::from_slice(&self.familiarity.intervals_days)
    }

    pub fn quality_map(&self) -> Result<QualityMap, ConfigError> {
        QualityMap::from_slice(&self.sm2.quality_map)
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            backfill: self.queue.backfill,
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
