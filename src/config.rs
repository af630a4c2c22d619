//! Chain configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::consensus::pow::{DEFAULT_PROGRESS_INTERVAL, InvalidDifficulty, Miner, Target};

/// Difficulty used when nothing else is configured
pub const DEFAULT_DIFFICULTY: u32 = 18;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidDifficulty(#[from] InvalidDifficulty),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading-zero bits required of every block hash
    pub difficulty: u32,
    /// Highest nonce tried before giving up on a block
    pub max_nonce: u64,
    /// Attempts between throughput log lines, 0 to disable
    pub progress_interval: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_nonce: u64::MAX,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target()?;
        Ok(())
    }

    pub fn target(&self) -> Result<Target, InvalidDifficulty> {
        Target::from_difficulty(self.difficulty)
    }

    /// Miner configured with this difficulty and search limits
    pub fn miner(&self) -> Result<Miner, InvalidDifficulty> {
        Ok(Miner::new(self.target()?)
            .with_max_nonce(self.max_nonce)
            .with_progress_interval(self.progress_interval))
    }
}
