// Proof-of-work hash chain
// Append-only chain where every block must solve a SHA-256 difficulty puzzle

pub mod core;
pub mod consensus;
pub mod chain;
pub mod config;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{Block, BlockCandidate, Hash256};
pub use crate::consensus::{
    BlockValidator, CancelReason, CancelToken, Miner, MiningError, MiningResult,
    ProgressObserver, SearchControl, Target, ValidationError,
};
pub use crate::chain::{Chain, ChainError};
pub use crate::config::{ChainConfig, ConfigError};
pub use crate::cli::{Cli, CliHandler, Commands};
