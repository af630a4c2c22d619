// Block and chain validation

use crate::consensus::pow::{Miner, Target};
use crate::core::Block;
use thiserror::Error;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Chain has no blocks at all
    #[error("chain is empty")]
    EmptyChain,
    /// Stored hash is not a 32-byte hex digest
    #[error("block {index}: stored hash is not a valid digest")]
    MalformedHash { index: u64 },
    /// Stored hash doesn't match the block's content
    #[error("block {index}: hash does not match block content")]
    HashMismatch { index: u64 },
    /// Block hash doesn't meet PoW target
    #[error("block {index}: invalid proof of work")]
    InvalidProofOfWork { index: u64 },
    /// Block at this position carries the wrong index
    #[error("block at position {position} has index {index}")]
    InvalidIndex { position: usize, index: u64 },
    /// prev_hash doesn't point at the preceding block
    #[error("block {index}: previous hash does not match predecessor")]
    BrokenLink { index: u64 },
    /// First block has a predecessor reference
    #[error("genesis block must have an empty previous hash")]
    InvalidGenesis,
}

/// Block validator
#[derive(Debug, Clone)]
pub struct BlockValidator {
    /// PoW miner for verification
    miner: Miner,
}

impl BlockValidator {
    /// Create a new block validator with fixed difficulty
    pub fn new(target: Target) -> Self {
        Self {
            miner: Miner::new(target),
        }
    }

    /// Check a single block's proof of work.
    ///
    /// The stored hex hash is decoded back into its raw digest, compared to a
    /// digest recomputed from the block's content, and then compared to the
    /// target as a big-endian integer.
    pub fn check_block(&self, block: &Block) -> Result<(), ValidationError> {
        let index = block.index();
        let stored = block
            .hash_bytes()
            .map_err(|_| ValidationError::MalformedHash { index })?;

        if stored != block.compute_hash() {
            return Err(ValidationError::HashMismatch { index });
        }

        // stored == recomputed digest from here on
        if !self.miner.verify(block) {
            return Err(ValidationError::InvalidProofOfWork { index });
        }

        Ok(())
    }

    /// Check every block plus genesis shape, indices and linkage
    pub fn check_chain(&self, blocks: &[Block]) -> Result<(), ValidationError> {
        let genesis = blocks.first().ok_or(ValidationError::EmptyChain)?;
        if !genesis.prev_hash().is_empty() {
            return Err(ValidationError::InvalidGenesis);
        }

        for (position, block) in blocks.iter().enumerate() {
            if block.index() != position as u64 {
                return Err(ValidationError::InvalidIndex { position, index: block.index() });
            }

            if position > 0 && block.prev_hash() != blocks[position - 1].hash() {
                return Err(ValidationError::BrokenLink { index: block.index() });
            }

            self.check_block(block)?;
        }

        Ok(())
    }

    pub fn validate_block(&self, block: &Block) -> bool {
        self.check_block(block).is_ok()
    }

    pub fn validate_chain(&self, blocks: &[Block]) -> bool {
        match self.check_chain(blocks) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Chain rejected: {}", e);
                false
            }
        }
    }
}
