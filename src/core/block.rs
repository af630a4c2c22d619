// Block data structures

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::consensus::pow::{
    Miner, MiningError, MiningResult, ProgressObserver, SearchControl,
};
use crate::core::{Hash256, HashError, block_digest};

/// Payload of the first block in every chain
pub const GENESIS_DATA: &str = "Genesis Block";

/// Current time in the format stored on blocks
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A block that has not been mined yet: everything except hash and nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCandidate {
    pub index: u64,
    pub timestamp: String,
    pub data: String,
    pub prev_hash: String,
}

impl BlockCandidate {
    /// Create a candidate stamped with the current time
    pub fn new(index: u64, prev_hash: impl Into<String>, data: impl Into<String>) -> Self {
        Self::with_timestamp(index, prev_hash, data, current_timestamp())
    }

    /// Create a candidate with an explicit timestamp
    pub fn with_timestamp(
        index: u64,
        prev_hash: impl Into<String>,
        data: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp: timestamp.into(),
            data: data.into(),
            prev_hash: prev_hash.into(),
        }
    }

    /// Digest of this candidate's content with the given nonce
    pub fn digest(&self, nonce: u64) -> Hash256 {
        block_digest(&self.prev_hash, &self.data, &self.timestamp, nonce)
    }

    /// Fix the winning nonce and hash, producing the final block
    pub fn seal(self, result: &MiningResult) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            data: self.data,
            prev_hash: self.prev_hash,
            nonce: result.nonce,
            hash: result.hash.to_hex(),
        }
    }
}

/// A solved block. Immutable once built; read it through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub(crate) index: u64,
    pub(crate) timestamp: String,
    pub(crate) data: String,
    /// Hex hash of the predecessor, empty for genesis
    pub(crate) prev_hash: String,
    pub(crate) nonce: u64,
    /// Hex encoding of the winning digest
    pub(crate) hash: String,
}

impl Block {
    /// Build a candidate for `data` and mine it
    pub fn mine(
        data: impl Into<String>,
        prev_hash: impl Into<String>,
        index: u64,
        miner: &Miner,
    ) -> Result<Self, MiningError> {
        let candidate = BlockCandidate::new(index, prev_hash, data);
        let result = miner.mine(&candidate)?;
        Ok(candidate.seal(&result))
    }

    /// Mine an explicit candidate, returning the block and the search statistics
    pub fn mine_candidate(
        candidate: BlockCandidate,
        miner: &Miner,
        control: &SearchControl,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(Self, MiningResult), MiningError> {
        let result = miner.mine_with(&candidate, control, observer)?;
        Ok((candidate.seal(&result), result))
    }

    /// Mine the genesis block
    pub fn genesis(miner: &Miner) -> Result<Self, MiningError> {
        Self::mine(GENESIS_DATA, "", 0, miner)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Raw digest bytes decoded from the stored hex hash
    pub fn hash_bytes(&self) -> Result<Hash256, HashError> {
        Hash256::from_hex(&self.hash)
    }

    /// Recompute the digest from the block's content
    pub fn compute_hash(&self) -> Hash256 {
        block_digest(&self.prev_hash, &self.data, &self.timestamp, self.nonce)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }
}
