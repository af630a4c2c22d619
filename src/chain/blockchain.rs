// In-memory append-only chain

use serde::Serialize;
use thiserror::Error;

use crate::config::ChainConfig;
use crate::consensus::{
    BlockValidator, InvalidDifficulty, Miner, MiningError, MiningResult, NoProgress,
    ProgressObserver, SearchControl, Target, ValidationError,
};
use crate::core::{Block, BlockCandidate, GENESIS_DATA};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Append found no tail block to build on
    #[error("cannot append to an empty chain")]
    EmptyChain,
    #[error(transparent)]
    Mining(#[from] MiningError),
    #[error(transparent)]
    InvalidDifficulty(#[from] InvalidDifficulty),
}

/// Ordered sequence of mined blocks, genesis first.
///
/// Blocks are only pushed once fully solved, so a failed append leaves the
/// chain exactly as it was.
#[derive(Debug, Clone, Serialize)]
pub struct Chain {
    difficulty: u32,
    pub(crate) blocks: Vec<Block>,
    #[serde(skip)]
    miner: Miner,
    #[serde(skip)]
    validator: BlockValidator,
    #[serde(skip)]
    last_mining: Option<MiningResult>,
}

impl Chain {
    /// Create a chain holding only its mined genesis block
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        Self::new_with(config, &SearchControl::default(), &mut NoProgress)
    }

    /// Like [`Chain::new`], with stop conditions and a progress observer for
    /// the genesis search
    pub fn new_with(
        config: &ChainConfig,
        control: &SearchControl,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Self, ChainError> {
        let miner = config.miner()?;
        let target = *miner.target();

        let mut chain = Self {
            difficulty: target.difficulty(),
            blocks: Vec::new(),
            miner,
            validator: BlockValidator::new(target),
            last_mining: None,
        };

        let genesis = BlockCandidate::new(0, "", GENESIS_DATA);
        chain.push_mined(genesis, control, observer)?;
        Ok(chain)
    }

    /// Create a chain with default search limits
    pub fn with_difficulty(difficulty: u32) -> Result<Self, ChainError> {
        Self::new(&ChainConfig::with_difficulty(difficulty))
    }

    /// Mine a block for `data` on top of the current tip
    pub fn append(&mut self, data: impl Into<String>) -> Result<&Block, ChainError> {
        self.append_with(data, &SearchControl::default(), &mut NoProgress)
    }

    /// Like [`Chain::append`], with stop conditions and a progress observer
    pub fn append_with(
        &mut self,
        data: impl Into<String>,
        control: &SearchControl,
        observer: &mut dyn ProgressObserver,
    ) -> Result<&Block, ChainError> {
        let tail = self.blocks.last().ok_or(ChainError::EmptyChain)?;
        let candidate = BlockCandidate::new(tail.index() + 1, tail.hash(), data);
        self.push_mined(candidate, control, observer)
    }

    fn push_mined(
        &mut self,
        candidate: BlockCandidate,
        control: &SearchControl,
        observer: &mut dyn ProgressObserver,
    ) -> Result<&Block, ChainError> {
        let (block, result) = Block::mine_candidate(candidate, &self.miner, control, observer)?;

        log::info!(
            "Mined block {} in {} attempts ({:?}): {}",
            block.index(),
            result.attempts,
            result.duration,
            block.hash()
        );

        self.last_mining = Some(result);
        let position = self.blocks.len();
        self.blocks.push(block);
        Ok(&self.blocks[position])
    }

    /// Read-only view of every block, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Most recently appended block
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn target(&self) -> &Target {
        self.miner.target()
    }

    /// Statistics from the latest successful mining run
    pub fn last_mining(&self) -> Option<&MiningResult> {
        self.last_mining.as_ref()
    }

    /// Does `block` carry a valid proof of work at this chain's difficulty?
    pub fn validate_block(&self, block: &Block) -> bool {
        self.validator.validate_block(block)
    }

    /// Validate genesis shape, indices, linkage and every block's proof of work
    pub fn validate(&self) -> bool {
        self.validator.validate_chain(&self.blocks)
    }

    /// Same checks as [`Chain::validate`], reporting the first failure
    pub fn check(&self) -> Result<(), ValidationError> {
        self.validator.check_chain(&self.blocks)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
