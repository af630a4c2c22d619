// Consensus and validation logic

pub mod pow;
pub mod validation;

pub use pow::{
    CancelReason, CancelToken, InvalidDifficulty, Miner, MiningError, MiningResult, NoProgress,
    ProgressObserver, SearchControl, Target,
};
pub use validation::{BlockValidator, ValidationError};
