// Chain ownership: genesis, append, iteration and validation

mod blockchain;

pub use blockchain::{Chain, ChainError};
