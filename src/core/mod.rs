// Core chain data structures

mod types;
mod block;
mod hash;

pub use types::*;
pub use block::*;
pub use hash::*;
