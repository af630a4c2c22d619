// Basic types for the hash chain

use std::fmt;
use thiserror::Error;

/// Errors produced when turning text or slices back into a digest
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HashError {
    #[error("invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid hash length: expected 32, got {0}")]
    InvalidLength(usize),
}

/// 256-bit digest (32 bytes, big-endian when read as an integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.len() != 32 {
            return Err(HashError::InvalidLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Lowercase hex, most significant byte first
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a hex digest back into its raw bytes.
    ///
    /// Block hashes are stored as text; anything that compares a hash against
    /// a target must go through here rather than reading the text's bytes.
    pub fn from_hex(hex_str: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }

    /// Number of leading zero bits
    pub fn leading_zeros(&self) -> u32 {
        let mut zeros = 0;
        for byte in &self.0 {
            if *byte == 0 {
                zeros += 8;
            } else {
                zeros += byte.leading_zeros();
                break;
            }
        }
        zeros
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
