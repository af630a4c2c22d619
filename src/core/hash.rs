// Hashing utilities

use sha2::{Digest, Sha256};
use crate::core::Hash256;

/// Single SHA256 hash
pub fn sha256(data: &[u8]) -> Hash256 {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    Hash256::new(result)
}

/// Bytes committed to by a block hash.
///
/// Layout: `prev_hash ++ data ++ timestamp ++ nonce`, strings as UTF-8 bytes
/// and the nonce as 8 big-endian bytes.
pub fn block_preimage(prev_hash: &str, data: &str, timestamp: &str, nonce: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prev_hash.len() + data.len() + timestamp.len() + 8);
    buf.extend_from_slice(prev_hash.as_bytes());
    buf.extend_from_slice(data.as_bytes());
    buf.extend_from_slice(timestamp.as_bytes());
    buf.extend_from_slice(&nonce.to_be_bytes());
    buf
}

/// Digest committing to a block's content
pub fn block_digest(prev_hash: &str, data: &str, timestamp: &str, nonce: u64) -> Hash256 {
    sha256(&block_preimage(prev_hash, data, timestamp, nonce))
}
