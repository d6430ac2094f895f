//! Hashing helpers.
//!
//! Message identities and call selectors both use keccak256 so that ids
//! computed here match the ids any EVM-side party derives from the same bytes.

use sha3::{Digest, Keccak256};

use crate::types::H256;

/// keccak256 over `data`.
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256(hasher.finalize().into())
}

/// keccak256 over the concatenation of `parts`, without allocating the joined buffer.
pub fn keccak256_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    H256(hasher.finalize().into())
}

/// Four-byte function selector for a call signature such as `verifyMessageId(bytes32)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.0[..4]);
    out
}
