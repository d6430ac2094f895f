//! 32-byte word used for addresses and message identities.
//!
//! Addresses are chain-agnostic: a 20-byte EVM address is stored left-padded
//! with 12 zero bytes, a 32-byte address (Move, Solana) is stored as-is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GmpError;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Left-pads a 20-byte EVM address into a 32-byte word.
    pub const fn from_evm_address(addr: [u8; 20]) -> Self {
        let mut out = [0u8; 32];
        let mut i = 0;
        while i < 20 {
            out[12 + i] = addr[i];
            i += 1;
        }
        H256(out)
    }

    /// Big-endian `value` in the low 8 bytes.
    pub fn from_low_u64_be(value: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&value.to_be_bytes());
        H256(out)
    }

    /// Builds a word from exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GmpError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            GmpError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(H256(array))
    }

    /// Low 20 bytes, i.e. the EVM address view of this word.
    pub fn to_evm_address(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[12..]);
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for H256 {
    type Err = GmpError;

    /// Parses a hex word with or without `0x`, restoring stripped leading zeros.
    fn from_str(addr: &str) -> Result<Self, Self::Err> {
        let hex_clean = addr.strip_prefix("0x").unwrap_or(addr);
        if hex_clean.len() > 64 {
            return Err(GmpError::InvalidAddress(format!(
                "'{}' is longer than 32 bytes",
                addr
            )));
        }
        // Left-pad to 64 hex chars (32 bytes) to handle addresses with stripped leading zeros
        let padded = format!("{:0>64}", hex_clean);
        let bytes = hex::decode(&padded)
            .map_err(|e| GmpError::InvalidAddress(format!("'{}': {}", addr, e)))?;
        H256::from_slice(&bytes)
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        H256::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter writing byte vectors as `0x`-prefixed hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
