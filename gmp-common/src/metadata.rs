//! Standard hook metadata (variant 1).
//!
//! ```text
//! variant(2) | msg_value(32) | gas_limit(32) | refund_address(32) | custom(..)
//! ```
//!
//! Empty metadata is valid and means "use defaults". Amounts are 32-byte
//! big-endian words; values that do not fit in 128 bits are rejected.

use crate::error::GmpError;
use crate::types::H256;

pub const VARIANT: u16 = 1;

const VARIANT_OFFSET: usize = 0;
const MSG_VALUE_OFFSET: usize = 2;
const GAS_LIMIT_OFFSET: usize = 34;
const REFUND_ADDRESS_OFFSET: usize = 66;
const CUSTOM_OFFSET: usize = 98;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardHookMetadata {
    /// Value the destination call should carry
    pub msg_value: u128,
    /// Gas limit override (0 = hook default)
    pub gas_limit: u128,
    /// Where bridge refunds go (zero = dispatch caller)
    pub refund_address: H256,
    /// Hook-specific trailing bytes
    pub custom: Vec<u8>,
}

impl StandardHookMetadata {
    pub fn with_refund_address(refund_address: H256) -> Self {
        Self {
            refund_address,
            ..Self::default()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CUSTOM_OFFSET + self.custom.len());
        out.extend_from_slice(&VARIANT.to_be_bytes());
        out.extend_from_slice(&u128_to_word(self.msg_value));
        out.extend_from_slice(&u128_to_word(self.gas_limit));
        out.extend_from_slice(self.refund_address.as_bytes());
        out.extend_from_slice(&self.custom);
        out
    }

    /// Decodes metadata; `Ok(None)` for empty input.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>, GmpError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        if bytes.len() < CUSTOM_OFFSET {
            return Err(GmpError::InvalidMetadata(format!(
                "expected at least {} bytes, got {}",
                CUSTOM_OFFSET,
                bytes.len()
            )));
        }

        let variant = u16::from_be_bytes([bytes[VARIANT_OFFSET], bytes[VARIANT_OFFSET + 1]]);
        if variant != VARIANT {
            return Err(GmpError::InvalidMetadata(format!(
                "unsupported variant {}",
                variant
            )));
        }

        Ok(Some(Self {
            msg_value: word_to_u128(&bytes[MSG_VALUE_OFFSET..GAS_LIMIT_OFFSET])?,
            gas_limit: word_to_u128(&bytes[GAS_LIMIT_OFFSET..REFUND_ADDRESS_OFFSET])?,
            refund_address: H256::from_slice(&bytes[REFUND_ADDRESS_OFFSET..CUSTOM_OFFSET])?,
            custom: bytes[CUSTOM_OFFSET..].to_vec(),
        }))
    }

    /// Whether a hook accepting standard metadata can read `bytes`.
    pub fn is_supported(bytes: &[u8]) -> bool {
        bytes.is_empty()
            || (bytes.len() >= 2 && u16::from_be_bytes([bytes[0], bytes[1]]) == VARIANT)
    }
}

/// Refund address carried in `metadata`, or `default` when absent or zero.
pub fn refund_address(metadata: Option<&StandardHookMetadata>, default: H256) -> H256 {
    match metadata {
        Some(m) if !m.refund_address.is_zero() => m.refund_address,
        _ => default,
    }
}

fn u128_to_word(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

fn word_to_u128(word: &[u8]) -> Result<u128, GmpError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(GmpError::InvalidMetadata(
            "amount does not fit in 128 bits".to_string(),
        ));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Ok(u128::from_be_bytes(buf))
}
