//! Error definitions shared by every GMP endpoint component.
//!
//! Every variant is a synchronous call failure. The chain model reverts the
//! whole transaction on any of them, so nonce, delivery record and
//! authorization record are left exactly as they were before the call.

use thiserror::Error;

use crate::types::H256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GmpError {
    #[error("Malformed message: {len} bytes is shorter than the {min}-byte header")]
    MalformedMessage { len: usize, min: usize },

    #[error("Wrong message version: expected {expected}, got {actual}")]
    WrongVersion { expected: u8, actual: u8 },

    #[error("Wrong destination: message is for domain {destination}, local domain is {local}")]
    WrongDestination { destination: u32, local: u32 },

    #[error("Message already delivered: {0}")]
    AlreadyDelivered(H256),

    #[error("Verification failed for message {0}")]
    VerificationFailed(H256),

    #[error("Unauthorized caller: {0}")]
    UnauthorizedCaller(H256),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Payload too large: {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Already configured: {0}")]
    AlreadyConfigured(String),

    #[error("Invalid hook metadata: {0}")]
    InvalidMetadata(String),

    #[error("Message {0} is not the message currently being dispatched")]
    MessageNotDispatching(H256),

    #[error("Recipient {recipient} failed to handle message: {reason}")]
    RecipientFailed { recipient: H256, reason: String },

    #[error("Unsupported call: {0}")]
    UnsupportedCall(String),

    #[error("Invalid call data: {0}")]
    InvalidCallData(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Outbound nonce exhausted")]
    NonceOverflow,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}
