//! Canonical message encoding and identity.
//!
//! The fixed-width header is followed by the raw body. The body carries no
//! length prefix because it is always the final field.

use serde::{Deserialize, Serialize};

use crate::crypto::keccak256;
use crate::error::GmpError;
use crate::types::{hex_bytes, H256};

/// Protocol version tag written by this implementation.
pub const MESSAGE_VERSION: u8 = 3;

const VERSION_OFFSET: usize = 0;
const NONCE_OFFSET: usize = 1;
const ORIGIN_OFFSET: usize = 5;
const SENDER_OFFSET: usize = 9;
const DESTINATION_OFFSET: usize = 41;
const RECIPIENT_OFFSET: usize = 45;
const BODY_OFFSET: usize = 77;

/// Length of the fixed-field prefix.
pub const HEADER_LENGTH: usize = BODY_OFFSET;

/// A parsed message. Immutable once formatted; its id is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmpMessage {
    pub version: u8,
    /// Sequence number assigned by the origin mailbox
    pub nonce: u32,
    /// Origin domain
    pub origin: u32,
    /// Dispatch caller on the origin chain (32 bytes, left-padded)
    pub sender: H256,
    /// Destination domain
    pub destination: u32,
    /// Receiving contract on the destination chain (32 bytes, left-padded)
    pub recipient: H256,
    #[serde(with = "hex_bytes")]
    pub body: Vec<u8>,
}

impl GmpMessage {
    /// Packs the message into its wire representation.
    pub fn format(&self) -> Vec<u8> {
        format_message(
            self.version,
            self.nonce,
            self.origin,
            self.sender,
            self.destination,
            self.recipient,
            &self.body,
        )
    }

    /// Parses wire bytes.
    ///
    /// Fails with `MalformedMessage` if the input is shorter than the header.
    /// The version is not checked here; admission decides what to accept.
    pub fn parse(bytes: &[u8]) -> Result<Self, GmpError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(GmpError::MalformedMessage {
                len: bytes.len(),
                min: HEADER_LENGTH,
            });
        }

        Ok(Self {
            version: bytes[VERSION_OFFSET],
            nonce: read_u32(bytes, NONCE_OFFSET),
            origin: read_u32(bytes, ORIGIN_OFFSET),
            sender: read_h256(bytes, SENDER_OFFSET),
            destination: read_u32(bytes, DESTINATION_OFFSET),
            recipient: read_h256(bytes, RECIPIENT_OFFSET),
            body: bytes[BODY_OFFSET..].to_vec(),
        })
    }

    /// Identity of this message: keccak256 of the formatted bytes.
    pub fn id(&self) -> H256 {
        message_id(&self.format())
    }
}

/// Packs message fields in wire order.
#[allow(clippy::too_many_arguments)]
pub fn format_message(
    version: u8,
    nonce: u32,
    origin: u32,
    sender: H256,
    destination: u32,
    recipient: H256,
    body: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LENGTH + body.len());
    out.push(version);
    out.extend_from_slice(&nonce.to_be_bytes());
    out.extend_from_slice(&origin.to_be_bytes());
    out.extend_from_slice(sender.as_bytes());
    out.extend_from_slice(&destination.to_be_bytes());
    out.extend_from_slice(recipient.as_bytes());
    out.extend_from_slice(body);
    out
}

/// Hash of the exact message bytes. Any party holding the bytes derives the same id.
pub fn message_id(message: &[u8]) -> H256 {
    keccak256(message)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

fn read_h256(bytes: &[u8], offset: usize) -> H256 {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[offset..offset + 32]);
    H256(buf)
}
