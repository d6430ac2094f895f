//! GMP Common Library
//!
//! Shared building blocks for the GMP message bus: the 32-byte word used for
//! addresses and message identities, the canonical message wire format, the
//! standard hook metadata layout, bridge call data, and the error taxonomy
//! every endpoint component reports through.
//!
//! ## Wire Format
//!
//! ```text
//! version(1) | nonce(4) | origin(4) | sender(32) | destination(4) | recipient(32) | body(..)
//! ```
//!
//! All integers are big-endian. The message id is the keccak256 hash of the
//! exact formatted bytes.

pub mod calls;
pub mod crypto;
pub mod error;
pub mod message;
pub mod metadata;
pub mod types;

// Re-export commonly used types
pub use error::GmpError;
pub use message::{format_message, message_id, GmpMessage, HEADER_LENGTH, MESSAGE_VERSION};
pub use metadata::StandardHookMetadata;
pub use types::H256;
