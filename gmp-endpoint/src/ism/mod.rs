//! Interchain Security Modules
//!
//! A security module answers one question for the destination mailbox: is
//! this message authentic? The mailbox consults it after recording
//! admission and before invoking the recipient.
//!
//! ## Modules
//!
//! - `TrustedIsm`: accepts everything (local testing)
//! - `MessageIdAuthorizedIsm`: accepts ids a trusted native bridge has vouched for
//! - `DomainRoutingIsm`: delegates to a module chosen by origin domain

mod message_id;
mod routing;
mod trusted;

use gmp_common::{GmpError, GmpMessage};
use serde::Serialize;

use crate::chain::CallContext;

pub use message_id::{CallerAuthentication, MessageIdAuthorizedIsm};
pub use routing::DomainRoutingIsm;
pub use trusted::TrustedIsm;

/// Classification tag for off-chain tooling (metadata builders pick a
/// strategy per type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModuleType {
    Unused = 0,
    Routing = 1,
    Aggregation = 2,
    Multisig = 3,
    Null = 4,
    MessageIdAuthorized = 5,
}

pub trait InterchainSecurityModule: Send + Sync {
    fn module_type(&self) -> ModuleType;

    /// Returns whether `message` is authentic. An `Err` is treated by the
    /// mailbox exactly like `Ok(false)`.
    fn verify(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<bool, GmpError>;
}
