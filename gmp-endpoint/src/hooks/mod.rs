//! Post-Dispatch Hooks
//!
//! A hook runs synchronously inside `Mailbox::dispatch`, after the mailbox has
//! committed the nonce increment and emitted the dispatch events. Value
//! attached to the dispatch is forwarded to the hook.
//!
//! ## Hooks
//!
//! - `NoopHook`: does nothing, costs nothing
//! - `MessageIdHook`: forwards the message id to the destination security
//!   module over a native bridge transport
//! - `DomainRoutingHook`: delegates to a hook chosen by destination domain

mod message_id;
mod noop;
mod routing;

use gmp_common::{GmpError, GmpMessage};
use serde::Serialize;

use crate::chain::CallContext;

pub use message_id::{MessageIdHook, MessageIdTransport, TransportRequest};
pub use noop::NoopHook;
pub use routing::DomainRoutingHook;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HookType {
    Unused = 0,
    Routing = 1,
    Aggregation = 2,
    MerkleTree = 3,
    InterchainGasPaymaster = 4,
    IdAuthIsm = 5,
}

pub trait PostDispatchHook: Send + Sync {
    fn hook_type(&self) -> HookType;

    fn supports_metadata(&self, metadata: &[u8]) -> bool;

    /// Value the caller must attach for `post_dispatch` to succeed.
    fn quote_dispatch(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError>;

    /// Runs the hook for a message being dispatched; returns the fee charged.
    fn post_dispatch(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError>;
}
