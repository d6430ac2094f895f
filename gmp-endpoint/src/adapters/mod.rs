//! Native bridge adapters.
//!
//! Each adapter has two halves: a `MessageIdTransport` used by the
//! origin-side `MessageIdHook`, and a `CallerAuthentication` used by the
//! destination-side `MessageIdAuthorizedIsm`. The adapter is only as secure
//! as the bridge's ability to report who originated a call.

pub mod arbitrum;
pub mod erc5164;
pub mod op_stack;

pub use arbitrum::{
    apply_l1_to_l2_alias, AliasedSenderAuthentication, ArbitrumTransport, RetryableTicketInbox,
    RetryableTicketRequest,
};
pub use erc5164::{Erc5164Authentication, Erc5164Transport, MessageDispatcher};
pub use op_stack::{
    CrossDomainMessenger, OpStackAuthentication, OpStackTransport, XDomainMessageSource,
    L2_CROSS_DOMAIN_MESSENGER,
};
