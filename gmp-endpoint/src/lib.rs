//! GMP Endpoint Library
//!
//! On-chain side of the message bus, executed against an in-process chain
//! model: the per-domain `Mailbox`, pluggable security modules, post-dispatch
//! hooks, native bridge adapters coupling a hook to a module through a
//! bridge side-channel, and mock native bridges to run them against.

pub mod adapters;
pub mod bridges;
pub mod chain;
pub mod events;
pub mod hooks;
pub mod ism;
pub mod mailbox;
pub mod recipient;

// Re-export commonly used types
pub use bridges::NativeBridge;
pub use chain::{CallContext, Chain, Contract};
pub use events::{ChainEvent, EventRecord};
pub use hooks::{DomainRoutingHook, HookType, MessageIdHook, NoopHook, PostDispatchHook};
pub use ism::{
    CallerAuthentication, DomainRoutingIsm, InterchainSecurityModule, MessageIdAuthorizedIsm,
    ModuleType, TrustedIsm,
};
pub use mailbox::{Delivery, DispatchReceipt, Mailbox, MAX_MESSAGE_BODY_BYTES};
pub use recipient::{MessageRecipient, TestRecipient};
