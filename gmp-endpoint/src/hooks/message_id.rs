//! Message-id-authenticated hook.
//!
//! On `post_dispatch` the hook hands `verifyMessageId(id)` call data to a
//! native bridge transport addressed at the destination security module. The
//! module later accepts the message because the bridge vouches that the call
//! came from this hook.
//!
//! Only the message the mailbox is dispatching right now can be forwarded;
//! otherwise anyone could call the hook with a forged message and obtain an
//! authorization for it.

use std::sync::Arc;

use gmp_common::calls::{encode_verify_message_id, VERIFY_MESSAGE_ID_CALLDATA_LEN};
use gmp_common::metadata::refund_address;
use gmp_common::{GmpError, GmpMessage, StandardHookMetadata, H256};
use tracing::{debug, info};

use super::{HookType, PostDispatchHook};
use crate::chain::{CallContext, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;
use crate::mailbox::Mailbox;

/// Everything a transport needs to carry one authorization across.
#[derive(Debug, Clone)]
pub struct TransportRequest<'a> {
    /// Hook sending the request (payer on the origin chain)
    pub hook: H256,
    /// Destination security module
    pub ism: H256,
    pub id: H256,
    pub message: &'a GmpMessage,
    /// Where bridge refunds go
    pub refund_address: H256,
    /// Gas limit requested in metadata, if any
    pub gas_limit: Option<u128>,
    pub calldata: Vec<u8>,
}

/// Origin-side half of a native-bridge adapter.
pub trait MessageIdTransport: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Value needed to carry `calldata_len` bytes across.
    fn quote(&self, calldata_len: usize) -> u128;

    /// Hands the authorization to the bridge. Returns the part of
    /// `ctx.value()` the bridge took; the hook refunds the rest.
    fn send(
        &self,
        ctx: &CallContext<'_>,
        request: TransportRequest<'_>,
    ) -> Result<u128, GmpError>;
}

#[derive(Debug, Clone)]
struct HookState {
    owner: H256,
    /// Destination security module (set once)
    ism: Option<H256>,
}

pub struct MessageIdHook<T> {
    address: H256,
    mailbox: Arc<Mailbox>,
    destination_domain: u32,
    transport: T,
    state: StateCell<HookState>,
}

impl<T: MessageIdTransport> MessageIdHook<T> {
    pub fn new(
        address: H256,
        mailbox: Arc<Mailbox>,
        destination_domain: u32,
        owner: H256,
        transport: T,
    ) -> Self {
        Self {
            address,
            mailbox,
            destination_domain,
            transport,
            state: StateCell::new(HookState { owner, ism: None }),
        }
    }

    pub fn destination_domain(&self) -> u32 {
        self.destination_domain
    }

    pub fn destination_ism(&self) -> Option<H256> {
        self.state.read().ism
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pairs this hook with the destination module. Owner only, once.
    pub fn set_destination_ism(&self, ctx: &CallContext<'_>, ism: H256) -> Result<(), GmpError> {
        let mut state = self.state.write();
        if ctx.caller() != state.owner {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        if ism.is_zero() {
            return Err(GmpError::NotConfigured("destination ISM is zero".to_string()));
        }
        if let Some(existing) = state.ism {
            return Err(GmpError::AlreadyConfigured(format!(
                "destination ISM already set to {}",
                existing
            )));
        }
        state.ism = Some(ism);
        drop(state);

        ctx.emit(self.address, ChainEvent::DestinationIsmSet { ism });
        info!(
            "Hook {} ({}) paired with ISM {} on domain {}",
            self.address,
            self.transport.name(),
            ism,
            self.destination_domain
        );
        Ok(())
    }

    fn prepare(
        &self,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<(H256, Option<StandardHookMetadata>), GmpError> {
        let metadata = StandardHookMetadata::decode(metadata)?;
        if let Some(m) = metadata.as_ref().filter(|m| m.msg_value != 0) {
            return Err(GmpError::InvalidMetadata(format!(
                "msg_value {} cannot be carried by an authorization call",
                m.msg_value
            )));
        }
        if message.destination != self.destination_domain {
            return Err(GmpError::WrongDestination {
                destination: message.destination,
                local: self.destination_domain,
            });
        }
        let ism = self
            .destination_ism()
            .ok_or_else(|| GmpError::NotConfigured("destination ISM not set".to_string()))?;
        Ok((ism, metadata))
    }
}

impl<T: MessageIdTransport> PostDispatchHook for MessageIdHook<T> {
    fn hook_type(&self) -> HookType {
        HookType::IdAuthIsm
    }

    fn supports_metadata(&self, metadata: &[u8]) -> bool {
        StandardHookMetadata::is_supported(metadata)
    }

    fn quote_dispatch(
        &self,
        _ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        self.prepare(metadata, message)?;
        Ok(self.transport.quote(VERIFY_MESSAGE_ID_CALLDATA_LEN))
    }

    fn post_dispatch(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        let (ism, metadata) = self.prepare(metadata, message)?;

        let id = message.id();
        if self.mailbox.latest_dispatched_id() != id {
            return Err(GmpError::MessageNotDispatching(id));
        }

        let calldata = encode_verify_message_id(id);
        let fee = self.transport.quote(calldata.len());
        if ctx.value() < fee {
            return Err(GmpError::InsufficientFunds {
                required: fee,
                available: ctx.value(),
            });
        }

        let refund = refund_address(metadata.as_ref(), message.sender);
        let spent = self.transport.send(
            ctx,
            TransportRequest {
                hook: self.address,
                ism,
                id,
                message,
                refund_address: refund,
                gas_limit: metadata.as_ref().map(|m| m.gas_limit).filter(|g| *g != 0),
                calldata,
            },
        )?;

        let excess = ctx.value().saturating_sub(spent);
        if excess > 0 {
            ctx.chain().transfer(self.address, refund, excess)?;
            debug!("Hook {} refunded {} to {}", self.address, excess, refund);
        }

        info!(
            "Hook {} sent authorization for {} via {} (fee {})",
            self.address,
            id,
            self.transport.name(),
            fee
        );
        Ok(fee)
    }
}

impl<T: MessageIdTransport> Contract for MessageIdHook<T> {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.state.restore(snapshot)
    }

    fn as_hook(self: Arc<Self>) -> Option<Arc<dyn PostDispatchHook>> {
        Some(self)
    }
}
