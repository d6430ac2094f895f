//! Mailbox
//!
//! The per-domain message bus. `dispatch` formats and admits outbound
//! messages; `process` admits inbound messages exactly once, verifies them
//! through the governing security module and delivers them to the recipient.
//!
//! ## Ordering
//!
//! Both entry points commit their own state (nonce, latest id, delivery
//! record) and emit their events before calling into any hook, module or
//! recipient. A reentrant call therefore observes the committed state and is
//! rejected by the nonce or replay checks.

use std::collections::HashMap;
use std::sync::Arc;

use gmp_common::{GmpError, GmpMessage, H256, MESSAGE_VERSION};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chain::{CallContext, Chain, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;
use crate::hooks::PostDispatchHook;

/// Largest body `dispatch` accepts.
pub const MAX_MESSAGE_BODY_BYTES: usize = 2048;

/// Admission record for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Caller of `process`
    pub processor: H256,
    pub block_number: u64,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub id: H256,
    pub nonce: u32,
    /// Fee charged by the post-dispatch hook
    pub fee: u128,
}

#[derive(Debug, Clone)]
struct MailboxState {
    owner: H256,
    /// Nonce the next dispatched message will carry
    nonce: u32,
    latest_dispatched_id: H256,
    default_ism: Option<H256>,
    default_hook: Option<H256>,
    /// message id -> admission record (insert only)
    deliveries: HashMap<H256, Delivery>,
}

pub struct Mailbox {
    address: H256,
    local_domain: u32,
    state: StateCell<MailboxState>,
}

impl Mailbox {
    pub fn new(address: H256, local_domain: u32, owner: H256) -> Self {
        Self {
            address,
            local_domain,
            state: StateCell::new(MailboxState {
                owner,
                nonce: 0,
                latest_dispatched_id: H256::ZERO,
                default_ism: None,
                default_hook: None,
                deliveries: HashMap::new(),
            }),
        }
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    pub fn local_domain(&self) -> u32 {
        self.local_domain
    }

    pub fn owner(&self) -> H256 {
        self.state.read().owner
    }

    pub fn nonce(&self) -> u32 {
        self.state.read().nonce
    }

    pub fn latest_dispatched_id(&self) -> H256 {
        self.state.read().latest_dispatched_id
    }

    pub fn default_ism(&self) -> Option<H256> {
        self.state.read().default_ism
    }

    pub fn default_hook(&self) -> Option<H256> {
        self.state.read().default_hook
    }

    pub fn delivered(&self, id: H256) -> bool {
        self.state.read().deliveries.contains_key(&id)
    }

    pub fn delivery(&self, id: H256) -> Option<Delivery> {
        self.state.read().deliveries.get(&id).copied()
    }

    /// Security module governing `recipient`: its own choice when it names a
    /// non-zero one, the default module otherwise.
    pub fn recipient_ism(&self, chain: &Chain, recipient: H256) -> Result<H256, GmpError> {
        if let Some(module) = try_probe_ism(chain, recipient) {
            return Ok(module);
        }
        self.default_ism()
            .ok_or_else(|| GmpError::NotConfigured("default ISM not set".to_string()))
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Value the caller must attach to `dispatch` the same message.
    pub fn quote_dispatch(
        &self,
        ctx: &CallContext<'_>,
        destination: u32,
        recipient: H256,
        body: &[u8],
        metadata: &[u8],
        hook: Option<H256>,
    ) -> Result<u128, GmpError> {
        let (_, hook) = self.resolve_hook(ctx.chain(), hook)?;
        let message = self.build_message(self.nonce(), ctx.caller(), destination, recipient, body);
        hook.quote_dispatch(ctx, metadata, &message)
    }

    /// Formats and admits an outbound message, then runs the post-dispatch
    /// hook (`hook`, or the default hook) with all attached value.
    pub fn dispatch(
        &self,
        ctx: &CallContext<'_>,
        destination: u32,
        recipient: H256,
        body: &[u8],
        metadata: &[u8],
        hook: Option<H256>,
    ) -> Result<DispatchReceipt, GmpError> {
        if body.len() > MAX_MESSAGE_BODY_BYTES {
            return Err(GmpError::PayloadTooLarge {
                size: body.len(),
                max: MAX_MESSAGE_BODY_BYTES,
            });
        }

        let (hook_address, hook) = self.resolve_hook(ctx.chain(), hook)?;

        let mut state = self.state.write();
        let nonce = state.nonce;
        let message = self.build_message(nonce, ctx.caller(), destination, recipient, body);
        let id = message.id();
        state.nonce = nonce.checked_add(1).ok_or(GmpError::NonceOverflow)?;
        state.latest_dispatched_id = id;
        drop(state);

        ctx.emit(
            self.address,
            ChainEvent::Dispatch {
                sender: message.sender,
                destination,
                recipient,
                message: message.format(),
            },
        );
        ctx.emit(self.address, ChainEvent::DispatchId { id });
        info!(
            "Dispatched message {} (nonce {}) from domain {} to domain {}",
            id, nonce, self.local_domain, destination
        );

        let fee = hook.post_dispatch(
            &ctx.forward(self.address, hook_address, ctx.value())?,
            metadata,
            &message,
        )?;
        debug!("Hook {} charged {} for message {}", hook_address, fee, id);

        Ok(DispatchReceipt { id, nonce, fee })
    }

    // ========================================================================
    // PROCESS
    // ========================================================================

    /// Admits, verifies and delivers an inbound message. Attached value is
    /// forwarded to the recipient.
    pub fn process(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message_bytes: &[u8],
    ) -> Result<H256, GmpError> {
        let message = GmpMessage::parse(message_bytes)?;
        if message.version != MESSAGE_VERSION {
            return Err(GmpError::WrongVersion {
                expected: MESSAGE_VERSION,
                actual: message.version,
            });
        }
        if message.destination != self.local_domain {
            return Err(GmpError::WrongDestination {
                destination: message.destination,
                local: self.local_domain,
            });
        }

        let id = message.id();
        if self.delivered(id) {
            return Err(GmpError::AlreadyDelivered(id));
        }

        let chain = ctx.chain();
        let ism_address = self.recipient_ism(chain, message.recipient)?;

        // Recorded before any external call; a reentrant process of the same
        // message fails the replay check above.
        self.state.write().deliveries.insert(
            id,
            Delivery {
                processor: ctx.caller(),
                block_number: chain.block_number(),
            },
        );
        ctx.emit(
            self.address,
            ChainEvent::Process {
                origin: message.origin,
                sender: message.sender,
                recipient: message.recipient,
            },
        );
        ctx.emit(self.address, ChainEvent::ProcessId { id });

        let ism = chain
            .ism(ism_address)
            .ok_or(GmpError::VerificationFailed(id))?;
        match ism.verify(&ctx.forward(self.address, ism_address, 0)?, metadata, &message) {
            Ok(true) => {}
            Ok(false) => {
                warn!("ISM {} rejected message {}", ism_address, id);
                return Err(GmpError::VerificationFailed(id));
            }
            Err(e) => {
                warn!("ISM {} reverted on message {}: {}", ism_address, id, e);
                return Err(GmpError::VerificationFailed(id));
            }
        }

        let recipient = chain.recipient(message.recipient).ok_or_else(|| {
            GmpError::NotConfigured(format!("no recipient at {}", message.recipient))
        })?;
        recipient
            .handle(
                &ctx.forward(self.address, message.recipient, ctx.value())?,
                message.origin,
                message.sender,
                &message.body,
            )
            .map_err(|e| GmpError::RecipientFailed {
                recipient: message.recipient,
                reason: e.to_string(),
            })?;

        info!(
            "Processed message {} from domain {} (verified by {})",
            id, message.origin, ism_address
        );
        Ok(id)
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    pub fn set_default_ism(&self, ctx: &CallContext<'_>, module: H256) -> Result<(), GmpError> {
        self.ensure_owner(ctx)?;
        if module.is_zero() || ctx.chain().ism(module).is_none() {
            return Err(GmpError::NotConfigured(format!(
                "{} is not a security module",
                module
            )));
        }
        self.state.write().default_ism = Some(module);
        ctx.emit(self.address, ChainEvent::DefaultIsmSet { module });
        info!("Mailbox {} default ISM set to {}", self.address, module);
        Ok(())
    }

    pub fn set_default_hook(&self, ctx: &CallContext<'_>, hook: H256) -> Result<(), GmpError> {
        self.ensure_owner(ctx)?;
        if hook.is_zero() || ctx.chain().hook(hook).is_none() {
            return Err(GmpError::NotConfigured(format!("{} is not a hook", hook)));
        }
        self.state.write().default_hook = Some(hook);
        ctx.emit(self.address, ChainEvent::DefaultHookSet { hook });
        info!("Mailbox {} default hook set to {}", self.address, hook);
        Ok(())
    }

    pub fn transfer_ownership(&self, ctx: &CallContext<'_>, new_owner: H256) -> Result<(), GmpError> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(GmpError::InvalidAddress("new owner is zero".to_string()));
        }
        let previous_owner = std::mem::replace(&mut self.state.write().owner, new_owner);
        ctx.emit(
            self.address,
            ChainEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn ensure_owner(&self, ctx: &CallContext<'_>) -> Result<(), GmpError> {
        if ctx.caller() != self.owner() {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        Ok(())
    }

    fn resolve_hook(
        &self,
        chain: &Chain,
        hook: Option<H256>,
    ) -> Result<(H256, Arc<dyn PostDispatchHook>), GmpError> {
        let address = match hook.filter(|h| !h.is_zero()) {
            Some(address) => address,
            None => self
                .default_hook()
                .ok_or_else(|| GmpError::NotConfigured("default hook not set".to_string()))?,
        };
        let hook = chain
            .hook(address)
            .ok_or_else(|| GmpError::NotConfigured(format!("{} is not a hook", address)))?;
        Ok((address, hook))
    }

    fn build_message(
        &self,
        nonce: u32,
        sender: H256,
        destination: u32,
        recipient: H256,
        body: &[u8],
    ) -> GmpMessage {
        GmpMessage {
            version: MESSAGE_VERSION,
            nonce,
            origin: self.local_domain,
            sender,
            destination,
            recipient,
            body: body.to_vec(),
        }
    }
}

/// Asks `recipient` for its preferred module. Every failure (no contract,
/// no recipient capability, query error, zero answer) collapses to `None`.
fn try_probe_ism(chain: &Chain, recipient: H256) -> Option<H256> {
    let recipient = chain.recipient(recipient)?;
    match recipient.interchain_security_module() {
        Ok(module) => module.filter(|m| !m.is_zero()),
        Err(e) => {
            debug!("ISM probe failed, falling back to default: {}", e);
            None
        }
    }
}

impl Contract for Mailbox {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.state.restore(snapshot)
    }
}
