//! Message-id-authorized security module.
//!
//! Turns a native bridge that can prove "this call came from contract X on
//! chain Y" into a boolean oracle keyed by message id:
//!
//! 1. The origin-side hook sends `verifyMessageId(id)` through the bridge.
//! 2. The bridge executes that call here; `CallerAuthentication` decides
//!    whether the caller really is the bridge relaying for `authorized_hook`.
//! 3. `verify` succeeds iff the id has been authorized.
//!
//! Authorization is never cleared by `verify`; replay protection is the
//! mailbox delivery record. A `process` that reverted elsewhere can be
//! retried against the same authorization.

use std::collections::HashMap;
use std::sync::Arc;

use gmp_common::calls::decode_verify_message_id;
use gmp_common::{GmpError, GmpMessage, H256};
use tracing::{info, warn};

use super::{InterchainSecurityModule, ModuleType};
use crate::chain::{CallContext, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

/// Bridge-specific check that the current caller is the trusted bridge
/// relaying a call made by `authorized_hook` on the origin chain.
pub trait CallerAuthentication: Send + Sync + 'static {
    fn is_authorized(&self, ctx: &CallContext<'_>, authorized_hook: H256) -> bool;
}

#[derive(Debug, Clone)]
struct AuthorizationState {
    owner: H256,
    /// Origin-side hook allowed to assert authorization (set once)
    authorized_hook: Option<H256>,
    /// message id -> authorized
    verified: HashMap<H256, bool>,
}

pub struct MessageIdAuthorizedIsm<A> {
    address: H256,
    authentication: A,
    state: StateCell<AuthorizationState>,
}

impl<A: CallerAuthentication> MessageIdAuthorizedIsm<A> {
    pub fn new(address: H256, owner: H256, authentication: A) -> Self {
        Self {
            address,
            authentication,
            state: StateCell::new(AuthorizationState {
                owner,
                authorized_hook: None,
                verified: HashMap::new(),
            }),
        }
    }

    pub fn owner(&self) -> H256 {
        self.state.read().owner
    }

    pub fn authorized_hook(&self) -> Option<H256> {
        self.state.read().authorized_hook
    }

    /// Pairs this module with its origin-side hook. Owner only, once.
    pub fn set_authorized_hook(&self, ctx: &CallContext<'_>, hook: H256) -> Result<(), GmpError> {
        let mut state = self.state.write();
        if ctx.caller() != state.owner {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        if hook.is_zero() {
            return Err(GmpError::NotConfigured("authorized hook is zero".to_string()));
        }
        if let Some(existing) = state.authorized_hook {
            return Err(GmpError::AlreadyConfigured(format!(
                "authorized hook already set to {}",
                existing
            )));
        }
        state.authorized_hook = Some(hook);
        drop(state);

        ctx.emit(self.address, ChainEvent::AuthorizedHookSet { hook });
        info!("ISM {} paired with hook {}", self.address, hook);
        Ok(())
    }

    /// Privileged mutator: records authorization for `id`. Only the trusted
    /// bridge relaying for the authorized hook may call it.
    pub fn verify_message_id(&self, ctx: &CallContext<'_>, id: H256) -> Result<(), GmpError> {
        let hook = self
            .authorized_hook()
            .ok_or_else(|| GmpError::NotConfigured("authorized hook not set".to_string()))?;

        if !self.authentication.is_authorized(ctx, hook) {
            warn!(
                "ISM {} rejected authorization of {} from {}",
                self.address,
                id,
                ctx.caller()
            );
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }

        self.state.write().verified.insert(id, true);
        ctx.emit(self.address, ChainEvent::ReceivedMessage { id });
        info!("ISM {} authorized message {}", self.address, id);
        Ok(())
    }

    pub fn is_verified_id(&self, id: H256) -> bool {
        self.state.read().verified.get(&id).copied().unwrap_or(false)
    }

    pub fn is_verified(&self, message: &GmpMessage) -> bool {
        self.is_verified_id(message.id())
    }
}

impl<A: CallerAuthentication> InterchainSecurityModule for MessageIdAuthorizedIsm<A> {
    fn module_type(&self) -> ModuleType {
        ModuleType::MessageIdAuthorized
    }

    fn verify(
        &self,
        _ctx: &CallContext<'_>,
        _metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<bool, GmpError> {
        Ok(self.is_verified(message))
    }
}

impl<A: CallerAuthentication> Contract for MessageIdAuthorizedIsm<A> {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.state.restore(snapshot)
    }

    fn call(&self, ctx: &CallContext<'_>, calldata: &[u8]) -> Result<Vec<u8>, GmpError> {
        let id = decode_verify_message_id(calldata)?;
        self.verify_message_id(ctx, id)?;
        Ok(Vec::new())
    }

    fn as_ism(self: Arc<Self>) -> Option<Arc<dyn InterchainSecurityModule>> {
        Some(self)
    }
}
