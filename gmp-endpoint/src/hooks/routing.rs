use std::collections::HashMap;
use std::sync::Arc;

use gmp_common::{GmpError, GmpMessage, H256};
use tracing::{debug, info};

use super::{HookType, PostDispatchHook};
use crate::chain::{CallContext, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

#[derive(Debug, Clone)]
struct RoutingState {
    owner: H256,
    /// destination domain -> hook address
    hooks: HashMap<u32, H256>,
}

/// Delegates to a hook selected by the message's destination domain.
pub struct DomainRoutingHook {
    address: H256,
    state: StateCell<RoutingState>,
}

impl DomainRoutingHook {
    pub fn new(address: H256, owner: H256) -> Self {
        Self {
            address,
            state: StateCell::new(RoutingState {
                owner,
                hooks: HashMap::new(),
            }),
        }
    }

    pub fn hook(&self, destination: u32) -> Option<H256> {
        self.state.read().hooks.get(&destination).copied()
    }

    /// Routes messages bound for `destination` to `hook`. Owner only; the
    /// address must resolve to a hook on this chain.
    pub fn set_hook(
        &self,
        ctx: &CallContext<'_>,
        destination: u32,
        hook: H256,
    ) -> Result<(), GmpError> {
        if ctx.caller() != self.state.read().owner {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        if hook.is_zero() || ctx.chain().hook(hook).is_none() {
            return Err(GmpError::NotConfigured(format!("{} is not a hook", hook)));
        }

        self.state.write().hooks.insert(destination, hook);
        ctx.emit(
            self.address,
            ChainEvent::HookSet {
                domain: destination,
                hook,
            },
        );
        info!(
            "Routing hook {}: destination {} -> {}",
            self.address, destination, hook
        );
        Ok(())
    }

    fn resolve(
        &self,
        ctx: &CallContext<'_>,
        message: &GmpMessage,
    ) -> Result<(H256, Arc<dyn PostDispatchHook>), GmpError> {
        let address = self.hook(message.destination).ok_or_else(|| {
            GmpError::NotConfigured(format!("no hook for destination {}", message.destination))
        })?;
        let hook = ctx
            .chain()
            .hook(address)
            .ok_or_else(|| GmpError::NotConfigured(format!("no hook at {}", address)))?;
        Ok((address, hook))
    }
}

impl PostDispatchHook for DomainRoutingHook {
    fn hook_type(&self) -> HookType {
        HookType::Routing
    }

    fn supports_metadata(&self, _metadata: &[u8]) -> bool {
        true
    }

    fn quote_dispatch(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        let (_, hook) = self.resolve(ctx, message)?;
        hook.quote_dispatch(ctx, metadata, message)
    }

    fn post_dispatch(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        let (address, hook) = self.resolve(ctx, message)?;
        if !hook.supports_metadata(metadata) {
            return Err(GmpError::InvalidMetadata(format!(
                "hook {} does not support the supplied metadata",
                address
            )));
        }
        debug!("Routing hook {} delegating to {}", self.address, address);
        hook.post_dispatch(&ctx.forward(self.address, address, ctx.value())?, metadata, message)
    }
}

impl Contract for DomainRoutingHook {
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
