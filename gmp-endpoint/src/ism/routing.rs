use std::collections::HashMap;
use std::sync::Arc;

use gmp_common::{GmpError, GmpMessage, H256};
use tracing::{debug, info};

use super::{InterchainSecurityModule, ModuleType};
use crate::chain::{CallContext, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

#[derive(Debug, Clone)]
struct RoutingState {
    owner: H256,
    /// origin domain -> module address
    modules: HashMap<u32, H256>,
}

/// Delegates verification to a module selected by the message's origin domain.
pub struct DomainRoutingIsm {
    address: H256,
    state: StateCell<RoutingState>,
}

impl DomainRoutingIsm {
    pub fn new(address: H256, owner: H256) -> Self {
        Self {
            address,
            state: StateCell::new(RoutingState {
                owner,
                modules: HashMap::new(),
            }),
        }
    }

    pub fn module(&self, origin: u32) -> Option<H256> {
        self.state.read().modules.get(&origin).copied()
    }

    /// Routes messages from `origin` to `module`. Owner only; the address must
    /// resolve to a security module on this chain.
    pub fn set(&self, ctx: &CallContext<'_>, origin: u32, module: H256) -> Result<(), GmpError> {
        if ctx.caller() != self.state.read().owner {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        if module.is_zero() || ctx.chain().ism(module).is_none() {
            return Err(GmpError::NotConfigured(format!(
                "{} is not a security module",
                module
            )));
        }

        self.state.write().modules.insert(origin, module);
        ctx.emit(
            self.address,
            ChainEvent::ModuleSet {
                domain: origin,
                module,
            },
        );
        info!("Routing ISM {}: origin {} -> {}", self.address, origin, module);
        Ok(())
    }

    pub fn remove(&self, ctx: &CallContext<'_>, origin: u32) -> Result<(), GmpError> {
        let mut state = self.state.write();
        if ctx.caller() != state.owner {
            return Err(GmpError::UnauthorizedCaller(ctx.caller()));
        }
        state.modules.remove(&origin);
        drop(state);

        ctx.emit(self.address, ChainEvent::ModuleRemoved { domain: origin });
        Ok(())
    }

    /// Module governing `message`.
    pub fn route(&self, message: &GmpMessage) -> Result<H256, GmpError> {
        self.module(message.origin).ok_or_else(|| {
            GmpError::NotConfigured(format!("no module for origin {}", message.origin))
        })
    }
}

impl InterchainSecurityModule for DomainRoutingIsm {
    fn module_type(&self) -> ModuleType {
        ModuleType::Routing
    }

    fn verify(
        &self,
        ctx: &CallContext<'_>,
        metadata: &[u8],
        message: &GmpMessage,
    ) -> Result<bool, GmpError> {
        let address = self.route(message)?;
        let module = ctx
            .chain()
            .ism(address)
            .ok_or_else(|| GmpError::NotConfigured(format!("no module at {}", address)))?;
        debug!("Routing ISM {} delegating to {}", self.address, address);
        module.verify(&ctx.forward(self.address, address, 0)?, metadata, message)
    }
}

impl Contract for DomainRoutingIsm {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.state.restore(snapshot)
    }

    fn as_ism(self: Arc<Self>) -> Option<Arc<dyn InterchainSecurityModule>> {
        Some(self)
    }
}
