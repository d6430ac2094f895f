//! Message recipients.
//!
//! A recipient is an application contract on the destination chain. It must
//! handle delivered messages and may name the security module that governs
//! it; the mailbox treats any failure of that query as "no override".

use std::sync::Arc;

use gmp_common::{GmpError, H256};
use serde::Serialize;
use tracing::info;

use crate::chain::{CallContext, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

pub trait MessageRecipient: Send + Sync {
    /// Security module this recipient wants to be governed by.
    ///
    /// Recipients without an opinion do not implement the query; the default
    /// fails the same way an absent function would.
    fn interchain_security_module(&self) -> Result<Option<H256>, GmpError> {
        Err(GmpError::UnsupportedCall(
            "interchainSecurityModule() not implemented".to_string(),
        ))
    }

    /// Handles a verified message. `ctx.value()` is the value attached to
    /// `process`.
    fn handle(
        &self,
        ctx: &CallContext<'_>,
        origin: u32,
        sender: H256,
        body: &[u8],
    ) -> Result<(), GmpError>;
}

// ============================================================================
// TEST RECIPIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub origin: u32,
    pub sender: H256,
    #[serde(with = "gmp_common::types::hex_bytes")]
    pub body: Vec<u8>,
    pub value: u128,
}

#[derive(Debug, Clone, Default)]
struct RecipientState {
    received: Vec<ReceivedMessage>,
    ism: Option<H256>,
    fail_ism_query: bool,
    fail_handle: bool,
}

/// Recipient that records everything it handles.
///
/// Its behaviour can be bent for tests: it can name a security module, make
/// the module query fail, or reject every message.
pub struct TestRecipient {
    address: H256,
    state: StateCell<RecipientState>,
}

impl TestRecipient {
    pub fn new(address: H256) -> Self {
        Self {
            address,
            state: StateCell::new(RecipientState::default()),
        }
    }

    pub fn received(&self) -> Vec<ReceivedMessage> {
        self.state.read().received.clone()
    }

    pub fn last_received(&self) -> Option<ReceivedMessage> {
        self.state.read().received.last().cloned()
    }

    pub fn set_ism(&self, ism: Option<H256>) {
        self.state.write().ism = ism;
    }

    pub fn set_fail_ism_query(&self, fail: bool) {
        self.state.write().fail_ism_query = fail;
    }

    pub fn set_fail_handle(&self, fail: bool) {
        self.state.write().fail_handle = fail;
    }
}

impl MessageRecipient for TestRecipient {
    fn interchain_security_module(&self) -> Result<Option<H256>, GmpError> {
        let state = self.state.read();
        if state.fail_ism_query {
            return Err(GmpError::UnsupportedCall(
                "interchainSecurityModule() reverted".to_string(),
            ));
        }
        Ok(state.ism)
    }

    fn handle(
        &self,
        ctx: &CallContext<'_>,
        origin: u32,
        sender: H256,
        body: &[u8],
    ) -> Result<(), GmpError> {
        if self.state.read().fail_handle {
            return Err(GmpError::UnsupportedCall("handle() reverted".to_string()));
        }

        self.state.write().received.push(ReceivedMessage {
            origin,
            sender,
            body: body.to_vec(),
            value: ctx.value(),
        });
        ctx.emit(
            self.address,
            ChainEvent::Handled {
                origin,
                sender,
                body: body.to_vec(),
            },
        );
        info!(
            "Recipient {} handled {} bytes from {} on domain {}",
            self.address,
            body.len(),
            sender,
            origin
        );
        Ok(())
    }
}

impl Contract for TestRecipient {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.state.restore(snapshot)
    }

    fn as_recipient(self: Arc<Self>) -> Option<Arc<dyn MessageRecipient>> {
        Some(self)
    }
}
