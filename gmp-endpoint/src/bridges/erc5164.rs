use std::collections::VecDeque;
use std::sync::Arc;

use gmp_common::crypto::keccak256_concat;
use gmp_common::{GmpError, H256};
use tracing::{debug, info, warn};

use super::{ensure_domain, settle_head, NativeBridge};
use crate::adapters::MessageDispatcher;
use crate::chain::{CallContext, Chain, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedMessage {
    pub sequence: u64,
    pub message_id: H256,
    pub from: H256,
    pub to: H256,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct DispatcherState {
    next_sequence: u64,
    queue: VecDeque<DispatchedMessage>,
}

/// ERC-5164 dispatcher on the origin chain, bound to one executor.
pub struct MockMessageDispatcher {
    address: H256,
    executor: Arc<MockMessageExecutor>,
    state: StateCell<DispatcherState>,
}

impl MockMessageDispatcher {
    pub fn new(address: H256, executor: Arc<MockMessageExecutor>) -> Self {
        Self {
            address,
            executor,
            state: StateCell::new(DispatcherState::default()),
        }
    }

    pub fn executor(&self) -> &Arc<MockMessageExecutor> {
        &self.executor
    }

    /// Chain id this dispatcher delivers to.
    pub fn to_chain_id(&self) -> u64 {
        u64::from(self.executor.domain)
    }

    pub fn queued(&self) -> Vec<DispatchedMessage> {
        self.state.read().queue.iter().cloned().collect()
    }
}

impl MessageDispatcher for MockMessageDispatcher {
    fn dispatch_message(
        &self,
        ctx: &CallContext<'_>,
        to_chain_id: u64,
        to: H256,
        data: &[u8],
    ) -> Result<H256, GmpError> {
        if to_chain_id != self.to_chain_id() {
            return Err(GmpError::UnsupportedCall(format!(
                "dispatcher {} does not serve chain {}",
                self.address, to_chain_id
            )));
        }

        let mut state = self.state.write();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let message_id = keccak256_concat(&[
            self.address.as_bytes(),
            &sequence.to_be_bytes(),
            ctx.caller().as_bytes(),
            to.as_bytes(),
            data,
        ]);
        state.queue.push_back(DispatchedMessage {
            sequence,
            message_id,
            from: ctx.caller(),
            to,
            data: data.to_vec(),
        });
        drop(state);

        ctx.emit(
            self.address,
            ChainEvent::BridgeMessageSent {
                sequence,
                sender: ctx.caller(),
                target: to,
            },
        );
        debug!("Dispatcher {} queued {} to {}", self.address, message_id, to);
        Ok(message_id)
    }
}

impl NativeBridge for MockMessageDispatcher {
    fn kind(&self) -> &'static str {
        "erc5164"
    }

    fn pending(&self) -> usize {
        self.state.read().queue.len()
    }

    fn deliver_next(&self, destination: &Chain) -> Result<Option<u64>, GmpError> {
        let next = self.state.read().queue.front().cloned();
        let Some(message) = next else {
            return Ok(None);
        };
        ensure_domain(destination, self.executor.domain)?;

        let result = self.executor.execute(destination, message.to, &message.data);
        settle_head(&mut self.state.write().queue, result.is_ok());
        if let Err(e) = result {
            warn!(
                "Executor {} failed dispatch {}; requeued: {}",
                self.executor.address, message.message_id, e
            );
            return Err(e);
        }
        info!(
            "Executor {} executed dispatch {} on {}",
            self.executor.address,
            message.message_id,
            destination.name()
        );
        Ok(Some(message.sequence))
    }

    /// The executor does not vouch for a sender, so `sender` is ignored.
    fn deliver_as(
        &self,
        destination: &Chain,
        _sender: H256,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        self.executor.execute(destination, target, calldata)
    }
}

impl Contract for MockMessageDispatcher {
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

// ============================================================================
// EXECUTOR
// ============================================================================

/// ERC-5164 executor on the destination chain.
pub struct MockMessageExecutor {
    address: H256,
    domain: u32,
}

impl MockMessageExecutor {
    pub fn new(address: H256, domain: u32) -> Self {
        Self { address, domain }
    }

    pub fn execute(
        &self,
        destination: &Chain,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        ensure_domain(destination, self.domain)?;
        destination.transact(self.address, target, 0, |ctx| {
            ctx.call(self.address, target, 0, calldata)
        })
    }
}

impl Contract for MockMessageExecutor {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        Box::new(())
    }

    fn restore(&self, _snapshot: Snapshot) {}
}
