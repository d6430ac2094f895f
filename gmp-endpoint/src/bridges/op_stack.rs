use std::collections::VecDeque;
use std::sync::Arc;

use gmp_common::{GmpError, H256};
use tracing::{debug, info, warn};

use super::{ensure_domain, settle_head, NativeBridge};
use crate::adapters::{CrossDomainMessenger, XDomainMessageSource};
use crate::chain::{CallContext, Chain, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub sequence: u64,
    /// L1 caller of `sendMessage`
    pub sender: H256,
    pub target: H256,
    pub calldata: Vec<u8>,
    pub gas_limit: u32,
}

#[derive(Debug, Clone, Default)]
struct OutboxState {
    next_sequence: u64,
    queue: VecDeque<SentMessage>,
}

/// L1 side of the OP Stack messenger, deployed on the origin chain.
pub struct MockOpStackMessenger {
    address: H256,
    l2: Arc<MockL2Messenger>,
    state: StateCell<OutboxState>,
}

impl MockOpStackMessenger {
    pub fn new(address: H256, l2: Arc<MockL2Messenger>) -> Self {
        Self {
            address,
            l2,
            state: StateCell::new(OutboxState::default()),
        }
    }

    pub fn l2_messenger(&self) -> &Arc<MockL2Messenger> {
        &self.l2
    }

    pub fn queued(&self) -> Vec<SentMessage> {
        self.state.read().queue.iter().cloned().collect()
    }
}

impl CrossDomainMessenger for MockOpStackMessenger {
    fn send_message(
        &self,
        ctx: &CallContext<'_>,
        target: H256,
        message: &[u8],
        min_gas_limit: u32,
    ) -> Result<(), GmpError> {
        let mut state = self.state.write();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push_back(SentMessage {
            sequence,
            sender: ctx.caller(),
            target,
            calldata: message.to_vec(),
            gas_limit: min_gas_limit,
        });
        drop(state);

        ctx.emit(
            self.address,
            ChainEvent::BridgeMessageSent {
                sequence,
                sender: ctx.caller(),
                target,
            },
        );
        debug!("OP messenger {} queued message {} to {}", self.address, sequence, target);
        Ok(())
    }
}

impl NativeBridge for MockOpStackMessenger {
    fn kind(&self) -> &'static str {
        "op_stack"
    }

    fn pending(&self) -> usize {
        self.state.read().queue.len()
    }

    fn deliver_next(&self, destination: &Chain) -> Result<Option<u64>, GmpError> {
        let next = self.state.read().queue.front().cloned();
        let Some(message) = next else {
            return Ok(None);
        };
        ensure_domain(destination, self.l2.domain)?;

        let result =
            self.l2
                .relay_message(destination, message.sender, message.target, &message.calldata);
        settle_head(&mut self.state.write().queue, result.is_ok());
        if let Err(e) = result {
            warn!(
                "OP messenger {} failed to relay message {}; requeued: {}",
                self.address, message.sequence, e
            );
            return Err(e);
        }
        info!(
            "OP messenger {} relayed message {} to {} on {}",
            self.address,
            message.sequence,
            message.target,
            destination.name()
        );
        Ok(Some(message.sequence))
    }

    fn deliver_as(
        &self,
        destination: &Chain,
        sender: H256,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        self.l2.relay_message(destination, sender, target, calldata)
    }
}

impl Contract for MockOpStackMessenger {
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
// L2 MESSENGER
// ============================================================================

/// L2 side of the OP Stack messenger, deployed on the destination chain at
/// the messenger predeploy address.
pub struct MockL2Messenger {
    address: H256,
    domain: u32,
    /// L1 sender of the message being relayed, if any
    x_domain_sender: StateCell<Option<H256>>,
}

impl MockL2Messenger {
    pub fn new(address: H256, domain: u32) -> Self {
        Self {
            address,
            domain,
            x_domain_sender: StateCell::new(None),
        }
    }

    /// Executes `calldata` on `target` with `sender` exposed as the
    /// cross-domain sender for the duration of the call.
    pub fn relay_message(
        &self,
        destination: &Chain,
        sender: H256,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        ensure_domain(destination, self.domain)?;
        let result = destination.transact(self.address, target, 0, |ctx| {
            *self.x_domain_sender.write() = Some(sender);
            let output = ctx.call(self.address, target, 0, calldata);
            *self.x_domain_sender.write() = None;
            output
        });
        *self.x_domain_sender.write() = None;
        result
    }
}

impl XDomainMessageSource for MockL2Messenger {
    fn x_domain_message_sender(&self) -> Result<H256, GmpError> {
        self.x_domain_sender
            .read()
            .ok_or_else(|| GmpError::NotConfigured("xDomainMessageSender is not set".to_string()))
    }
}

impl Contract for MockL2Messenger {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        self.x_domain_sender.snapshot()
    }

    fn restore(&self, snapshot: Snapshot) {
        self.x_domain_sender.restore(snapshot)
    }
}
