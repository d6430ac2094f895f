//! Events emitted by endpoint contracts.
//!
//! The `Dispatch` event is the only place the raw message bytes become
//! observable to off-chain relayers.

use gmp_common::types::hex_bytes;
use gmp_common::H256;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChainEvent {
    // Mailbox
    Dispatch {
        sender: H256,
        destination: u32,
        recipient: H256,
        #[serde(with = "hex_bytes")]
        message: Vec<u8>,
    },
    DispatchId {
        id: H256,
    },
    Process {
        origin: u32,
        sender: H256,
        recipient: H256,
    },
    ProcessId {
        id: H256,
    },
    DefaultIsmSet {
        module: H256,
    },
    DefaultHookSet {
        hook: H256,
    },
    OwnershipTransferred {
        previous_owner: H256,
        new_owner: H256,
    },

    // Security modules
    ReceivedMessage {
        id: H256,
    },
    AuthorizedHookSet {
        hook: H256,
    },
    ModuleSet {
        domain: u32,
        module: H256,
    },
    ModuleRemoved {
        domain: u32,
    },

    // Hooks
    DestinationIsmSet {
        ism: H256,
    },
    HookSet {
        domain: u32,
        hook: H256,
    },
    RetryableTicketSubmitted {
        submission_fee: u128,
        caller: H256,
        id: H256,
    },

    // Native bridges
    BridgeMessageSent {
        sequence: u64,
        sender: H256,
        target: H256,
    },
    RetryableTicketCreated {
        ticket_id: u64,
        from: H256,
        to: H256,
    },

    // Recipients
    Handled {
        origin: u32,
        sender: H256,
        #[serde(with = "hex_bytes")]
        body: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub block_number: u64,
    pub emitter: H256,
    #[serde(flatten)]
    pub event: ChainEvent,
}
