//! In-process stand-ins for native bridges.
//!
//! Each mock queues outbound calls on the origin chain and delivers them to
//! the destination chain when pumped. They are trusted: whatever origin a
//! mock reports is taken at face value by the adapters. `deliver_as` exposes
//! that trust directly so tests can make a bridge claim any sender.

mod arbitrum;
mod erc5164;
mod op_stack;

use std::collections::VecDeque;

use gmp_common::{GmpError, H256};

use crate::chain::Chain;

pub use arbitrum::{MockInbox, RetryableTicket, DEFAULT_BASE_FEE};
pub use erc5164::{DispatchedMessage, MockMessageDispatcher, MockMessageExecutor};
pub use op_stack::{MockL2Messenger, MockOpStackMessenger, SentMessage};

/// Off-chain view of a bridge used by relayers and tests.
pub trait NativeBridge: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Items queued and not yet delivered.
    fn pending(&self) -> usize;

    /// Delivers the oldest queued item to `destination` and returns its
    /// sequence number, or `None` when the queue is empty. An item whose
    /// delivery fails moves to the back of the queue so the items behind it
    /// still land. Pumping a chain the bridge does not serve leaves the queue
    /// untouched.
    fn deliver_next(&self, destination: &Chain) -> Result<Option<u64>, GmpError>;

    /// Executes `calldata` on `target` as if the bridge relayed it from
    /// origin-side `sender`.
    fn deliver_as(
        &self,
        destination: &Chain,
        sender: H256,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError>;
}

fn ensure_domain(destination: &Chain, expected: u32) -> Result<(), GmpError> {
    if destination.domain() != expected {
        return Err(GmpError::WrongDestination {
            destination: expected,
            local: destination.domain(),
        });
    }
    Ok(())
}

/// Takes the head of `queue` off after a delivery attempt. A failed item is
/// requeued at the back.
fn settle_head<T>(queue: &mut VecDeque<T>, delivered: bool) {
    if let Some(item) = queue.pop_front() {
        if !delivered {
            queue.push_back(item);
        }
    }
}
