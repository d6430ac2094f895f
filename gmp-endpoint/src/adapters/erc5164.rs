//! ERC-5164 message dispatcher adapter.
//!
//! The dispatcher may be backed by any number of bridges. On the destination
//! the only check is that the caller is the dispatcher's executor; the
//! authenticity of the origin is entirely the dispatcher's responsibility.

use std::sync::Arc;

use gmp_common::{GmpError, H256};
use tracing::debug;

use crate::chain::{CallContext, Contract};
use crate::hooks::{MessageIdTransport, TransportRequest};
use crate::ism::CallerAuthentication;

pub trait MessageDispatcher: Contract {
    /// Queues `data` for execution on `to` in chain `to_chain_id`; returns the
    /// dispatcher's message id.
    fn dispatch_message(
        &self,
        ctx: &CallContext<'_>,
        to_chain_id: u64,
        to: H256,
        data: &[u8],
    ) -> Result<H256, GmpError>;
}

pub struct Erc5164Transport {
    dispatcher: Arc<dyn MessageDispatcher>,
    destination_chain_id: u64,
}

impl Erc5164Transport {
    pub fn new(dispatcher: Arc<dyn MessageDispatcher>, destination_chain_id: u64) -> Self {
        Self {
            dispatcher,
            destination_chain_id,
        }
    }
}

impl MessageIdTransport for Erc5164Transport {
    fn name(&self) -> &'static str {
        "erc5164"
    }

    fn quote(&self, _calldata_len: usize) -> u128 {
        0
    }

    fn send(&self, ctx: &CallContext<'_>, request: TransportRequest<'_>) -> Result<u128, GmpError> {
        let dispatcher = self.dispatcher.address();
        let dispatch_id = self.dispatcher.dispatch_message(
            &ctx.forward(request.hook, dispatcher, 0)?,
            self.destination_chain_id,
            request.ism,
            &request.calldata,
        )?;
        debug!(
            "Dispatcher {} queued {} as {} for chain {}",
            dispatcher, request.id, dispatch_id, self.destination_chain_id
        );
        Ok(0)
    }
}

pub struct Erc5164Authentication {
    executor: H256,
}

impl Erc5164Authentication {
    pub fn new(executor: H256) -> Self {
        Self { executor }
    }
}

impl CallerAuthentication for Erc5164Authentication {
    fn is_authorized(&self, ctx: &CallContext<'_>, _authorized_hook: H256) -> bool {
        ctx.caller() == self.executor
    }
}
