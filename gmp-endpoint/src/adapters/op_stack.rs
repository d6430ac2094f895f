//! OP Stack cross-domain messenger adapter.
//!
//! Origin side: the hook calls `sendMessage(ism, verifyMessageId(id), gas)`
//! on the L1 messenger. Destination side: the L2 messenger executes the call
//! and exposes the L1 sender through `xDomainMessageSender()` while it runs.

use std::sync::Arc;

use gmp_common::{GmpError, H256};
use tracing::debug;

use crate::chain::{CallContext, Contract};
use crate::hooks::{MessageIdTransport, TransportRequest};
use crate::ism::CallerAuthentication;

/// L2 cross-domain messenger predeploy.
pub const L2_CROSS_DOMAIN_MESSENGER: H256 = H256::from_evm_address([
    0x42, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x07,
]);

/// Floor of the L2 gas limit. Metadata may raise it, never lower it.
pub const MIN_GAS_LIMIT: u32 = 30_000;

/// L1 messenger interface used by the hook.
pub trait CrossDomainMessenger: Contract {
    fn send_message(
        &self,
        ctx: &CallContext<'_>,
        target: H256,
        message: &[u8],
        min_gas_limit: u32,
    ) -> Result<(), GmpError>;
}

/// L2 messenger interface used by the security module.
pub trait XDomainMessageSource: Contract {
    /// L1 sender of the message currently being relayed.
    fn x_domain_message_sender(&self) -> Result<H256, GmpError>;
}

pub struct OpStackTransport {
    messenger: Arc<dyn CrossDomainMessenger>,
    gas_limit: u32,
}

impl OpStackTransport {
    pub fn new(messenger: Arc<dyn CrossDomainMessenger>) -> Self {
        Self {
            messenger,
            gas_limit: MIN_GAS_LIMIT,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u32) -> Self {
        self.gas_limit = gas_limit.max(MIN_GAS_LIMIT);
        self
    }

    pub fn gas_limit(&self) -> u32 {
        self.gas_limit
    }

    /// Gas for the L2 call: the metadata request, never below the configured
    /// limit and capped at `u32::MAX`.
    pub fn effective_gas_limit(&self, requested: Option<u128>) -> u32 {
        requested
            .map(|gas| u32::try_from(gas).unwrap_or(u32::MAX))
            .map_or(self.gas_limit, |gas| gas.max(self.gas_limit))
    }
}

impl MessageIdTransport for OpStackTransport {
    fn name(&self) -> &'static str {
        "op_stack"
    }

    /// L1 to L2 messages are paid for by L1 gas only.
    fn quote(&self, _calldata_len: usize) -> u128 {
        0
    }

    fn send(&self, ctx: &CallContext<'_>, request: TransportRequest<'_>) -> Result<u128, GmpError> {
        let messenger = self.messenger.address();
        let gas_limit = self.effective_gas_limit(request.gas_limit);
        debug!(
            "Sending {} to {} through OP messenger {} (gas limit {})",
            request.id, request.ism, messenger, gas_limit
        );
        self.messenger.send_message(
            &ctx.forward(request.hook, messenger, 0)?,
            request.ism,
            &request.calldata,
            gas_limit,
        )?;
        Ok(0)
    }
}

/// Accepts calls relayed by the L2 messenger on behalf of the authorized hook.
pub struct OpStackAuthentication {
    l2_messenger: Arc<dyn XDomainMessageSource>,
}

impl OpStackAuthentication {
    pub fn new(l2_messenger: Arc<dyn XDomainMessageSource>) -> Self {
        Self { l2_messenger }
    }
}

impl CallerAuthentication for OpStackAuthentication {
    fn is_authorized(&self, ctx: &CallContext<'_>, authorized_hook: H256) -> bool {
        ctx.caller() == self.l2_messenger.address()
            && matches!(
                self.l2_messenger.x_domain_message_sender(),
                Ok(sender) if sender == authorized_hook
            )
    }
}
