//! Arbitrum retryable ticket adapter.
//!
//! The hook buys a retryable ticket that calls `verifyMessageId(id)` on the
//! destination module. The L2 call arrives from the aliased address of the
//! hook. Gas limit and gas price are fixed ceilings so a misbehaving fee
//! oracle cannot charge the caller an unbounded amount.

use std::sync::Arc;

use gmp_common::{GmpError, H256};
use tracing::info;

use crate::chain::{CallContext, Contract};
use crate::events::ChainEvent;
use crate::hooks::{MessageIdTransport, TransportRequest};
use crate::ism::CallerAuthentication;

/// Gas limit of the L2 `verifyMessageId` call.
pub const GAS_LIMIT: u128 = 26_000;

/// Price per unit of L2 gas the ticket is willing to pay.
pub const MAX_GAS_PRICE: u128 = 1_000_000_000;

/// Offset added to an L1 contract address to obtain its L2 alias.
pub const L1_TO_L2_ALIAS_OFFSET: [u8; 20] = [
    0x11, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x11, 0x11,
];

/// Parameters of `createRetryableTicket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableTicketRequest {
    pub to: H256,
    pub l2_call_value: u128,
    pub max_submission_cost: u128,
    pub excess_fee_refund_address: H256,
    pub call_value_refund_address: H256,
    pub gas_limit: u128,
    pub max_fee_per_gas: u128,
    pub data: Vec<u8>,
}

impl RetryableTicketRequest {
    /// Deposit the ticket needs at minimum.
    pub fn required_deposit(&self) -> Result<u128, GmpError> {
        self.gas_limit
            .checked_mul(self.max_fee_per_gas)
            .and_then(|gas| gas.checked_add(self.max_submission_cost))
            .and_then(|total| total.checked_add(self.l2_call_value))
            .ok_or(GmpError::ArithmeticOverflow)
    }
}

pub trait RetryableTicketInbox: Contract {
    /// Fee for submitting `data_length` bytes; `base_fee = 0` uses the
    /// inbox's current base fee.
    fn calculate_retryable_submission_fee(&self, data_length: usize, base_fee: u128) -> u128;

    /// Creates a ticket funded with `ctx.value()`; returns the ticket number.
    fn create_retryable_ticket(
        &self,
        ctx: &CallContext<'_>,
        request: RetryableTicketRequest,
    ) -> Result<u64, GmpError>;
}

/// L2 address that L1 contract `address` appears as.
pub fn apply_l1_to_l2_alias(address: H256) -> H256 {
    let source = address.to_evm_address();
    let mut out = [0u8; 20];
    let mut carry = 0u16;
    for i in (0..20).rev() {
        let sum = source[i] as u16 + L1_TO_L2_ALIAS_OFFSET[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    H256::from_evm_address(out)
}

pub struct ArbitrumTransport {
    inbox: Arc<dyn RetryableTicketInbox>,
}

impl ArbitrumTransport {
    pub fn new(inbox: Arc<dyn RetryableTicketInbox>) -> Self {
        Self { inbox }
    }

    fn submission_fee(&self, calldata_len: usize) -> u128 {
        self.inbox.calculate_retryable_submission_fee(calldata_len, 0)
    }
}

impl MessageIdTransport for ArbitrumTransport {
    fn name(&self) -> &'static str {
        "arbitrum"
    }

    fn quote(&self, calldata_len: usize) -> u128 {
        self.submission_fee(calldata_len)
            .saturating_add(GAS_LIMIT * MAX_GAS_PRICE)
    }

    fn send(&self, ctx: &CallContext<'_>, request: TransportRequest<'_>) -> Result<u128, GmpError> {
        let submission_fee = self.submission_fee(request.calldata.len());
        let required = submission_fee
            .checked_add(GAS_LIMIT * MAX_GAS_PRICE)
            .ok_or(GmpError::ArithmeticOverflow)?;
        if ctx.value() < required {
            return Err(GmpError::InsufficientFunds {
                required,
                available: ctx.value(),
            });
        }

        let inbox = self.inbox.address();
        // All attached value goes to the ticket; the surplus comes back to the
        // refund address on L2 when the ticket is redeemed. The gas limit is a
        // fixed ceiling and ignores metadata.
        let ticket = self.inbox.create_retryable_ticket(
            &ctx.forward(request.hook, inbox, ctx.value())?,
            RetryableTicketRequest {
                to: request.ism,
                l2_call_value: 0,
                max_submission_cost: submission_fee,
                excess_fee_refund_address: request.refund_address,
                call_value_refund_address: request.refund_address,
                gas_limit: GAS_LIMIT,
                max_fee_per_gas: MAX_GAS_PRICE,
                data: request.calldata,
            },
        )?;

        ctx.emit(
            request.hook,
            ChainEvent::RetryableTicketSubmitted {
                submission_fee,
                caller: request.message.sender,
                id: request.id,
            },
        );
        info!(
            "Retryable ticket {} submitted for {} (submission fee {})",
            ticket, request.id, submission_fee
        );
        Ok(ctx.value())
    }
}

/// Accepts calls whose sender is the L2 alias of the authorized hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct AliasedSenderAuthentication;

impl CallerAuthentication for AliasedSenderAuthentication {
    fn is_authorized(&self, ctx: &CallContext<'_>, authorized_hook: H256) -> bool {
        ctx.caller() == apply_l1_to_l2_alias(authorized_hook)
    }
}
