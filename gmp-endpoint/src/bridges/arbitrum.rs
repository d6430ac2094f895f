//! Retryable ticket inbox.
//!
//! Deposits stay escrowed in the inbox on the origin ledger. Refunds are
//! credited on the destination chain, where the refund addresses live.

use std::collections::VecDeque;

use gmp_common::{GmpError, H256};
use tracing::{debug, info, warn};

use super::{ensure_domain, settle_head, NativeBridge};
use crate::adapters::{apply_l1_to_l2_alias, RetryableTicketInbox, RetryableTicketRequest};
use crate::chain::{CallContext, Chain, Contract, Snapshot, StateCell};
use crate::events::ChainEvent;

pub const DEFAULT_BASE_FEE: u128 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableTicket {
    pub ticket_id: u64,
    /// L1 creator; the L2 call comes from its alias
    pub from: H256,
    pub deposit: u128,
    /// Submission fee charged at creation
    pub submission_fee: u128,
    pub request: RetryableTicketRequest,
}

impl RetryableTicket {
    /// Deposit left after the submission fee, gas budget and call value.
    fn unused_deposit(&self) -> u128 {
        let spent = self
            .request
            .gas_limit
            .saturating_mul(self.request.max_fee_per_gas)
            .saturating_add(self.submission_fee)
            .saturating_add(self.request.l2_call_value);
        self.deposit.saturating_sub(spent)
    }
}

#[derive(Debug, Clone, Default)]
struct InboxState {
    next_ticket: u64,
    tickets: VecDeque<RetryableTicket>,
}

pub struct MockInbox {
    address: H256,
    l2_domain: u32,
    base_fee: u128,
    state: StateCell<InboxState>,
}

impl MockInbox {
    pub fn new(address: H256, l2_domain: u32, base_fee: u128) -> Self {
        Self {
            address,
            l2_domain,
            base_fee,
            state: StateCell::new(InboxState::default()),
        }
    }

    pub fn base_fee(&self) -> u128 {
        self.base_fee
    }

    pub fn tickets(&self) -> Vec<RetryableTicket> {
        self.state.read().tickets.iter().cloned().collect()
    }

    pub fn ticket(&self, ticket_id: u64) -> Option<RetryableTicket> {
        self.state
            .read()
            .tickets
            .iter()
            .find(|t| t.ticket_id == ticket_id)
            .cloned()
    }

    /// Drops a ticket without executing it. Only the call-value refund
    /// address may cancel; it receives the deposit minus the submission fee.
    pub fn cancel(&self, ticket_id: u64, by: H256, destination: &Chain) -> Result<(), GmpError> {
        ensure_domain(destination, self.l2_domain)?;

        let mut state = self.state.write();
        let index = state
            .tickets
            .iter()
            .position(|t| t.ticket_id == ticket_id)
            .ok_or_else(|| GmpError::NotConfigured(format!("no retryable ticket {}", ticket_id)))?;
        let beneficiary = state.tickets[index].request.call_value_refund_address;
        if by != beneficiary {
            return Err(GmpError::UnauthorizedCaller(by));
        }
        let ticket = state
            .tickets
            .remove(index)
            .ok_or_else(|| GmpError::NotConfigured(format!("no retryable ticket {}", ticket_id)))?;
        drop(state);

        let refund = ticket.deposit.saturating_sub(ticket.submission_fee);
        destination.mint(beneficiary, refund);
        warn!(
            "Retryable ticket {} cancelled by {}; refunded {}",
            ticket_id, by, refund
        );
        Ok(())
    }

    fn redeem(&self, destination: &Chain, ticket: &RetryableTicket) -> Result<(), GmpError> {
        ensure_domain(destination, self.l2_domain)?;
        let sender = apply_l1_to_l2_alias(ticket.from);
        let request = &ticket.request;
        destination.transact(sender, request.to, 0, |ctx| {
            ctx.chain().mint(sender, request.l2_call_value);
            ctx.call(sender, request.to, request.l2_call_value, &request.data)?;
            ctx.chain()
                .mint(request.excess_fee_refund_address, ticket.unused_deposit());
            Ok(())
        })
    }
}

impl RetryableTicketInbox for MockInbox {
    fn calculate_retryable_submission_fee(&self, data_length: usize, base_fee: u128) -> u128 {
        let base_fee = if base_fee == 0 { self.base_fee } else { base_fee };
        (1400 + 6 * data_length as u128).saturating_mul(base_fee)
    }

    fn create_retryable_ticket(
        &self,
        ctx: &CallContext<'_>,
        request: RetryableTicketRequest,
    ) -> Result<u64, GmpError> {
        let submission_fee = self.calculate_retryable_submission_fee(request.data.len(), 0);
        if request.max_submission_cost < submission_fee {
            return Err(GmpError::InsufficientFunds {
                required: submission_fee,
                available: request.max_submission_cost,
            });
        }
        let required = request.required_deposit()?;
        if ctx.value() < required {
            return Err(GmpError::InsufficientFunds {
                required,
                available: ctx.value(),
            });
        }

        let to = request.to;
        let mut state = self.state.write();
        let ticket_id = state.next_ticket;
        state.next_ticket += 1;
        state.tickets.push_back(RetryableTicket {
            ticket_id,
            from: ctx.caller(),
            deposit: ctx.value(),
            submission_fee,
            request,
        });
        drop(state);

        ctx.emit(
            self.address,
            ChainEvent::RetryableTicketCreated {
                ticket_id,
                from: ctx.caller(),
                to,
            },
        );
        debug!("Inbox {} created ticket {} to {}", self.address, ticket_id, to);
        Ok(ticket_id)
    }
}

impl NativeBridge for MockInbox {
    fn kind(&self) -> &'static str {
        "arbitrum"
    }

    fn pending(&self) -> usize {
        self.state.read().tickets.len()
    }

    fn deliver_next(&self, destination: &Chain) -> Result<Option<u64>, GmpError> {
        let next = self.state.read().tickets.front().cloned();
        let Some(ticket) = next else {
            return Ok(None);
        };
        ensure_domain(destination, self.l2_domain)?;

        let result = self.redeem(destination, &ticket);
        settle_head(&mut self.state.write().tickets, result.is_ok());
        if let Err(e) = result {
            warn!(
                "Inbox {} failed to redeem ticket {}; requeued: {}",
                self.address, ticket.ticket_id, e
            );
            return Err(e);
        }
        info!(
            "Inbox {} redeemed ticket {} on {}",
            self.address,
            ticket.ticket_id,
            destination.name()
        );
        Ok(Some(ticket.ticket_id))
    }

    fn deliver_as(
        &self,
        destination: &Chain,
        sender: H256,
        target: H256,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        ensure_domain(destination, self.l2_domain)?;
        let alias = apply_l1_to_l2_alias(sender);
        destination.transact(alias, target, 0, |ctx| ctx.call(alias, target, 0, calldata))
    }
}

impl Contract for MockInbox {
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
