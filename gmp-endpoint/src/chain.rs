//! In-process chain model.
//!
//! A `Chain` is one execution environment bound to a domain. It owns the
//! deployed contracts, a native-value ledger and an append-only event log.
//!
//! ## Execution Model
//!
//! Calls are strictly sequential and synchronous. `Chain::transact` is the
//! atomicity unit: it snapshots every contract, the ledger and the event log,
//! runs the call, and restores all of them if the call returns an error.
//!
//! Contract state sits behind `parking_lot::RwLock` and no lock is held while
//! calling into another contract, so a reentrant call always observes state
//! the outer call has already committed.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gmp_common::crypto::keccak256_concat;
use gmp_common::{GmpError, H256};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::events::{ChainEvent, EventRecord};
use crate::hooks::PostDispatchHook;
use crate::ism::InterchainSecurityModule;
use crate::recipient::MessageRecipient;

/// Opaque copy of a contract's durable state.
pub type Snapshot = Box<dyn Any + Send + Sync>;

// ============================================================================
// STATE CELL
// ============================================================================

/// Lock-guarded contract state that can be snapshotted and restored.
#[derive(Debug, Default)]
pub struct StateCell<T> {
    inner: RwLock<T>,
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    pub fn snapshot(&self) -> Snapshot {
        Box::new(self.inner.read().clone())
    }

    pub fn restore(&self, snapshot: Snapshot) {
        match snapshot.downcast::<T>() {
            Ok(state) => *self.inner.write() = *state,
            Err(_) => warn!("Discarding snapshot of unexpected type"),
        }
    }
}

// ============================================================================
// CONTRACT
// ============================================================================

/// A component deployed at an address on a chain.
///
/// The typed views let the chain resolve an address to a capability. An
/// address that does not implement a capability resolves to `None`.
pub trait Contract: Send + Sync {
    fn address(&self) -> H256;

    fn snapshot(&self) -> Snapshot;

    fn restore(&self, snapshot: Snapshot);

    /// Low-level entry point for raw call data delivered by native bridges.
    fn call(&self, _ctx: &CallContext<'_>, _calldata: &[u8]) -> Result<Vec<u8>, GmpError> {
        Err(GmpError::UnsupportedCall(format!(
            "contract {} has no call entry point",
            self.address()
        )))
    }

    fn as_ism(self: Arc<Self>) -> Option<Arc<dyn InterchainSecurityModule>> {
        None
    }

    fn as_hook(self: Arc<Self>) -> Option<Arc<dyn PostDispatchHook>> {
        None
    }

    fn as_recipient(self: Arc<Self>) -> Option<Arc<dyn MessageRecipient>> {
        None
    }
}

// ============================================================================
// CALL CONTEXT
// ============================================================================

/// Who is calling, with how much value, on which chain.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    chain: &'a Chain,
    caller: H256,
    value: u128,
}

impl<'a> CallContext<'a> {
    pub fn new(chain: &'a Chain, caller: H256, value: u128) -> Self {
        Self {
            chain,
            caller,
            value,
        }
    }

    pub fn chain(&self) -> &'a Chain {
        self.chain
    }

    pub fn caller(&self) -> H256 {
        self.caller
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    /// Moves `value` from `from` to `to` and returns the context for a
    /// sub-call made by `from`.
    pub fn forward(&self, from: H256, to: H256, value: u128) -> Result<CallContext<'a>, GmpError> {
        self.chain.transfer(from, to, value)?;
        Ok(Self::new(self.chain, from, value))
    }

    /// Raw sub-call from `from` into the contract at `target`.
    pub fn call(
        &self,
        from: H256,
        target: H256,
        value: u128,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        let contract = self
            .chain
            .contract(target)
            .ok_or_else(|| GmpError::NotConfigured(format!("no contract at {}", target)))?;
        let sub = self.forward(from, target, value)?;
        contract.call(&sub, calldata)
    }

    pub fn emit(&self, emitter: H256, event: ChainEvent) {
        self.chain.emit(emitter, event);
    }
}

// ============================================================================
// CHAIN
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: HashMap<H256, u128>,
}

pub struct Chain {
    name: String,
    domain: u32,
    contracts: RwLock<HashMap<H256, Arc<dyn Contract>>>,
    deployed: AtomicU64,
    block_number: AtomicU64,
    ledger: StateCell<Ledger>,
    events: StateCell<Vec<EventRecord>>,
}

impl Chain {
    pub fn new(name: impl Into<String>, domain: u32) -> Self {
        Self {
            name: name.into(),
            domain,
            contracts: RwLock::new(HashMap::new()),
            deployed: AtomicU64::new(0),
            block_number: AtomicU64::new(0),
            ledger: StateCell::new(Ledger::default()),
            events: StateCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> u32 {
        self.domain
    }

    /// Number of transactions executed so far, reverted ones included.
    pub fn block_number(&self) -> u64 {
        self.block_number.load(Ordering::SeqCst)
    }

    /// Deploys a contract at the next deterministic address.
    pub fn deploy<T, F>(&self, build: F) -> Arc<T>
    where
        T: Contract + 'static,
        F: FnOnce(H256) -> T,
    {
        let index = self.deployed.fetch_add(1, Ordering::SeqCst);
        // Addresses are EVM-width so L1-to-L2 aliasing stays injective.
        let hash = keccak256_concat(&[
            b"contract",
            &self.domain.to_be_bytes(),
            &index.to_be_bytes(),
        ]);
        let address = H256::from_evm_address(hash.to_evm_address());
        self.install(address, build)
    }

    /// Deploys a contract at a fixed address (system predeploys).
    pub fn deploy_at<T, F>(&self, address: H256, build: F) -> Result<Arc<T>, GmpError>
    where
        T: Contract + 'static,
        F: FnOnce(H256) -> T,
    {
        if self.contracts.read().contains_key(&address) {
            return Err(GmpError::AlreadyConfigured(format!(
                "address {} is occupied on {}",
                address, self.name
            )));
        }
        Ok(self.install(address, build))
    }

    fn install<T, F>(&self, address: H256, build: F) -> Arc<T>
    where
        T: Contract + 'static,
        F: FnOnce(H256) -> T,
    {
        let contract = Arc::new(build(address));
        debug_assert_eq!(contract.address(), address);
        self.contracts
            .write()
            .insert(address, contract.clone() as Arc<dyn Contract>);

        debug!("Deployed contract {} on {} (domain {})", address, self.name, self.domain);
        contract
    }

    pub fn contract(&self, address: H256) -> Option<Arc<dyn Contract>> {
        self.contracts.read().get(&address).cloned()
    }

    pub fn ism(&self, address: H256) -> Option<Arc<dyn InterchainSecurityModule>> {
        self.contract(address)?.as_ism()
    }

    pub fn hook(&self, address: H256) -> Option<Arc<dyn PostDispatchHook>> {
        self.contract(address)?.as_hook()
    }

    pub fn recipient(&self, address: H256) -> Option<Arc<dyn MessageRecipient>> {
        self.contract(address)?.as_recipient()
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    pub fn balance_of(&self, address: H256) -> u128 {
        self.ledger
            .read()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Credits `amount` to `address` out of thin air.
    pub fn mint(&self, address: H256, amount: u128) {
        let mut ledger = self.ledger.write();
        let balance = ledger.balances.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn transfer(&self, from: H256, to: H256, amount: u128) -> Result<(), GmpError> {
        if amount == 0 || from == to {
            return Ok(());
        }

        let mut ledger = self.ledger.write();
        let available = ledger.balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(GmpError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let to_balance = ledger
            .balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(GmpError::ArithmeticOverflow)?;

        ledger.balances.insert(from, available - amount);
        ledger.balances.insert(to, to_balance);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn emit(&self, emitter: H256, event: ChainEvent) {
        let record = EventRecord {
            block_number: self.block_number(),
            emitter,
            event,
        };
        self.events.write().push(record);
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Events appended at or after `cursor`.
    pub fn events_since(&self, cursor: usize) -> Vec<EventRecord> {
        self.events
            .read()
            .iter()
            .skip(cursor)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Runs `f` as one atomic transaction sent by `sender` to `target` with
    /// `value` attached. Any error restores every piece of chain state.
    ///
    /// Contract and ledger state are copied up front, so each call costs time
    /// proportional to the state deployed on this chain. The event log is
    /// append-only and is rolled back by truncation, so history does not add
    /// to that cost.
    pub fn transact<T, F>(&self, sender: H256, target: H256, value: u128, f: F) -> Result<T, GmpError>
    where
        F: FnOnce(&CallContext<'_>) -> Result<T, GmpError>,
    {
        self.block_number.fetch_add(1, Ordering::SeqCst);

        let contracts: Vec<Arc<dyn Contract>> = self.contracts.read().values().cloned().collect();
        let snapshots: Vec<Snapshot> = contracts.iter().map(|c| c.snapshot()).collect();
        let ledger = self.ledger.snapshot();
        let event_mark = self.events.read().len();

        let result = self
            .transfer(sender, target, value)
            .and_then(|_| f(&CallContext::new(self, sender, value)));

        if let Err(ref e) = result {
            for (contract, snapshot) in contracts.iter().zip(snapshots) {
                contract.restore(snapshot);
            }
            self.ledger.restore(ledger);
            self.events.write().truncate(event_mark);
            debug!(
                "Transaction from {} to {} reverted on {}: {}",
                sender, target, self.name, e
            );
        }

        result
    }

    /// Top-level raw call into the contract at `target`.
    pub fn call(
        &self,
        sender: H256,
        target: H256,
        value: u128,
        calldata: &[u8],
    ) -> Result<Vec<u8>, GmpError> {
        self.transact(sender, target, value, |ctx| {
            let contract = self
                .contract(target)
                .ok_or_else(|| GmpError::NotConfigured(format!("no contract at {}", target)))?;
            contract.call(ctx, calldata)
        })
    }
}
