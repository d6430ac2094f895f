//! Shared fixtures for endpoint integration tests.
//!
//! Builds mailbox deployments on in-process chains and wires message-id
//! hook/ISM pairs over each mock native bridge.

#![allow(dead_code)]

use std::sync::Arc;

use gmp_common::{message_id, GmpError, H256};
use gmp_endpoint::adapters::{
    AliasedSenderAuthentication, ArbitrumTransport, Erc5164Authentication, Erc5164Transport,
    OpStackAuthentication, OpStackTransport, L2_CROSS_DOMAIN_MESSENGER,
};
use gmp_endpoint::bridges::{
    MockInbox, MockL2Messenger, MockMessageDispatcher, MockMessageExecutor, MockOpStackMessenger,
    DEFAULT_BASE_FEE,
};
use gmp_endpoint::hooks::MessageIdTransport;
use gmp_endpoint::ism::CallerAuthentication;
use gmp_endpoint::{
    CallContext, Chain, ChainEvent, Contract, DispatchReceipt, Mailbox, MessageIdAuthorizedIsm,
    MessageIdHook, NoopHook, TestRecipient, TrustedIsm,
};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const ORIGIN_DOMAIN: u32 = 1000;
pub const DESTINATION_DOMAIN: u32 = 2000;

/// Starting balance of every funded test account.
pub const INITIAL_BALANCE: u128 = 1_000_000_000_000_000_000;

pub fn owner() -> H256 {
    H256::from_evm_address([0x0A; 20])
}

pub fn user() -> H256 {
    H256::from_evm_address([0x0B; 20])
}

pub fn relayer() -> H256 {
    H256::from_evm_address([0x0C; 20])
}

pub fn attacker() -> H256 {
    H256::from_evm_address([0x0D; 20])
}

// ============================================================================
// ENDPOINT FIXTURE
// ============================================================================

/// One chain with a mailbox whose defaults are a no-op hook and a trusted ISM.
pub struct Endpoint {
    pub chain: Chain,
    pub mailbox: Arc<Mailbox>,
    pub noop_hook: Arc<NoopHook>,
    pub trusted_ism: Arc<TrustedIsm>,
    pub recipient: Arc<TestRecipient>,
}

impl Endpoint {
    pub fn new(name: &str, domain: u32) -> Self {
        let chain = Chain::new(name, domain);
        for account in [owner(), user(), relayer(), attacker()] {
            chain.mint(account, INITIAL_BALANCE);
        }

        let mailbox = chain.deploy(|address| Mailbox::new(address, domain, owner()));
        let noop_hook = chain.deploy(NoopHook::new);
        let trusted_ism = chain.deploy(TrustedIsm::new);
        let recipient = chain.deploy(TestRecipient::new);

        chain
            .transact(owner(), mailbox.address(), 0, |ctx| {
                mailbox.set_default_hook(ctx, noop_hook.address())?;
                mailbox.set_default_ism(ctx, trusted_ism.address())
            })
            .expect("default configuration should succeed");

        Self {
            chain,
            mailbox,
            noop_hook,
            trusted_ism,
            recipient,
        }
    }

    pub fn dispatch(
        &self,
        sender: H256,
        value: u128,
        destination: u32,
        recipient: H256,
        body: &[u8],
        metadata: &[u8],
        hook: Option<H256>,
    ) -> Result<DispatchReceipt, GmpError> {
        self.chain
            .transact(sender, self.mailbox.address(), value, |ctx| {
                self.mailbox
                    .dispatch(ctx, destination, recipient, body, metadata, hook)
            })
    }

    pub fn process(
        &self,
        caller: H256,
        value: u128,
        metadata: &[u8],
        message: &[u8],
    ) -> Result<H256, GmpError> {
        self.chain
            .transact(caller, self.mailbox.address(), value, |ctx| {
                self.mailbox.process(ctx, metadata, message)
            })
    }

    /// Runs `f` in a transaction sent by the owner to `target`.
    pub fn as_owner<T, F>(&self, target: H256, f: F) -> Result<T, GmpError>
    where
        F: FnOnce(&CallContext<'_>) -> Result<T, GmpError>,
    {
        self.chain.transact(owner(), target, 0, f)
    }

    pub fn view(&self, caller: H256) -> CallContext<'_> {
        CallContext::new(&self.chain, caller, 0)
    }
}

/// Raw bytes of the dispatched message with id `id`, read from the event log
/// the way a relayer would.
pub fn dispatched_message(chain: &Chain, id: H256) -> Option<Vec<u8>> {
    chain.events().into_iter().find_map(|record| match record.event {
        ChainEvent::Dispatch { message, .. } if message_id(&message) == id => Some(message),
        _ => None,
    })
}

pub fn count_events(chain: &Chain, pred: impl Fn(&ChainEvent) -> bool) -> usize {
    chain.events().iter().filter(|r| pred(&r.event)).count()
}

// ============================================================================
// BRIDGED FIXTURE
// ============================================================================

/// Origin and destination endpoints coupled by a message-id hook/ISM pair
/// over bridge `B`. The destination recipient is governed by the pair's ISM.
pub struct Bridged<T: MessageIdTransport, A: CallerAuthentication, B> {
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub hook: Arc<MessageIdHook<T>>,
    pub ism: Arc<MessageIdAuthorizedIsm<A>>,
    pub bridge: Arc<B>,
}

impl<T: MessageIdTransport, A: CallerAuthentication, B> Bridged<T, A, B> {
    /// Dispatches `body` to the destination test recipient through the hook.
    pub fn send(&self, body: &[u8], value: u128) -> Result<DispatchReceipt, GmpError> {
        self.send_with_metadata(body, &[], value)
    }

    pub fn send_with_metadata(
        &self,
        body: &[u8],
        metadata: &[u8],
        value: u128,
    ) -> Result<DispatchReceipt, GmpError> {
        self.origin.dispatch(
            user(),
            value,
            DESTINATION_DOMAIN,
            self.destination.recipient.address(),
            body,
            metadata,
            Some(self.hook.address()),
        )
    }

    pub fn message(&self, id: H256) -> Vec<u8> {
        dispatched_message(&self.origin.chain, id).expect("dispatch event should exist")
    }
}

fn pair<T: MessageIdTransport, A: CallerAuthentication>(
    origin: &Endpoint,
    destination: &Endpoint,
    hook: &MessageIdHook<T>,
    ism: &MessageIdAuthorizedIsm<A>,
) {
    origin
        .as_owner(hook.address(), |ctx| hook.set_destination_ism(ctx, ism.address()))
        .expect("hook pairing should succeed");
    destination
        .as_owner(ism.address(), |ctx| ism.set_authorized_hook(ctx, hook.address()))
        .expect("ISM pairing should succeed");
    destination.recipient.set_ism(Some(ism.address()));
}

pub type OpStackPair = Bridged<OpStackTransport, OpStackAuthentication, MockOpStackMessenger>;
pub type Erc5164Pair = Bridged<Erc5164Transport, Erc5164Authentication, MockMessageDispatcher>;
pub type ArbitrumPair = Bridged<ArbitrumTransport, AliasedSenderAuthentication, MockInbox>;

/// Hook and ISM deployed but not paired.
pub fn unpaired_op_stack() -> OpStackPair {
    let origin = Endpoint::new("ethereum", ORIGIN_DOMAIN);
    let destination = Endpoint::new("optimism", DESTINATION_DOMAIN);

    let l2 = destination
        .chain
        .deploy_at(L2_CROSS_DOMAIN_MESSENGER, |address| {
            MockL2Messenger::new(address, DESTINATION_DOMAIN)
        })
        .expect("predeploy slot should be free");
    let messenger = origin
        .chain
        .deploy(|address| MockOpStackMessenger::new(address, l2.clone()));

    let hook = origin.chain.deploy(|address| {
        MessageIdHook::new(
            address,
            origin.mailbox.clone(),
            DESTINATION_DOMAIN,
            owner(),
            OpStackTransport::new(messenger.clone()),
        )
    });
    let ism = destination.chain.deploy(|address| {
        MessageIdAuthorizedIsm::new(address, owner(), OpStackAuthentication::new(l2.clone()))
    });

    Bridged {
        origin,
        destination,
        hook,
        ism,
        bridge: messenger,
    }
}

pub fn op_stack_pair() -> OpStackPair {
    let bridged = unpaired_op_stack();
    pair(&bridged.origin, &bridged.destination, &bridged.hook, &bridged.ism);
    bridged
}

pub fn erc5164_pair() -> Erc5164Pair {
    let origin = Endpoint::new("ethereum", ORIGIN_DOMAIN);
    let destination = Endpoint::new("gnosis", DESTINATION_DOMAIN);

    let executor = destination
        .chain
        .deploy(|address| MockMessageExecutor::new(address, DESTINATION_DOMAIN));
    let dispatcher = origin
        .chain
        .deploy(|address| MockMessageDispatcher::new(address, executor.clone()));

    let hook = origin.chain.deploy(|address| {
        MessageIdHook::new(
            address,
            origin.mailbox.clone(),
            DESTINATION_DOMAIN,
            owner(),
            Erc5164Transport::new(dispatcher.clone(), u64::from(DESTINATION_DOMAIN)),
        )
    });
    let ism = destination.chain.deploy(|address| {
        MessageIdAuthorizedIsm::new(address, owner(), Erc5164Authentication::new(executor.address()))
    });

    pair(&origin, &destination, &hook, &ism);
    Bridged {
        origin,
        destination,
        hook,
        ism,
        bridge: dispatcher,
    }
}

pub fn arbitrum_pair() -> ArbitrumPair {
    let origin = Endpoint::new("ethereum", ORIGIN_DOMAIN);
    let destination = Endpoint::new("arbitrum", DESTINATION_DOMAIN);

    let inbox = origin
        .chain
        .deploy(|address| MockInbox::new(address, DESTINATION_DOMAIN, DEFAULT_BASE_FEE));

    let hook = origin.chain.deploy(|address| {
        MessageIdHook::new(
            address,
            origin.mailbox.clone(),
            DESTINATION_DOMAIN,
            owner(),
            ArbitrumTransport::new(inbox.clone()),
        )
    });
    let ism = destination.chain.deploy(|address| {
        MessageIdAuthorizedIsm::new(address, owner(), AliasedSenderAuthentication)
    });

    pair(&origin, &destination, &hook, &ism);
    Bridged {
        origin,
        destination,
        hook,
        ism,
        bridge: inbox,
    }
}
