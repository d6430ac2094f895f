//! Local GMP network builder.
//!
//! Turns a [`Config`] into a set of in-process chains, each running a mailbox
//! whose default hook and default ISM route by domain, and wires one
//! message-id hook/ISM pair over a mock native bridge per configured route.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use gmp_common::{GmpError, H256};
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
    CallContext, Chain, Contract, DispatchReceipt, DomainRoutingHook, DomainRoutingIsm, Mailbox,
    MessageIdAuthorizedIsm, MessageIdHook, NativeBridge, TestRecipient,
};
use tracing::{debug, info};

use crate::config::{BridgeKind, ChainConfig, Config, RouteConfig};

/// Account that owns every deployed contract.
pub const OWNER: H256 = H256::from_evm_address([0x0A; 20]);

/// Account the relayer submits `process` transactions from.
pub const RELAYER: H256 = H256::from_evm_address([0x0C; 20]);

// ============================================================================
// DEPLOYMENTS
// ============================================================================

/// Everything deployed on one chain.
pub struct ChainDeployment {
    pub name: String,
    pub chain: Chain,
    pub mailbox: Arc<Mailbox>,
    pub routing_hook: Arc<DomainRoutingHook>,
    pub routing_ism: Arc<DomainRoutingIsm>,
    pub recipient: Arc<TestRecipient>,
}

impl ChainDeployment {
    fn deploy(config: &ChainConfig) -> Result<Self> {
        let chain = Chain::new(config.name.clone(), config.domain);
        chain.mint(OWNER, u128::from(config.owner_balance));

        let mailbox = chain.deploy(|address| Mailbox::new(address, config.domain, OWNER));
        let routing_hook = chain.deploy(|address| DomainRoutingHook::new(address, OWNER));
        let routing_ism = chain.deploy(|address| DomainRoutingIsm::new(address, OWNER));
        let recipient = chain.deploy(TestRecipient::new);

        chain
            .transact(OWNER, mailbox.address(), 0, |ctx| {
                mailbox.set_default_hook(ctx, routing_hook.address())?;
                mailbox.set_default_ism(ctx, routing_ism.address())
            })
            .with_context(|| format!("Failed to configure mailbox on {}", config.name))?;

        info!(
            "Deployed mailbox {} on {} (domain {})",
            mailbox.address(),
            config.name,
            config.domain
        );

        Ok(Self {
            name: config.name.clone(),
            chain,
            mailbox,
            routing_hook,
            routing_ism,
            recipient,
        })
    }

    pub fn domain(&self) -> u32 {
        self.chain.domain()
    }

    /// Runs `f` in a transaction sent by the deployment owner to `target`.
    fn as_owner<T, F>(&self, target: H256, f: F) -> std::result::Result<T, GmpError>
    where
        F: FnOnce(&CallContext<'_>) -> std::result::Result<T, GmpError>,
    {
        self.chain.transact(OWNER, target, 0, f)
    }
}

/// A configured route: the hook on the origin, the ISM on the destination and
/// the bridge between them.
pub struct Route {
    pub origin: u32,
    pub destination: u32,
    pub kind: BridgeKind,
    pub hook: H256,
    pub ism: H256,
    pub bridge: Arc<dyn NativeBridge>,
}

// ============================================================================
// NETWORK
// ============================================================================

pub struct LocalNetwork {
    chains: BTreeMap<u32, ChainDeployment>,
    routes: Vec<Route>,
}

impl LocalNetwork {
    /// Deploys every configured chain, then wires every configured route.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut chains = BTreeMap::new();
        for chain in &config.chains {
            chains.insert(chain.domain, ChainDeployment::deploy(chain)?);
        }

        let mut network = Self {
            chains,
            routes: Vec::new(),
        };
        // OP Stack L2 messengers live at a fixed address, so one per destination.
        let mut l2_messengers: HashMap<u32, Arc<MockL2Messenger>> = HashMap::new();

        for route in &config.routes {
            let origin = config
                .chain(&route.origin)
                .with_context(|| format!("Unknown origin chain '{}'", route.origin))?
                .domain;
            let destination = config
                .chain(&route.destination)
                .with_context(|| format!("Unknown destination chain '{}'", route.destination))?
                .domain;

            let wired = network
                .connect(route, origin, destination, &mut l2_messengers)
                .with_context(|| {
                    format!(
                        "Failed to wire {} route {} -> {}",
                        route.bridge, route.origin, route.destination
                    )
                })?;
            network.routes.push(wired);
        }

        info!(
            "Local network ready: {} chains, {} routes",
            network.chains.len(),
            network.routes.len()
        );
        Ok(network)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainDeployment> {
        self.chains.values()
    }

    pub fn chain(&self, domain: u32) -> Option<&ChainDeployment> {
        self.chains.get(&domain)
    }

    pub fn chain_by_name(&self, name: &str) -> Option<&ChainDeployment> {
        self.chains.values().find(|deployment| deployment.name == name)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, origin: u32, destination: u32) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.origin == origin && route.destination == destination)
    }

    fn deployment(&self, domain: u32) -> Result<&ChainDeployment> {
        self.chains
            .get(&domain)
            .with_context(|| format!("No chain deployed for domain {}", domain))
    }

    // ------------------------------------------------------------------------
    // Dispatch helpers
    // ------------------------------------------------------------------------

    /// Value `sender` must attach to dispatch `body` to the destination test
    /// recipient through the origin's default hook.
    pub fn quote(&self, sender: H256, origin: u32, destination: u32, body: &[u8]) -> Result<u128> {
        let from = self.deployment(origin)?;
        let to = self.deployment(destination)?;
        let ctx = CallContext::new(&from.chain, sender, 0);
        let fee = from
            .mailbox
            .quote_dispatch(&ctx, destination, to.recipient.address(), body, &[], None)?;
        Ok(fee)
    }

    /// Dispatches `body` from `sender` on `origin` to the test recipient on
    /// `destination`, paying the quoted fee.
    pub fn send(
        &self,
        sender: H256,
        origin: u32,
        destination: u32,
        body: &[u8],
    ) -> Result<DispatchReceipt> {
        let fee = self.quote(sender, origin, destination, body)?;
        let from = self.deployment(origin)?;
        let recipient = self.deployment(destination)?.recipient.address();

        let receipt = from
            .chain
            .transact(sender, from.mailbox.address(), fee, |ctx| {
                from.mailbox
                    .dispatch(ctx, destination, recipient, body, &[], None)
            })
            .with_context(|| format!("Dispatch {} -> {} failed", origin, destination))?;
        Ok(receipt)
    }

    // ------------------------------------------------------------------------
    // Route wiring
    // ------------------------------------------------------------------------

    fn connect(
        &self,
        route: &RouteConfig,
        origin: u32,
        destination: u32,
        l2_messengers: &mut HashMap<u32, Arc<MockL2Messenger>>,
    ) -> Result<Route> {
        let from = self.deployment(origin)?;
        let to = self.deployment(destination)?;

        let (hook, ism, bridge): (H256, H256, Arc<dyn NativeBridge>) = match route.bridge {
            BridgeKind::OpStack => {
                let l2 = match l2_messengers.get(&destination) {
                    Some(l2) => l2.clone(),
                    None => {
                        let l2 = to.chain.deploy_at(L2_CROSS_DOMAIN_MESSENGER, |address| {
                            MockL2Messenger::new(address, destination)
                        })?;
                        l2_messengers.insert(destination, l2.clone());
                        l2
                    }
                };
                let messenger = from
                    .chain
                    .deploy(|address| MockOpStackMessenger::new(address, l2.clone()));
                let (hook, ism) = pair(
                    from,
                    to,
                    OpStackTransport::new(messenger.clone()),
                    OpStackAuthentication::new(l2),
                )?;
                (hook, ism, messenger as Arc<dyn NativeBridge>)
            }
            BridgeKind::Erc5164 => {
                let executor = to
                    .chain
                    .deploy(|address| MockMessageExecutor::new(address, destination));
                let dispatcher = from
                    .chain
                    .deploy(|address| MockMessageDispatcher::new(address, executor.clone()));
                let (hook, ism) = pair(
                    from,
                    to,
                    Erc5164Transport::new(dispatcher.clone(), u64::from(destination)),
                    Erc5164Authentication::new(executor.address()),
                )?;
                (hook, ism, dispatcher as Arc<dyn NativeBridge>)
            }
            BridgeKind::Arbitrum => {
                let inbox = from
                    .chain
                    .deploy(|address| MockInbox::new(address, destination, DEFAULT_BASE_FEE));
                let (hook, ism) = pair(
                    from,
                    to,
                    ArbitrumTransport::new(inbox.clone()),
                    AliasedSenderAuthentication,
                )?;
                (hook, ism, inbox as Arc<dyn NativeBridge>)
            }
        };

        info!(
            "Route {} -> {} over {}: hook {} / ISM {}",
            from.name, to.name, route.bridge, hook, ism
        );
        Ok(Route {
            origin,
            destination,
            kind: route.bridge,
            hook,
            ism,
            bridge,
        })
    }
}

/// Deploys a message-id hook on `from` and its ISM on `to`, pairs them through
/// their set-once setters and registers both with the routing defaults.
fn pair<T, A>(
    from: &ChainDeployment,
    to: &ChainDeployment,
    transport: T,
    authentication: A,
) -> Result<(H256, H256)>
where
    T: MessageIdTransport,
    A: CallerAuthentication,
{
    let hook = from.chain.deploy(|address| {
        MessageIdHook::new(address, from.mailbox.clone(), to.domain(), OWNER, transport)
    });
    let ism = to
        .chain
        .deploy(|address| MessageIdAuthorizedIsm::new(address, OWNER, authentication));

    from.as_owner(hook.address(), |ctx| {
        hook.set_destination_ism(ctx, ism.address())?;
        from.routing_hook.set_hook(ctx, to.domain(), hook.address())
    })?;
    to.as_owner(ism.address(), |ctx| {
        ism.set_authorized_hook(ctx, hook.address())?;
        to.routing_ism.set(ctx, from.domain(), ism.address())
    })?;

    debug!(
        "Paired hook {} on {} with ISM {} on {}",
        hook.address(),
        from.name,
        ism.address(),
        to.name
    );
    Ok((hook.address(), ism.address()))
}
