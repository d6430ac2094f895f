//! Shared fixtures for relay integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gmp_common::{message_id, H256};
use gmp_endpoint::{ChainEvent, Contract, NoopHook};
use gmp_relay::{
    BridgeKind, ChainConfig, ChainDeployment, Config, LocalNetwork, RelayerConfig, RouteConfig,
    OWNER,
};

pub const ETHEREUM: u32 = 1;
pub const OPTIMISM: u32 = 10;
pub const GNOSIS: u32 = 100;
pub const ARBITRUM: u32 = 42161;

pub const OWNER_BALANCE: u64 = 1_000_000_000_000_000_000;

pub fn chain(name: &str, domain: u32) -> ChainConfig {
    ChainConfig {
        name: name.to_string(),
        domain,
        owner_balance: OWNER_BALANCE,
    }
}

pub fn route(origin: &str, destination: &str, bridge: BridgeKind) -> RouteConfig {
    RouteConfig {
        origin: origin.to_string(),
        destination: destination.to_string(),
        bridge,
    }
}

/// Ethereum connected to one chain per bridge family.
pub fn hub_config() -> Config {
    Config {
        chains: vec![
            chain("ethereum", ETHEREUM),
            chain("optimism", OPTIMISM),
            chain("gnosis", GNOSIS),
            chain("arbitrum", ARBITRUM),
        ],
        routes: vec![
            route("ethereum", "optimism", BridgeKind::OpStack),
            route("ethereum", "gnosis", BridgeKind::Erc5164),
            route("ethereum", "arbitrum", BridgeKind::Arbitrum),
        ],
        relayer: RelayerConfig {
            polling_interval_ms: 10,
            max_attempts: 3,
        },
    }
}

pub fn hub_network() -> Arc<LocalNetwork> {
    Arc::new(LocalNetwork::from_config(&hub_config()).expect("hub network should build"))
}

pub fn deployment(network: &LocalNetwork, domain: u32) -> &ChainDeployment {
    network.chain(domain).expect("chain should be deployed")
}

/// Dispatches `body` to `recipient` on `destination` through a no-op hook, so
/// no bridge authorization is ever sent.
pub fn dispatch_unauthorized(
    network: &LocalNetwork,
    origin: u32,
    destination: u32,
    recipient: H256,
    body: &[u8],
) -> H256 {
    let from = deployment(network, origin);
    let noop = from.chain.deploy(NoopHook::new);
    from.chain
        .transact(OWNER, from.mailbox.address(), 0, |ctx| {
            from.mailbox
                .dispatch(ctx, destination, recipient, body, &[], Some(noop.address()))
        })
        .expect("dispatch should succeed")
        .id
}

/// Raw bytes of the dispatched message with id `id`.
pub fn dispatched_message(network: &LocalNetwork, origin: u32, id: H256) -> Vec<u8> {
    deployment(network, origin)
        .chain
        .events()
        .into_iter()
        .find_map(|record| match record.event {
            ChainEvent::Dispatch { message, .. } if message_id(&message) == id => Some(message),
            _ => None,
        })
        .expect("dispatch event should exist")
}

/// Writes `contents` to a fresh file under the system temp directory.
pub fn write_temp_config(name: &str, contents: &str) -> String {
    let dir = std::env::temp_dir().join(format!("gmp-relay-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir should be writable");
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("config should be writable");
    path.to_string_lossy().into_owned()
}
