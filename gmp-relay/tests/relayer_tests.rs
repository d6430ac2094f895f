//! Integration tests for the local network builder and the relayer loop.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use gmp_common::calls::encode_verify_message_id;
use gmp_common::{GmpError, H256};
use gmp_endpoint::adapters::{CrossDomainMessenger, OpStackAuthentication};
use gmp_endpoint::bridges::{MockL2Messenger, MockOpStackMessenger};
use gmp_endpoint::{
    Contract, HookType, InterchainSecurityModule, MessageIdAuthorizedIsm, ModuleType,
    NativeBridge, PostDispatchHook,
};
use gmp_relay::{pump_bridge, BridgeKind, LocalNetwork, Relayer, RelayerConfig, OWNER, RELAYER};
use helpers::{
    chain, deployment, dispatch_unauthorized, dispatched_message, hub_config, hub_network, route,
    ARBITRUM, ETHEREUM, GNOSIS, OPTIMISM,
};

fn relayer_for(network: &Arc<LocalNetwork>, max_attempts: u32) -> Relayer {
    Relayer::new(
        network.clone(),
        RelayerConfig {
            polling_interval_ms: 10,
            max_attempts,
        },
    )
}

fn send_hello(network: &LocalNetwork, destination: u32) -> H256 {
    network
        .send(OWNER, ETHEREUM, destination, b"hello")
        .expect("dispatch should succeed")
        .id
}

// ============================================================================
// NETWORK BUILDER TESTS
// ============================================================================

/// 1. Test: Network Wiring
/// Verifies every chain gets routing defaults and every route is registered
/// with the origin's routing hook and the destination's routing ISM.
/// Why: Default routing is what lets plain dispatch reach the right bridge.
#[test]
fn test_network_wiring() {
    let network = hub_network();
    assert_eq!(network.chains().count(), 4);
    assert_eq!(network.routes().len(), 3);

    for deployment in network.chains() {
        assert_eq!(
            deployment.mailbox.default_hook(),
            Some(deployment.routing_hook.address())
        );
        assert_eq!(
            deployment.mailbox.default_ism(),
            Some(deployment.routing_ism.address())
        );
        assert_eq!(deployment.routing_hook.hook_type(), HookType::Routing);
        assert_eq!(deployment.routing_ism.module_type(), ModuleType::Routing);
    }

    let hub = deployment(&network, ETHEREUM);
    for route in network.routes() {
        assert_eq!(hub.routing_hook.hook(route.destination), Some(route.hook));
        let destination = deployment(&network, route.destination);
        assert_eq!(destination.routing_ism.module(ETHEREUM), Some(route.ism));
    }

    assert_eq!(
        network.route(ETHEREUM, ARBITRUM).map(|r| r.kind),
        Some(BridgeKind::Arbitrum)
    );
    assert!(network.route(OPTIMISM, ETHEREUM).is_none());
    assert_eq!(network.chain_by_name("gnosis").map(|d| d.domain()), Some(GNOSIS));
}

/// 2. Test: Shared OP Stack Destination
/// Verifies two OP Stack routes into the same destination build.
/// Why: The L2 messenger sits at a fixed predeploy address, so routes must
/// share it instead of deploying twice.
#[test]
fn test_shared_op_stack_destination() {
    let mut config = hub_config();
    config.chains.push(chain("base", 8453));
    config
        .routes
        .push(route("base", "optimism", BridgeKind::OpStack));

    let network = Arc::new(LocalNetwork::from_config(&config).unwrap());
    let optimism = deployment(&network, OPTIMISM);
    assert!(optimism.routing_ism.module(ETHEREUM).is_some());
    assert!(optimism.routing_ism.module(8453).is_some());
}

/// 3. Test: Invalid Config Rejected By Builder
/// Verifies the builder validates before deploying anything.
/// Why: A half-wired network would relay into unconfigured routes.
#[test]
fn test_invalid_config_rejected_by_builder() {
    let mut config = hub_config();
    config.relayer.polling_interval_ms = 0;

    assert!(LocalNetwork::from_config(&config).is_err());
}

/// 4. Test: Quote Per Bridge
/// Verifies only the Arbitrum route requires payment.
/// Why: Retryable tickets are the only paid side-channel.
#[test]
fn test_quote_per_bridge() {
    let network = hub_network();

    assert_eq!(network.quote(OWNER, ETHEREUM, OPTIMISM, b"hello").unwrap(), 0);
    assert_eq!(network.quote(OWNER, ETHEREUM, GNOSIS, b"hello").unwrap(), 0);
    assert!(network.quote(OWNER, ETHEREUM, ARBITRUM, b"hello").unwrap() > 0);
}

// ============================================================================
// RELAYER TESTS
// ============================================================================

/// 5. Test: Relay Over Every Bridge
/// Verifies one tick pumps the bridges, picks up the dispatches and delivers
/// them on every destination.
/// Why: This is the relayer's core loop.
#[tokio::test]
async fn test_relay_over_every_bridge() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let ids: Vec<_> = [OPTIMISM, GNOSIS, ARBITRUM]
        .into_iter()
        .map(|destination| send_hello(&network, destination))
        .collect();

    let summary = relayer.tick().await.unwrap();
    assert_eq!(summary.bridged, 3);
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.delivered, 3);
    assert_eq!(summary.pending, 0);

    let records = relayer.records().await;
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
    assert!(records.iter().all(|r| r.attempts == 1 && r.origin == ETHEREUM));

    for destination in [OPTIMISM, GNOSIS, ARBITRUM] {
        let deployment = deployment(&network, destination);
        let received = deployment.recipient.last_received().unwrap();
        assert_eq!(received.body, b"hello");
        assert_eq!(received.origin, ETHEREUM);
        assert_eq!(received.sender, OWNER);
    }
}

/// 6. Test: Events Scanned Once
/// Verifies a second tick neither rediscovers nor redelivers.
/// Why: The per-chain cursor must advance past consumed events.
#[tokio::test]
async fn test_events_scanned_once() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    send_hello(&network, GNOSIS);

    relayer.tick().await.unwrap();
    let summary = relayer.tick().await.unwrap();

    assert!(summary.is_idle());
    assert_eq!(relayer.records().await.len(), 1);
    assert_eq!(deployment(&network, GNOSIS).recipient.received().len(), 1);
}

/// 7. Test: Run Until Idle
/// Verifies `run_until_idle` delivers everything and then returns.
/// Why: The demo mode and batch runs depend on termination.
#[tokio::test]
async fn test_run_until_idle() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    send_hello(&network, OPTIMISM);
    send_hello(&network, OPTIMISM);
    send_hello(&network, ARBITRUM);

    let delivered = relayer.run_until_idle().await.unwrap();

    assert_eq!(delivered, 3);
    assert_eq!(relayer.pending().await, 0);
    assert_eq!(deployment(&network, OPTIMISM).recipient.received().len(), 2);
}

/// 8. Test: Unverified Message Stays Pending
/// Verifies a message without authorization is retried and delivered once
/// the authorization lands.
/// Why: Bridge latency must not lose messages.
#[tokio::test]
async fn test_unverified_message_stays_pending() {
    let network = hub_network();
    let relayer = relayer_for(&network, 5);
    let recipient = deployment(&network, OPTIMISM).recipient.address();
    let id = dispatch_unauthorized(&network, ETHEREUM, OPTIMISM, recipient, b"late");

    let summary = relayer.tick().await.unwrap();
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.pending, 1);

    // Authorization arrives late, relayed for the paired hook.
    let route = network.route(ETHEREUM, OPTIMISM).unwrap();
    route
        .bridge
        .deliver_as(
            &deployment(&network, OPTIMISM).chain,
            route.hook,
            route.ism,
            &encode_verify_message_id(id),
        )
        .unwrap();

    let summary = relayer.tick().await.unwrap();
    assert_eq!(summary.delivered, 1);
    let records = relayer.records().await;
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].attempts, 2);
}

/// 9. Test: Unverified Message Dropped After Max Attempts
/// Verifies a message that never verifies is given up on.
/// Why: The pending queue must not grow without bound.
#[tokio::test]
async fn test_unverified_message_dropped_after_max_attempts() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let recipient = deployment(&network, GNOSIS).recipient.address();
    let id = dispatch_unauthorized(&network, ETHEREUM, GNOSIS, recipient, b"never");

    let delivered = relayer.run_until_idle().await.unwrap();

    assert_eq!(delivered, 0);
    assert_eq!(relayer.dropped().await, vec![id]);
    assert!(!deployment(&network, GNOSIS).mailbox.delivered(id));
}

/// 10. Test: Already Delivered Counts As Success
/// Verifies the relayer records a message someone else processed first.
/// Why: Blind retries are safe because replay is rejected on chain.
#[tokio::test]
async fn test_already_delivered_counts_as_success() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let id = send_hello(&network, OPTIMISM);
    let message = dispatched_message(&network, ETHEREUM, id);

    let route = network.route(ETHEREUM, OPTIMISM).unwrap();
    let destination = deployment(&network, OPTIMISM);
    route.bridge.deliver_next(&destination.chain).unwrap();
    destination
        .chain
        .transact(OWNER, destination.mailbox.address(), 0, |ctx| {
            destination.mailbox.process(ctx, &[], &message)
        })
        .unwrap();

    let summary = relayer.tick().await.unwrap();

    assert_eq!(summary.delivered, 1);
    assert!(relayer.dropped().await.is_empty());
    assert_eq!(destination.recipient.received().len(), 1);
    assert_eq!(destination.mailbox.delivery(id).unwrap().processor, OWNER);
}

/// 11. Test: Recipient Failure Drops Message
/// Verifies a reverting recipient drops the message after one attempt and
/// leaves it undelivered.
/// Why: Only verification failures are worth retrying.
#[tokio::test]
async fn test_recipient_failure_drops_message() {
    let network = hub_network();
    let relayer = relayer_for(&network, 5);
    let destination = deployment(&network, GNOSIS);
    destination.recipient.set_fail_handle(true);
    let id = send_hello(&network, GNOSIS);

    let summary = relayer.tick().await.unwrap();

    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.pending, 0);
    assert_eq!(relayer.dropped().await, vec![id]);
    assert!(!destination.mailbox.delivered(id));
}

/// 12. Test: Unknown Destination Ignored
/// Verifies a dispatch to a domain outside the network is not queued.
/// Why: The relayer has nowhere to submit it.
#[tokio::test]
async fn test_unknown_destination_ignored() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    dispatch_unauthorized(&network, ETHEREUM, 999, OWNER, b"nowhere");

    let summary = relayer.tick().await.unwrap();

    assert_eq!(summary.discovered, 0);
    assert_eq!(relayer.pending().await, 0);
}

/// 13. Test: Relayer Submits As Relayer Account
/// Verifies the delivery record on chain names the relayer as processor.
/// Why: Processors are recorded for off-chain accounting.
#[tokio::test]
async fn test_relayer_submits_as_relayer_account() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let id = send_hello(&network, ARBITRUM);

    relayer.run_until_idle().await.unwrap();

    let delivery = deployment(&network, ARBITRUM).mailbox.delivery(id).unwrap();
    assert_eq!(delivery.processor, RELAYER);
}

/// 14. Test: Run Loop Delivers On Interval
/// Verifies the polling loop delivers without explicit ticks.
/// Why: `run` is what the binary executes.
#[tokio::test]
async fn test_run_loop_delivers_on_interval() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let id = send_hello(&network, OPTIMISM);

    let outcome = tokio::time::timeout(Duration::from_millis(200), relayer.run()).await;

    assert!(outcome.is_err(), "run should only stop on timeout");
    assert!(deployment(&network, OPTIMISM).mailbox.delivered(id));
}

/// 15. Test: Process Errors Stay Typed
/// Verifies a relayer-side replay surfaces `AlreadyDelivered` from the chain.
/// Why: The relayer matches on the error variant to decide retries.
#[tokio::test]
async fn test_process_errors_stay_typed() {
    let network = hub_network();
    let relayer = relayer_for(&network, 3);
    let id = send_hello(&network, GNOSIS);
    relayer.run_until_idle().await.unwrap();

    let destination = deployment(&network, GNOSIS);
    let message = dispatched_message(&network, ETHEREUM, id);
    let err = destination
        .chain
        .transact(RELAYER, destination.mailbox.address(), 0, |ctx| {
            destination.mailbox.process(ctx, &[], &message)
        })
        .unwrap_err();
    assert_eq!(err, GmpError::AlreadyDelivered(id));
}

/// 16. Test: Failing Bridge Item Does Not Block The Queue
/// Verifies a pump skips a bridge item whose delivery fails and still lands
/// the authorization queued behind it.
/// Why: Anyone can queue calls on a native bridge; one bad call must not
/// stall every later authorization.
#[test]
fn test_failing_bridge_item_does_not_block_queue() {
    let network = hub_network();
    let origin = deployment(&network, ETHEREUM);
    let destination = deployment(&network, OPTIMISM);

    let l2 = destination
        .chain
        .deploy(|address| MockL2Messenger::new(address, OPTIMISM));
    let messenger = origin
        .chain
        .deploy(|address| MockOpStackMessenger::new(address, l2.clone()));
    let hook = H256::from_evm_address([0x11; 20]);
    let ism = destination.chain.deploy(|address| {
        MessageIdAuthorizedIsm::new(address, OWNER, OpStackAuthentication::new(l2.clone()))
    });
    destination
        .chain
        .transact(OWNER, ism.address(), 0, |ctx| ism.set_authorized_hook(ctx, hook))
        .unwrap();

    let junk_target = H256::from_evm_address([0xde; 20]);
    let attacker = H256::from_evm_address([0x0D; 20]);
    origin
        .chain
        .transact(attacker, messenger.address(), 0, |ctx| {
            messenger.send_message(ctx, junk_target, b"junk", 0)
        })
        .unwrap();

    let id = H256::from_evm_address([0x22; 20]);
    origin
        .chain
        .transact(hook, messenger.address(), 0, |ctx| {
            messenger.send_message(ctx, ism.address(), &encode_verify_message_id(id), 0)
        })
        .unwrap();
    assert_eq!(messenger.pending(), 2);

    assert_eq!(pump_bridge(&*messenger, destination), 1);
    assert!(ism.is_verified_id(id));

    let queued = messenger.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].target, junk_target);

    // The failed item is retried on the next pump and fails again.
    assert_eq!(pump_bridge(&*messenger, destination), 0);
    assert_eq!(messenger.pending(), 1);
}
