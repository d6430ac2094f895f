//! Off-chain Relayer
//!
//! Watches every mailbox's event log for `Dispatch` events and submits the
//! raw message to the destination mailbox's `process`.
//!
//! ## Overview
//!
//! Each tick:
//! 1. Pumps every native bridge so queued message-id authorizations land on
//!    their destination ISM. An item that fails is skipped, not waited on
//! 2. Collects new `Dispatch` events from every chain into a pending queue
//! 3. Attempts `process` for every pending message as the relayer account
//!
//! A message whose authorization has not landed yet fails verification and
//! stays pending until `max_attempts`. `AlreadyDelivered` counts as success so
//! blind retries are safe. Any other failure drops the message.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use gmp_common::{message_id, GmpError, H256};
use gmp_endpoint::{ChainEvent, Contract, NativeBridge};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::RelayerConfig;
use crate::network::{ChainDeployment, LocalNetwork, RELAYER};

// ============================================================================
// RECORDS
// ============================================================================

/// A message the relayer saw delivered on its destination.
#[derive(Debug, Clone, Serialize)]
pub struct RelayRecord {
    pub id: H256,
    pub origin: u32,
    pub destination: u32,
    /// `process` submissions made, the successful one included
    pub attempts: u32,
    pub delivered_at: DateTime<Utc>,
}

/// Counters for one relayer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Bridge items delivered to their destination
    pub bridged: usize,
    /// New `Dispatch` events picked up
    pub discovered: usize,
    /// Messages delivered (or found already delivered)
    pub delivered: usize,
    /// Messages given up on
    pub dropped: usize,
    /// Messages still waiting after this tick
    pub pending: usize,
}

impl TickSummary {
    /// True when the tick neither moved nor left anything.
    pub fn is_idle(&self) -> bool {
        self.bridged == 0 && self.discovered == 0 && self.pending == 0
    }
}

#[derive(Debug, Clone)]
struct PendingMessage {
    id: H256,
    origin: u32,
    destination: u32,
    message: Vec<u8>,
    attempts: u32,
}

#[derive(Debug, Default)]
struct RelayState {
    /// domain -> number of events already scanned
    cursors: HashMap<u32, usize>,
    pending: VecDeque<PendingMessage>,
    delivered: Vec<RelayRecord>,
    dropped: Vec<H256>,
}

// ============================================================================
// RELAYER
// ============================================================================

pub struct Relayer {
    network: Arc<LocalNetwork>,
    config: RelayerConfig,
    state: Arc<RwLock<RelayState>>,
}

impl Relayer {
    pub fn new(network: Arc<LocalNetwork>, config: RelayerConfig) -> Self {
        Self {
            network,
            config,
            state: Arc::new(RwLock::new(RelayState::default())),
        }
    }

    pub fn network(&self) -> &Arc<LocalNetwork> {
        &self.network
    }

    /// Delivered messages in delivery order.
    pub async fn records(&self) -> Vec<RelayRecord> {
        self.state.read().await.delivered.clone()
    }

    /// Ids of messages the relayer gave up on.
    pub async fn dropped(&self) -> Vec<H256> {
        self.state.read().await.dropped.clone()
    }

    pub async fn pending(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Runs one pump / collect / process pass.
    pub async fn tick(&self) -> Result<TickSummary> {
        let mut state = self.state.write().await;
        let mut summary = TickSummary {
            bridged: self.pump_bridges(),
            ..TickSummary::default()
        };

        summary.discovered = self.collect_dispatches(&mut state);

        let queued: Vec<PendingMessage> = state.pending.drain(..).collect();
        for mut pending in queued {
            pending.attempts += 1;
            match self.submit(&pending) {
                Ok(()) => {
                    state.delivered.push(RelayRecord {
                        id: pending.id,
                        origin: pending.origin,
                        destination: pending.destination,
                        attempts: pending.attempts,
                        delivered_at: Utc::now(),
                    });
                    summary.delivered += 1;
                }
                Err(GmpError::VerificationFailed(_))
                    if pending.attempts < self.config.max_attempts =>
                {
                    debug!(
                        "Message {} not verifiable yet (attempt {}/{})",
                        pending.id, pending.attempts, self.config.max_attempts
                    );
                    state.pending.push_back(pending);
                }
                Err(e) => {
                    error!(
                        "Dropping message {} ({} -> {}) after {} attempts: {}",
                        pending.id, pending.origin, pending.destination, pending.attempts, e
                    );
                    state.dropped.push(pending.id);
                    summary.dropped += 1;
                }
            }
        }

        summary.pending = state.pending.len();
        Ok(summary)
    }

    /// Ticks until a tick finds nothing to do. Returns the number of messages
    /// delivered along the way.
    pub async fn run_until_idle(&self) -> Result<usize> {
        let mut delivered = 0;
        loop {
            let summary = self.tick().await?;
            delivered += summary.delivered;
            if summary.is_idle() {
                return Ok(delivered);
            }
        }
    }

    /// Start the relayer loop (blocking).
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting relayer: {} chains, {} routes, polling_interval={}ms",
            self.network.chains().count(),
            self.network.routes().len(),
            self.config.polling_interval_ms
        );

        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.polling_interval_ms));
        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(summary) if !summary.is_idle() => debug!("Relayer tick: {:?}", summary),
                Ok(_) => {}
                Err(e) => error!("Relayer tick failed: {}", e),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tick phases
    // ------------------------------------------------------------------------

    fn pump_bridges(&self) -> usize {
        let mut bridged = 0;
        for route in self.network.routes() {
            let Some(destination) = self.network.chain(route.destination) else {
                continue;
            };
            bridged += pump_bridge(route.bridge.as_ref(), destination);
        }
        bridged
    }

    fn collect_dispatches(&self, state: &mut RelayState) -> usize {
        let mut discovered = 0;
        for deployment in self.network.chains() {
            let cursor = state.cursors.entry(deployment.domain()).or_insert(0);
            let events = deployment.chain.events_since(*cursor);
            *cursor += events.len();

            for record in events {
                if record.emitter != deployment.mailbox.address() {
                    continue;
                }
                let ChainEvent::Dispatch {
                    destination,
                    message,
                    ..
                } = record.event
                else {
                    continue;
                };

                let id = message_id(&message);
                if self.network.chain(destination).is_none() {
                    warn!(
                        "Ignoring message {} from {} to unknown domain {}",
                        id, deployment.name, destination
                    );
                    continue;
                }

                info!(
                    "Picked up message {} ({} -> {})",
                    id,
                    deployment.domain(),
                    destination
                );
                state.pending.push_back(PendingMessage {
                    id,
                    origin: deployment.domain(),
                    destination,
                    message,
                    attempts: 0,
                });
                discovered += 1;
            }
        }
        discovered
    }

    fn submit(&self, pending: &PendingMessage) -> Result<(), GmpError> {
        let destination = self.network.chain(pending.destination).ok_or_else(|| {
            GmpError::NotConfigured(format!("no chain for domain {}", pending.destination))
        })?;

        let result = destination
            .chain
            .transact(RELAYER, destination.mailbox.address(), 0, |ctx| {
                destination.mailbox.process(ctx, &[], &pending.message)
            });

        match result {
            Ok(_) => {
                info!(
                    "Delivered message {} on {} (attempt {})",
                    pending.id, destination.name, pending.attempts
                );
                Ok(())
            }
            Err(GmpError::AlreadyDelivered(id)) => {
                info!("Message {} was already delivered on {}", id, destination.name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Attempts every item queued on `bridge` once, in queue order. A failed item
/// is logged and skipped; the bridge requeues it for the next tick. Returns
/// the number of items delivered.
pub fn pump_bridge(bridge: &dyn NativeBridge, destination: &ChainDeployment) -> usize {
    let mut bridged = 0;
    for _ in 0..bridge.pending() {
        match bridge.deliver_next(&destination.chain) {
            Ok(Some(sequence)) => {
                debug!(
                    "{} bridge delivered item {} to {}",
                    bridge.kind(),
                    sequence,
                    destination.name
                );
                bridged += 1;
            }
            Ok(None) => break,
            Err(e) => warn!(
                "{} bridge delivery to {} failed: {}",
                bridge.kind(),
                destination.name,
                e
            ),
        }
    }
    bridged
}
