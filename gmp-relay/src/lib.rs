//! GMP Relay Library
//!
//! Builds a local multi-chain GMP network from configuration and relays
//! dispatched messages between its mailboxes.

pub mod config;
pub mod network;
pub mod relayer;

// Re-export commonly used types
pub use config::{BridgeKind, ChainConfig, Config, RelayerConfig, RouteConfig};
pub use network::{ChainDeployment, LocalNetwork, Route, OWNER, RELAYER};
pub use relayer::{pump_bridge, RelayRecord, Relayer, TickSummary};
