//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the GMP relay.
//! Configuration describes the local chains to spin up, the native bridge
//! routes connecting them, and the relayer's polling behaviour.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "GMP_RELAY_CONFIG_PATH";

/// Path used when `GMP_RELAY_CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/gmp-relay.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all relay settings.
///
/// This structure holds configuration for:
/// - The local chains (one mailbox deployment each)
/// - The bridge routes between them (one hook/ISM pair each)
/// - The relayer loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chains to deploy a mailbox on
    pub chains: Vec<ChainConfig>,
    /// Directed routes, each served by one native bridge
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    /// Relayer loop settings
    pub relayer: RelayerConfig,
}

/// Configuration for one local chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human-readable name, referenced by routes
    pub name: String,
    /// Protocol domain identifier (unique across the network)
    pub domain: u32,
    /// Initial balance minted to the deployment owner
    pub owner_balance: u64,
}

/// Native bridge families a route can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeKind {
    OpStack,
    Erc5164,
    Arbitrum,
}

impl std::fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BridgeKind::OpStack => "op_stack",
            BridgeKind::Erc5164 => "erc5164",
            BridgeKind::Arbitrum => "arbitrum",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for one directed route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Origin chain name
    pub origin: String,
    /// Destination chain name
    pub destination: String,
    /// Bridge carrying message-id authorizations
    pub bridge: BridgeKind,
}

/// Relayer loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Polling interval in milliseconds
    pub polling_interval_ms: u64,
    /// Process attempts per message before it is given up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    5
}

impl Config {
    /// Looks up a chain by name.
    pub fn chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.name == name)
    }

    /// Validates the configuration.
    ///
    /// Returns an error when domains or names collide, or when a route is
    /// self-referential, duplicated, or names an unknown chain.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chains.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: At least one [[chains]] entry is required."
            ));
        }

        let mut names = HashSet::new();
        let mut domains = HashSet::new();
        for chain in &self.chains {
            if !names.insert(chain.name.as_str()) {
                return Err(anyhow::anyhow!(
                    "Configuration error: Chain name '{}' is used more than once. Each chain must have a unique name.",
                    chain.name
                ));
            }
            if !domains.insert(chain.domain) {
                return Err(anyhow::anyhow!(
                    "Configuration error: Domain {} is used by more than one chain. Each chain must have a unique domain.",
                    chain.domain
                ));
            }
        }

        let mut routes = HashSet::new();
        for route in &self.routes {
            for endpoint in [&route.origin, &route.destination] {
                if !names.contains(endpoint.as_str()) {
                    return Err(anyhow::anyhow!(
                        "Configuration error: Route {} -> {} references unknown chain '{}'.",
                        route.origin,
                        route.destination,
                        endpoint
                    ));
                }
            }
            if route.origin == route.destination {
                return Err(anyhow::anyhow!(
                    "Configuration error: Route origin and destination are both '{}'.",
                    route.origin
                ));
            }
            if !routes.insert((route.origin.as_str(), route.destination.as_str())) {
                return Err(anyhow::anyhow!(
                    "Configuration error: Route {} -> {} is defined more than once.",
                    route.origin,
                    route.destination
                ));
            }
        }

        if self.relayer.polling_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: relayer.polling_interval_ms must be greater than zero."
            ));
        }
        if self.relayer.max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: relayer.max_attempts must be greater than zero."
            ));
        }

        Ok(())
    }

    /// Loads configuration from `GMP_RELAY_CONFIG_PATH` or the default path.
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Loads and validates the configuration file at `config_path`.
    pub fn load_from(config_path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            // Configuration file doesn't exist - user needs to copy template
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/gmp-relay.template.toml config/gmp-relay.toml\n\
                Then edit config/gmp-relay.toml with your chains and routes.",
                config_path
            ))
        }
    }
}

impl Default for Config {
    /// Two chains joined in both directions over OP Stack.
    fn default() -> Self {
        Self {
            chains: vec![
                ChainConfig {
                    name: "ethereum".to_string(),
                    domain: 1,
                    owner_balance: 1_000_000_000_000_000_000,
                },
                ChainConfig {
                    name: "optimism".to_string(),
                    domain: 10,
                    owner_balance: 1_000_000_000_000_000_000,
                },
            ],
            routes: vec![
                RouteConfig {
                    origin: "ethereum".to_string(),
                    destination: "optimism".to_string(),
                    bridge: BridgeKind::OpStack,
                },
                RouteConfig {
                    origin: "optimism".to_string(),
                    destination: "ethereum".to_string(),
                    bridge: BridgeKind::OpStack,
                },
            ],
            relayer: RelayerConfig {
                polling_interval_ms: 1000,
                max_attempts: default_max_attempts(),
            },
        }
    }
}
