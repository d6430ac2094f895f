//! GMP Relay Service
//!
//! Spins up the local GMP network described by the configuration file and
//! relays dispatched messages between its mailboxes.
//!
//! ## Overview
//!
//! The relay:
//! 1. Deploys a mailbox per configured chain and a hook/ISM pair per route
//! 2. Pumps the mock native bridges so message-id authorizations land
//! 3. Watches `Dispatch` events and calls `process` on the destination
//!
//! With `--demo` it sends one message over every route, relays until idle
//! and prints the delivery records instead of running forever.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gmp_relay::config::{Config, CONFIG_PATH_ENV};
use gmp_relay::{LocalNetwork, Relayer, OWNER};

const DEMO_BODY: &[u8] = b"hello";

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the relayer.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Builds the local network
/// 4. Runs the relayer until shutdown (or the demo until idle)
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("GMP Relay Service");
        println!();
        println!("Usage: gmp-relay [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --demo            Send \"hello\" over every route, relay until idle and exit");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  GMP_RELAY_CONFIG_PATH    Path to config file (default config/gmp-relay.toml)");
        println!("  RUST_LOG                 Log filter, e.g. info or gmp_endpoint=debug");
        return Ok(());
    }

    let mut config_path = None;
    let mut demo = false;

    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        } else if args[i] == "--demo" {
            demo = true;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var(CONFIG_PATH_ENV, &path);
        info!("Using custom config: {}", path);
    }

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let network = Arc::new(LocalNetwork::from_config(&config)?);
    let relayer = Relayer::new(network.clone(), config.relayer.clone());

    if demo {
        return run_demo(&network, &relayer).await;
    }

    // Run the relayer (this blocks until shutdown)
    relayer.run().await
}

/// Dispatches one message per route, relays until idle and prints what was
/// delivered.
async fn run_demo(network: &LocalNetwork, relayer: &Relayer) -> Result<()> {
    for route in network.routes() {
        let receipt = network
            .send(OWNER, route.origin, route.destination, DEMO_BODY)
            .with_context(|| format!("Demo dispatch over {} failed", route.kind))?;
        info!(
            "Dispatched {} ({} -> {}) over {}, fee {}",
            receipt.id, route.origin, route.destination, route.kind, receipt.fee
        );
    }

    let delivered = relayer.run_until_idle().await?;
    info!("Relayer idle after delivering {} messages", delivered);

    let records = relayer.records().await;
    println!("{}", serde_json::to_string_pretty(&records)?);

    for deployment in network.chains() {
        for received in deployment.recipient.received() {
            println!(
                "{} received 0x{} from {} on domain {}",
                deployment.name,
                hex::encode(&received.body),
                received.sender,
                received.origin
            );
        }
    }

    let dropped = relayer.dropped().await;
    if !dropped.is_empty() {
        anyhow::bail!("{} messages could not be delivered", dropped.len());
    }
    Ok(())
}
