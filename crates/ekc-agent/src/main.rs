use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ekc_agent::config::AgentConfig;
use ekc_core::keys::KeyManager;
use ekc_core::service::CustodianService;
use ekc_core::store::FileKeyStore;
use ekc_transport::TcpByteTransport;

#[derive(Parser)]
#[command(name = "ekc-agent")]
#[command(about = "EKC Agent - embedded key custodian daemon")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ekc_agent={},ekc_core={},ekc_crypto={}",
            args.log_level, args.log_level, args.log_level
        ))
        .init();

    info!("starting ekc-agent");

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        AgentConfig::load_from_file(config_path)?
    } else {
        AgentConfig::load_from_env()
    };
    config.validate()?;

    if config.unknown_command == "sign" {
        // The wire-compatible default signs anything it does not recognize;
        // access to the transport must be controlled by the host.
        info!("unknown commands fall back to signing (permissive default)");
    }

    // Initialize key material before serving anything
    let store = FileKeyStore::new(config.keystore_dir.clone());
    let manager = KeyManager::initialize(&store).await?;
    info!("custodian public key: {}", hex::encode(manager.public_key()));

    let service = Arc::new(
        CustodianService::new(manager.keypair())
            .with_unknown_command_policy(config.unknown_command_policy())
            .with_key_agreement_strategy(config.key_agreement_strategy())
            .with_read_timeout(Duration::from_millis(config.read_timeout_ms))
            .with_max_frame_len(config.max_frame_len),
    );

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("listening on {}", config.listen_addr);

    // One host connection at a time; a request is processed to completion
    // before the next read.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!(%peer, "host connected");

                let transport = TcpByteTransport::from_stream(stream);
                if let Err(e) = service.run(&transport).await {
                    warn!(%peer, "connection ended with error: {e}");
                }

                let stats = service.stats().snapshot();
                info!(
                    received = stats.received,
                    answered = stats.answered,
                    rejected = stats.rejected,
                    write_failures = stats.write_failures,
                    "connection closed"
                );
            }
        }
    }

    info!("ekc-agent stopped");
    Ok(())
}
