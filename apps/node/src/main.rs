//! Gossipbench node
//!
//! One process of a benchmark fleet. Every node runs on a host named
//! `node<N>` and listens on the same port.
//!
//! # Usage
//!
//! ```bash
//! # Fleet of 50 nodes, 10 peers each, publish one minute after start
//! gossipbench-node --count 50 --target 10 --publish-after-secs 60
//!
//! # Layer a config file under explicit flags
//! gossipbench-node --config bench.toml -n 5 --size 1024
//! ```

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use clap::Parser;
use gossipbench::{
    derive_keypair, parse_ordinal, run_node, BenchConfig, Host, Libp2pNode, PeerResolver,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();
    let started_at = Utc::now();

    let cli = Cli::parse();
    let config = cli.bench_config()?;
    let hostname = cli.hostname()?;
    let ordinal = parse_ordinal(&hostname)?;

    run(config, ordinal, started_at).instrument(info_span!("node", ordinal)).await
}

async fn run(config: BenchConfig, ordinal: u64, started_at: DateTime<Utc>) -> Result<()> {
    info!(start = %Local::now().to_rfc3339_opts(SecondsFormat::Micros, false), "Simulation start time");
    info!("{config}");

    let keypair = derive_keypair(ordinal).context("failed to derive node identity")?;
    let node = Libp2pNode::spawn(keypair, config.listen_address(), &config.gossip)
        .context("failed to start libp2p node")?;
    info!(peer_id = %node.local_peer_id(), "Node identity ready");

    let topic = node.join(&config.topic)?;
    let subscription = topic.subscribe().await?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()).in_current_span());

    let resolver = PeerResolver::system(config.listen_port);
    let report = run_node(&config, ordinal, started_at, &node, &topic, subscription, &resolver, Arc::new(()), cancel)
        .await
        .context("node run failed")?;

    info!(
        dialed = report.bootstrap.as_ref().map(|b| b.connected.len()),
        published = report.publish.map(|p| p.published),
        delivered = report.delivery.delivered,
        "Node finished"
    );
    Ok(())
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("Initiating graceful shutdown...");
    cancel.cancel();
}
