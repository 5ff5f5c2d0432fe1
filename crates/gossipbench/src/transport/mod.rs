//! Transport setup for benchmark nodes.
//!
//! TCP with noise authentication and yamux multiplexing, authenticated as the
//! node's derived identity.

use std::time::Duration;

use libp2p::{identity::Keypair, noise, swarm::Swarm, tcp, yamux};

use crate::{error::HostError, network::BenchBehaviour};

/// Idle connections are kept for the whole benchmark run
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Build the swarm for a node
pub fn build_swarm(keypair: Keypair, behaviour: BenchBehaviour) -> Result<Swarm<BenchBehaviour>, HostError> {
    let swarm = libp2p::SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(tcp::Config::default().nodelay(true), noise::Config::new, yamux::Config::default)
        .map_err(|e| HostError::Transport(e.to_string()))?
        .with_behaviour(|_| behaviour)
        .map_err(|e| HostError::Transport(e.to_string()))?
        .with_swarm_config(|c| c.with_idle_connection_timeout(IDLE_CONNECTION_TIMEOUT))
        .build();

    Ok(swarm)
}
