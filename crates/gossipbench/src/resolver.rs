//! Peer address resolution.
//!
//! Maps a node ordinal to a dialable endpoint by resolving the `node<N>`
//! hostname and pairing the first address with the ordinal's derived peer id.

use std::{fmt, io, net::IpAddr};

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use tracing::trace;

use crate::{
    error::ResolutionError,
    identity::{hostname_for, peer_id_for},
};

/// Hostname to address lookup
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self, hostname: &str) -> io::Result<Vec<IpAddr>>;
}

/// Lookup through the system resolver (DNS, /etc/hosts)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

#[async_trait]
impl AddressLookup for SystemLookup {
    async fn lookup(&self, hostname: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((hostname, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// A fully qualified dial target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub ordinal: u64,
    pub address: Multiaddr,
    pub peer_id: PeerId,
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", hostname_for(self.ordinal), self.address)
    }
}

/// Resolves node ordinals into [`PeerEndpoint`]s
#[derive(Debug, Clone)]
pub struct PeerResolver<L = SystemLookup> {
    lookup: L,
    port: u16,
}

impl PeerResolver<SystemLookup> {
    /// Resolver backed by the system resolver
    pub fn system(port: u16) -> Self {
        Self::new(SystemLookup, port)
    }
}

impl<L: AddressLookup> PeerResolver<L> {
    pub fn new(lookup: L, port: u16) -> Self {
        Self { lookup, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the endpoint of `ordinal`
    ///
    /// When the hostname has several addresses the first one wins.
    pub async fn resolve(&self, ordinal: u64) -> Result<PeerEndpoint, ResolutionError> {
        let hostname = hostname_for(ordinal);

        let addresses = self
            .lookup
            .lookup(&hostname)
            .await
            .map_err(|source| ResolutionError::Lookup { hostname: hostname.clone(), source })?;
        let ip = *addresses
            .first()
            .ok_or_else(|| ResolutionError::NoAddresses { hostname: hostname.clone() })?;

        let peer_id = peer_id_for(ordinal)?;
        let address = compose_endpoint(ip, self.port, &peer_id)?;
        trace!(ordinal, %address, "Resolved peer endpoint");

        Ok(PeerEndpoint { ordinal, address, peer_id })
    }
}

/// Build `/ip4|ip6/<ip>/tcp/<port>/p2p/<peer id>`
pub fn compose_endpoint(ip: IpAddr, port: u16, peer_id: &PeerId) -> Result<Multiaddr, ResolutionError> {
    let family = match ip {
        IpAddr::V4(_) => "ip4",
        IpAddr::V6(_) => "ip6",
    };
    let endpoint = format!("/{family}/{ip}/tcp/{port}/p2p/{peer_id}");

    endpoint
        .parse()
        .map_err(|source| ResolutionError::Endpoint { endpoint: endpoint.clone(), source })
}
