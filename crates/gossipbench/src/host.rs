//! Transport host seam.

use std::time::Duration;

use async_trait::async_trait;
use libp2p::PeerId;

use crate::{error::HostError, resolver::PeerEndpoint};

/// Connection management of the local node
#[async_trait]
pub trait Host: Send + Sync {
    /// Peer id this host authenticates as
    fn local_peer_id(&self) -> PeerId;

    /// Connect to `endpoint`, giving up after `deadline`
    async fn connect(&self, endpoint: &PeerEndpoint, deadline: Duration) -> Result<(), HostError>;

    /// Live number of connected peers, inbound and outbound
    async fn connected_peer_count(&self) -> Result<usize, HostError>;
}
