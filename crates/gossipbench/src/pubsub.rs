//! Pub/sub router seam.
//!
//! The gossip protocol itself is not implemented here; components only see a
//! [`Topic`] to publish on and a [`Subscription`] to drain.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libp2p::PeerId;
use tokio_util::sync::CancellationToken;

use crate::{error::PubSubError, fingerprint::fingerprint};

/// Gossipsub parameters fixed at startup
#[derive(Debug, Clone, Copy)]
pub struct GossipParams {
    /// Lower bound of the mesh degree
    pub mesh_n_low: usize,

    /// Target mesh degree
    pub mesh_n: usize,

    /// Upper bound of the mesh degree
    pub mesh_n_high: usize,

    pub heartbeat_interval: Duration,

    /// Number of heartbeats a message stays in the history cache
    pub history_length: usize,

    /// Number of history windows gossiped to peers
    pub history_gossip: usize,

    pub max_transmit_size: usize,

    /// Per-peer queue of outbound RPCs
    pub outbound_queue_size: usize,

    /// Queue of received messages waiting for the local consumer
    pub validate_queue_size: usize,

    /// Content-addressing function used as the router's message id
    pub message_id: fn(&[u8]) -> String,
}

impl GossipParams {
    pub const DEFAULT_DEGREE: usize = 8;
    pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(700);

    /// Parameters for a mesh degree `d`: low is `d - 2`, high is `d + 4`
    pub fn with_degree(degree: usize, heartbeat_interval: Duration) -> Self {
        Self {
            mesh_n_low: degree.saturating_sub(2),
            mesh_n: degree,
            mesh_n_high: degree + 4,
            heartbeat_interval,
            ..Self::default()
        }
    }
}

impl Default for GossipParams {
    fn default() -> Self {
        Self {
            mesh_n_low: Self::DEFAULT_DEGREE - 2,
            mesh_n: Self::DEFAULT_DEGREE,
            mesh_n_high: Self::DEFAULT_DEGREE + 4,
            heartbeat_interval: Self::DEFAULT_HEARTBEAT,
            history_length: 6,
            history_gossip: 3,
            max_transmit_size: 10 * 1024 * 1024,
            outbound_queue_size: 600,
            validate_queue_size: 600,
            message_id: fingerprint,
        }
    }
}

/// A message received on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Vec<u8>,

    /// Original author, absent for anonymous messages
    pub source: Option<PeerId>,

    /// Peer that forwarded the message to us
    pub propagation_source: PeerId,

    pub received_at: DateTime<Utc>,
}

impl Delivery {
    /// Best known sender: the author if the message carries one, otherwise the
    /// forwarding peer
    pub fn sender(&self) -> PeerId {
        self.source.unwrap_or(self.propagation_source)
    }
}

/// A joined topic
#[async_trait]
pub trait Topic: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PubSubError>;
}

/// A live subscription to a topic
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next delivery
    ///
    /// Returns `Ok(None)` once `cancel` fires; any other way the subscription
    /// ends is an error.
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Delivery>, PubSubError>;
}
