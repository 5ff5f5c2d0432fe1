//! Commands sent to the swarm task.

use libp2p::{Multiaddr, PeerId};
use tokio::sync::{mpsc, oneshot};

use crate::{
    error::{HostError, PubSubError},
    pubsub::Delivery,
};

/// Requests from node handles to the task owning the swarm
#[derive(Debug)]
pub(super) enum SwarmCommand {
    /// Dial a peer; answered once the connection is established or fails
    Dial {
        peer_id: PeerId,
        address: Multiaddr,
        response_tx: oneshot::Sender<Result<(), HostError>>,
    },

    /// Query the live connected peer count
    ConnectedPeerCount { response_tx: oneshot::Sender<usize> },

    /// Query listen addresses
    ListenAddresses { response_tx: oneshot::Sender<Vec<Multiaddr>> },

    /// Subscribe to a topic and route its messages into a new queue
    Subscribe {
        topic: String,
        capacity: usize,
        response_tx: oneshot::Sender<Result<mpsc::Receiver<Delivery>, PubSubError>>,
    },

    /// Publish a payload to a topic
    Publish {
        topic: String,
        data: Vec<u8>,
        response_tx: oneshot::Sender<Result<(), PubSubError>>,
    },
}
