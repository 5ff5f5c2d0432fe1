//! Handles onto a running libp2p node.

use std::time::Duration;

use async_trait::async_trait;
use libp2p::{identity::Keypair, Multiaddr, PeerId};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

use super::{behaviour::BenchBehaviour, command::SwarmCommand, event_loop};
use crate::{
    error::{HostError, PubSubError, StartupError},
    host::Host,
    pubsub::{Delivery, GossipParams, Subscription, Topic},
    resolver::PeerEndpoint,
    transport::build_swarm,
};

/// A libp2p node whose swarm runs on its own task
///
/// The handle is cheap to clone; the swarm task stops once the last handle
/// and every [`Libp2pTopic`] derived from it are dropped.
#[derive(Clone)]
pub struct Libp2pNode {
    local_peer_id: PeerId,
    commands: mpsc::UnboundedSender<SwarmCommand>,
    inbound_queue_size: usize,
}

impl Libp2pNode {
    /// Build the swarm, start listening on `listen` and spawn the event loop
    pub fn spawn(keypair: Keypair, listen: Multiaddr, params: &GossipParams) -> Result<Self, StartupError> {
        let local_peer_id = keypair.public().to_peer_id();
        let behaviour = BenchBehaviour::new(params)?;
        let mut swarm = build_swarm(keypair, behaviour)?;

        swarm
            .listen_on(listen.clone())
            .map_err(|e| HostError::Listen { address: listen.to_string(), reason: e.to_string() })?;

        let (commands, commands_rx) = mpsc::unbounded_channel();
        tokio::spawn(event_loop::run(swarm, commands_rx).in_current_span());
        info!(%local_peer_id, %listen, "Started libp2p node");

        Ok(Self { local_peer_id, commands, inbound_queue_size: params.validate_queue_size.max(1) })
    }

    /// Addresses the swarm is currently listening on
    pub async fn listen_addresses(&self) -> Result<Vec<Multiaddr>, HostError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SwarmCommand::ListenAddresses { response_tx }).map_err(|_| HostError::Shutdown)?;
        response_rx.await.map_err(|_| HostError::Shutdown)
    }

    /// Join `topic` for publishing and subscribing
    pub fn join(&self, topic: &str) -> Result<Libp2pTopic, PubSubError> {
        if topic.is_empty() {
            return Err(PubSubError::Join { topic: topic.to_string(), reason: "topic name is empty".into() });
        }
        if self.commands.is_closed() {
            return Err(PubSubError::Shutdown);
        }

        Ok(Libp2pTopic {
            name: topic.to_string(),
            commands: self.commands.clone(),
            inbound_queue_size: self.inbound_queue_size,
        })
    }

    fn send(&self, command: SwarmCommand) -> Result<(), mpsc::error::SendError<SwarmCommand>> {
        self.commands.send(command)
    }
}

#[async_trait]
impl Host for Libp2pNode {
    fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    async fn connect(&self, endpoint: &PeerEndpoint, deadline: Duration) -> Result<(), HostError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SwarmCommand::Dial {
            peer_id: endpoint.peer_id,
            address: endpoint.address.clone(),
            response_tx,
        })
        .map_err(|_| HostError::Shutdown)?;

        match tokio::time::timeout(deadline, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(HostError::Shutdown),
            Err(_) => Err(HostError::Timeout { peer: endpoint.peer_id, deadline }),
        }
    }

    async fn connected_peer_count(&self) -> Result<usize, HostError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(SwarmCommand::ConnectedPeerCount { response_tx }).map_err(|_| HostError::Shutdown)?;
        response_rx.await.map_err(|_| HostError::Shutdown)
    }
}

/// A topic joined on a [`Libp2pNode`]
#[derive(Clone)]
pub struct Libp2pTopic {
    name: String,
    commands: mpsc::UnboundedSender<SwarmCommand>,
    inbound_queue_size: usize,
}

impl Libp2pTopic {
    /// Subscribe to the topic
    ///
    /// Messages are routed to the most recent subscription only.
    pub async fn subscribe(&self) -> Result<Libp2pSubscription, PubSubError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.commands
            .send(SwarmCommand::Subscribe {
                topic: self.name.clone(),
                capacity: self.inbound_queue_size,
                response_tx,
            })
            .map_err(|_| PubSubError::Shutdown)?;

        let rx = response_rx.await.map_err(|_| PubSubError::Shutdown)??;
        debug!(topic = %self.name, "Subscription ready");
        Ok(Libp2pSubscription { topic: self.name.clone(), rx })
    }
}

#[async_trait]
impl Topic for Libp2pTopic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PubSubError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.commands
            .send(SwarmCommand::Publish { topic: self.name.clone(), data: payload, response_tx })
            .map_err(|_| PubSubError::Shutdown)?;
        response_rx.await.map_err(|_| PubSubError::Shutdown)?
    }
}

/// Deliveries of a subscribed topic
pub struct Libp2pSubscription {
    topic: String,
    rx: mpsc::Receiver<Delivery>,
}

#[async_trait]
impl Subscription for Libp2pSubscription {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Delivery>, PubSubError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            delivery = self.rx.recv() => match delivery {
                Some(delivery) => Ok(Some(delivery)),
                None => Err(PubSubError::Closed { topic: self.topic.clone() }),
            },
        }
    }
}
