//! Event loop owning the swarm.
//!
//! Node handles talk to the swarm exclusively through [`SwarmCommand`]s; the
//! loop exits once every handle has been dropped.

use std::collections::HashMap;

use chrono::Utc;
use futures::StreamExt;
use libp2p::{
    gossipsub::{self, IdentTopic, TopicHash},
    swarm::{
        dial_opts::{DialOpts, PeerCondition},
        DialError, SwarmEvent,
    },
    PeerId, Swarm,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use super::{
    behaviour::{BenchBehaviour, BenchBehaviourEvent},
    command::SwarmCommand,
};
use crate::{
    error::{HostError, PubSubError},
    pubsub::Delivery,
};

/// Run the swarm until all command senders are gone
pub(super) async fn run(mut swarm: Swarm<BenchBehaviour>, mut commands: mpsc::UnboundedReceiver<SwarmCommand>) {
    let mut state = LoopState::default();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => state.handle_command(&mut swarm, command),
                None => {
                    info!("All node handles dropped, stopping network event loop");
                    break;
                }
            },
            event = swarm.select_next_some() => state.handle_event(event),
        }
    }
}

#[derive(Default)]
struct LoopState {
    /// Callers waiting for the outcome of a dial
    pending_dials: HashMap<PeerId, Vec<oneshot::Sender<Result<(), HostError>>>>,

    /// Delivery queue per subscribed topic
    subscriptions: HashMap<TopicHash, mpsc::Sender<Delivery>>,
}

impl LoopState {
    fn handle_command(&mut self, swarm: &mut Swarm<BenchBehaviour>, command: SwarmCommand) {
        match command {
            SwarmCommand::Dial { peer_id, address, response_tx } => {
                if swarm.is_connected(&peer_id) {
                    let _ = response_tx.send(Ok(()));
                    return;
                }

                let opts = DialOpts::peer_id(peer_id)
                    .condition(PeerCondition::DisconnectedAndNotDialing)
                    .addresses(vec![address])
                    .build();

                match swarm.dial(opts) {
                    // A dial already in flight resolves every waiter
                    Ok(()) | Err(DialError::DialPeerConditionFalse(_)) => {
                        self.pending_dials.entry(peer_id).or_default().push(response_tx);
                    }
                    Err(error) => {
                        let _ = response_tx.send(Err(HostError::Dial { peer: peer_id, reason: error.to_string() }));
                    }
                }
            }
            SwarmCommand::ConnectedPeerCount { response_tx } => {
                let _ = response_tx.send(swarm.connected_peers().count());
            }
            SwarmCommand::ListenAddresses { response_tx } => {
                let _ = response_tx.send(swarm.listeners().cloned().collect());
            }
            SwarmCommand::Subscribe { topic, capacity, response_tx } => {
                let ident = IdentTopic::new(topic.clone());
                let result = match swarm.behaviour_mut().gossipsub.subscribe(&ident) {
                    Ok(_) => {
                        let (tx, rx) = mpsc::channel(capacity);
                        self.subscriptions.insert(ident.hash(), tx);
                        info!(%topic, "Subscribed to topic");
                        Ok(rx)
                    }
                    Err(e) => Err(PubSubError::Subscribe { topic, reason: e.to_string() }),
                };
                let _ = response_tx.send(result);
            }
            SwarmCommand::Publish { topic, data, response_tx } => {
                let result = match swarm.behaviour_mut().gossipsub.publish(IdentTopic::new(topic.clone()), data) {
                    Ok(message_id) => {
                        trace!(%topic, %message_id, "Message handed to gossipsub");
                        Ok(())
                    }
                    Err(e) => Err(PubSubError::Publish { topic, reason: e.to_string() }),
                };
                let _ = response_tx.send(result);
            }
        }
    }

    fn handle_event(&mut self, event: SwarmEvent<BenchBehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(BenchBehaviourEvent::Gossipsub(event)) => self.handle_gossipsub(event),
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(%address, "Listening");
            }
            SwarmEvent::ConnectionEstablished { peer_id, endpoint, .. } => {
                debug!(%peer_id, remote = %endpoint.get_remote_address(), "Connection established");
                for waiter in self.pending_dials.remove(&peer_id).unwrap_or_default() {
                    let _ = waiter.send(Ok(()));
                }
            }
            SwarmEvent::ConnectionClosed { peer_id, cause, .. } => {
                debug!(%peer_id, ?cause, "Connection closed");
            }
            SwarmEvent::OutgoingConnectionError { peer_id: Some(peer_id), error, .. } => {
                let reason = error.to_string();
                debug!(%peer_id, %reason, "Outgoing connection error");
                for waiter in self.pending_dials.remove(&peer_id).unwrap_or_default() {
                    let _ = waiter.send(Err(HostError::Dial { peer: peer_id, reason: reason.clone() }));
                }
            }
            SwarmEvent::IncomingConnectionError { send_back_addr, error, .. } => {
                debug!(%send_back_addr, %error, "Incoming connection error");
            }
            _ => {}
        }
    }

    fn handle_gossipsub(&mut self, event: gossipsub::Event) {
        match event {
            gossipsub::Event::Message { propagation_source, message_id, message } => {
                let received_at = Utc::now();
                let gossipsub::Message { data, source, topic, .. } = message;

                let Some(queue) = self.subscriptions.get(&topic) else {
                    trace!(%message_id, topic = topic.as_str(), "Message on a topic without local consumer");
                    return;
                };

                let delivery = Delivery {
                    topic: topic.as_str().to_string(),
                    payload: data,
                    source,
                    propagation_source,
                    received_at,
                };
                match queue.try_send(delivery) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(%message_id, topic = topic.as_str(), "Delivery queue full, dropping message");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(topic = topic.as_str(), "Subscription dropped, no longer routing topic");
                        self.subscriptions.remove(&topic);
                    }
                }
            }
            gossipsub::Event::Subscribed { peer_id, topic } => {
                debug!(%peer_id, topic = topic.as_str(), "Peer subscribed");
            }
            gossipsub::Event::Unsubscribed { peer_id, topic } => {
                debug!(%peer_id, topic = topic.as_str(), "Peer unsubscribed");
            }
            other => {
                debug!(event = ?other, "Gossipsub event");
            }
        }
    }
}
