//! Network behaviour for benchmark nodes.

use libp2p::{gossipsub, swarm::NetworkBehaviour};

use crate::{error::PubSubError, pubsub::GossipParams};

/// Outbound mesh peers kept by default by the router
const DEFAULT_MESH_OUTBOUND_MIN: usize = 2;

/// The libp2p behaviour of a benchmark node
#[derive(NetworkBehaviour)]
pub struct BenchBehaviour {
    /// Gossipsub router carrying the benchmark topic
    pub gossipsub: gossipsub::Behaviour,
}

impl BenchBehaviour {
    pub fn new(params: &GossipParams) -> Result<Self, PubSubError> {
        Ok(Self { gossipsub: build_gossipsub(params)? })
    }
}

/// Build the gossipsub router from the benchmark parameters
///
/// Messages are anonymous (neither signed nor attributed to an author) and are
/// identified by `params.message_id` over their payload.
pub fn build_gossipsub(params: &GossipParams) -> Result<gossipsub::Behaviour, PubSubError> {
    let message_id = params.message_id;
    let mesh_outbound_min = DEFAULT_MESH_OUTBOUND_MIN.min(params.mesh_n_low).min(params.mesh_n / 2);

    let config = gossipsub::ConfigBuilder::default()
        .mesh_n_low(params.mesh_n_low)
        .mesh_n(params.mesh_n)
        .mesh_n_high(params.mesh_n_high)
        .mesh_outbound_min(mesh_outbound_min)
        .heartbeat_interval(params.heartbeat_interval)
        .history_length(params.history_length)
        .history_gossip(params.history_gossip)
        .max_transmit_size(params.max_transmit_size)
        .connection_handler_queue_len(params.outbound_queue_size)
        .validation_mode(gossipsub::ValidationMode::Anonymous)
        .message_id_fn(move |message: &gossipsub::Message| {
            gossipsub::MessageId::from(message_id(&message.data))
        })
        .build()
        .map_err(|e| PubSubError::Router(e.to_string()))?;

    gossipsub::Behaviour::new(gossipsub::MessageAuthenticity::Anonymous, config)
        .map_err(|e| PubSubError::Router(e.to_string()))
}
