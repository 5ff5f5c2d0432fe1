//! gossipbench - deterministic bootstrap and publish harness for gossipsub fleets
//!
//! Every process in the fleet derives its identity from its `node<N>` hostname,
//! dials a random subset of the fleet until it holds a target number of peers,
//! waits for a shared rendezvous instant and then either floods messages into
//! the topic (ordinal 0) or just records what it receives.

pub mod bootstrap;
pub mod config;
pub mod delivery;
pub mod error;
pub mod fingerprint;
pub mod host;
pub mod identity;
pub mod network;
pub mod observer;
pub mod publish;
pub mod pubsub;
pub mod resolver;
pub mod runner;
pub mod transport;

// Re-export main types
pub use bootstrap::{BootstrapReport, MeshBootstrapper, RetryPolicy};
pub use config::{BenchConfig, BenchConfigBuilder, FileConfig, Rendezvous};
pub use delivery::{run_delivery_loop, DeliveryReport};
pub use error::{
    BootstrapError, ConfigError, DeliveryError, HostError, IdentityError, PubSubError,
    ResolutionError, RunError, StartupError,
};
pub use fingerprint::fingerprint;
pub use host::Host;
pub use identity::{derive_keypair, hostname_for, parse_ordinal, peer_id_for};
pub use network::{Libp2pNode, Libp2pSubscription, Libp2pTopic};
pub use observer::BenchObserver;
pub use publish::{is_publisher, PublishCoordinator, PublishReport, PUBLISHER_ORDINAL};
pub use pubsub::{Delivery, GossipParams, Subscription, Topic};
pub use resolver::{AddressLookup, PeerEndpoint, PeerResolver, SystemLookup};
pub use runner::{run_node, RunReport};

/// The gossipsub topic every node joins
pub const TOPIC_NAME: &str = "foobar";

/// Port every node listens on and dials
pub const LISTEN_PORT: u16 = 9000;
