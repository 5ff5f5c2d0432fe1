//! libp2p binding of the host and pub/sub seams.

mod behaviour;
mod command;
mod event_loop;
mod node;

pub use behaviour::{build_gossipsub, BenchBehaviour, BenchBehaviourEvent};
pub use node::{Libp2pNode, Libp2pSubscription, Libp2pTopic};
