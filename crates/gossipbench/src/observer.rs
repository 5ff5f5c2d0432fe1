//! Optional lifecycle hooks.
//!
//! Every hook defaults to a no-op and `()` implements the trait, so running
//! without an observer costs nothing.

use std::sync::Arc;

use crate::{pubsub::Delivery, resolver::PeerEndpoint};

/// Receives key lifecycle events of a node run
pub trait BenchObserver: Send + Sync {
    /// A bootstrap dial succeeded
    fn peer_connected(&self, _endpoint: &PeerEndpoint) {}

    /// A message was accepted by the router
    fn message_published(&self, _topic: &str, _fingerprint: &str) {}

    /// A message arrived on the subscription
    fn message_delivered(&self, _delivery: &Delivery, _fingerprint: &str) {}
}

impl BenchObserver for () {}

impl<T: BenchObserver + ?Sized> BenchObserver for Arc<T> {
    fn peer_connected(&self, endpoint: &PeerEndpoint) {
        (**self).peer_connected(endpoint)
    }

    fn message_published(&self, topic: &str, fingerprint: &str) {
        (**self).message_published(topic, fingerprint)
    }

    fn message_delivered(&self, delivery: &Delivery, fingerprint: &str) {
        (**self).message_delivered(delivery, fingerprint)
    }
}
