//! Time-synchronized publishing.
//!
//! Every node blocks until the shared rendezvous instant. Only the designated
//! publisher then floods the topic; the rest of the fleet just keeps receiving.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::{info, warn};

use crate::{fingerprint::fingerprint, observer::BenchObserver, pubsub::Topic};

/// Ordinal of the only node that publishes
pub const PUBLISHER_ORDINAL: u64 = 0;

/// Whether `ordinal` is the designated publisher
pub fn is_publisher(ordinal: u64) -> bool {
    ordinal == PUBLISHER_ORDINAL
}

/// Sleep until the wall clock reaches `instant`
///
/// Returns immediately when the instant is already in the past.
pub async fn wait_until(instant: DateTime<Utc>) {
    let remaining = (instant - Utc::now()).to_std().unwrap_or_default();
    info!(
        rendezvous = %instant.to_rfc3339_opts(SecondsFormat::Micros, true),
        ?remaining,
        "Waiting for rendezvous"
    );
    tokio::time::sleep(remaining).await;
    info!("Synchronization complete");
}

/// Fill a payload from the operating system's CSPRNG
pub fn random_payload(size: usize) -> Result<Vec<u8>, rand::Error> {
    let mut payload = vec![0u8; size];
    OsRng.try_fill_bytes(&mut payload)?;
    Ok(payload)
}

/// Outcome of the publish phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub attempted: usize,
    pub published: usize,
    pub failed: usize,
}

/// Publishes the benchmark messages once the rendezvous is reached
pub struct PublishCoordinator<'a, T: ?Sized, O: ?Sized> {
    ordinal: u64,
    message_size: usize,
    message_count: usize,
    topic: &'a T,
    observer: &'a O,
}

impl<'a, T, O> PublishCoordinator<'a, T, O>
where
    T: Topic + ?Sized,
    O: BenchObserver + ?Sized,
{
    pub fn new(ordinal: u64, message_size: usize, message_count: usize, topic: &'a T, observer: &'a O) -> Self {
        Self { ordinal, message_size, message_count, topic, observer }
    }

    /// Wait for `rendezvous`, then publish if this node is the publisher
    pub async fn run(&self, rendezvous: DateTime<Utc>) -> PublishReport {
        wait_until(rendezvous).await;
        self.publish_all().await
    }

    /// Publish `message_count` fresh random messages
    ///
    /// A failed message is logged and skipped, the remaining ones are still
    /// sent. Non-publishers return an empty report without touching the topic.
    pub async fn publish_all(&self) -> PublishReport {
        let mut report = PublishReport::default();

        if !is_publisher(self.ordinal) {
            info!(ordinal = self.ordinal, "Node is not the designated publisher");
            return report;
        }

        info!(
            ordinal = self.ordinal,
            count = self.message_count,
            size = self.message_size,
            "Node is the designated publisher, publishing"
        );

        for index in 0..self.message_count {
            report.attempted += 1;

            let payload = match random_payload(self.message_size) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(index, %error, "Failed to generate random message data, skipping");
                    report.failed += 1;
                    continue;
                }
            };
            let id = fingerprint(&payload);

            match self.topic.publish(payload).await {
                Ok(()) => {
                    report.published += 1;
                    info!(
                        topic = self.topic.name(),
                        message_id = %id,
                        published_at = %Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                        "Published message"
                    );
                    self.observer.message_published(self.topic.name(), &id);
                }
                Err(error) => {
                    report.failed += 1;
                    warn!(topic = self.topic.name(), message_id = %id, %error, "Failed to publish message");
                }
            }
        }

        info!(published = report.published, failed = report.failed, "Finished publishing messages");
        report
    }
}
