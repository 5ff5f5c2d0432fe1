//! Delivery logging.

use chrono::SecondsFormat;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{error::DeliveryError, fingerprint::fingerprint, observer::BenchObserver, pubsub::Subscription};

/// Outcome of a delivery loop that was shut down cleanly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: u64,
}

/// Drain `subscription`, logging every message, until `cancel` fires
///
/// Cancellation is a clean shutdown and yields the report. Any error from the
/// subscription ends the loop with [`DeliveryError`].
pub async fn run_delivery_loop<S, O>(
    subscription: &mut S,
    observer: &O,
    cancel: &CancellationToken,
) -> Result<DeliveryReport, DeliveryError>
where
    S: Subscription + ?Sized,
    O: BenchObserver + ?Sized,
{
    let mut report = DeliveryReport::default();
    info!("Entering message reception loop");

    loop {
        let delivery = match subscription.next(cancel).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                info!(delivered = report.delivered, "Message reception loop cancelled");
                return Ok(report);
            }
            Err(source) => return Err(DeliveryError { delivered: report.delivered, source }),
        };

        report.delivered += 1;
        let id = fingerprint(&delivery.payload);
        info!(
            topic = %delivery.topic,
            message_id = %id,
            from = %delivery.sender(),
            via = %delivery.propagation_source,
            size = delivery.payload.len(),
            received_at = %delivery.received_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            "Received message"
        );
        observer.message_delivered(&delivery, &id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use chrono::Utc;
    use libp2p::PeerId;

    use super::*;
    use crate::{error::PubSubError, pubsub::Delivery};

    /// Hands out queued results, then waits for cancellation
    struct ScriptedSubscription(VecDeque<Result<Delivery, PubSubError>>);

    #[async_trait]
    impl Subscription for ScriptedSubscription {
        async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Delivery>, PubSubError> {
            match self.0.pop_front() {
                Some(result) => result.map(Some),
                None => {
                    cancel.cancelled().await;
                    Ok(None)
                }
            }
        }
    }

    fn delivery(payload: &[u8]) -> Delivery {
        Delivery {
            topic: "foobar".into(),
            payload: payload.to_vec(),
            source: None,
            propagation_source: PeerId::random(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_clean() {
        let mut subscription = ScriptedSubscription(VecDeque::from([Ok(delivery(b"a")), Ok(delivery(b"b"))]));
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { run_delivery_loop(&mut subscription, &(), &cancel).await })
        };
        cancel.cancel();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.delivered, 2);
    }

    #[tokio::test]
    async fn test_subscription_error_is_reported() {
        let mut subscription = ScriptedSubscription(VecDeque::from([
            Ok(delivery(b"a")),
            Err(PubSubError::Closed { topic: "foobar".into() }),
            Ok(delivery(b"never")),
        ]));

        let error = run_delivery_loop(&mut subscription, &(), &CancellationToken::new()).await.unwrap_err();

        assert_eq!(error.delivered, 1);
        assert!(matches!(error.source, PubSubError::Closed { .. }));
    }
}
