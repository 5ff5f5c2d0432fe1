//! Complete run of a single node.
//!
//! The delivery loop starts first so nothing published during bootstrap is
//! missed. The node then waits for the network to settle, forms its mesh and
//! publishes at the rendezvous. Afterwards it keeps receiving until `cancel`
//! fires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::{
    bootstrap::{BootstrapReport, MeshBootstrapper},
    config::BenchConfig,
    delivery::{run_delivery_loop, DeliveryReport},
    error::{BootstrapError, RunError},
    host::Host,
    observer::BenchObserver,
    publish::{PublishCoordinator, PublishReport},
    pubsub::{Subscription, Topic},
    resolver::{AddressLookup, PeerResolver},
};

/// Summary of a node run
///
/// `bootstrap` and `publish` are `None` when the run was cancelled before the
/// phase completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub bootstrap: Option<BootstrapReport>,
    pub publish: Option<PublishReport>,
    pub delivery: DeliveryReport,
}

/// Run node `ordinal` until `cancel` fires or a fatal error occurs
///
/// `started_at` anchors a relative rendezvous.
#[allow(clippy::too_many_arguments)]
pub async fn run_node<H, T, S, L, O>(
    config: &BenchConfig,
    ordinal: u64,
    started_at: DateTime<Utc>,
    host: &H,
    topic: &T,
    mut subscription: S,
    resolver: &PeerResolver<L>,
    observer: Arc<O>,
    cancel: CancellationToken,
) -> Result<RunReport, RunError>
where
    H: Host + ?Sized,
    T: Topic + ?Sized,
    S: Subscription + 'static,
    L: AddressLookup,
    O: BenchObserver + ?Sized + 'static,
{
    let mut delivery_task = {
        let observer = observer.clone();
        let cancel = cancel.clone();
        tokio::spawn(
            async move { run_delivery_loop(&mut subscription, &*observer, &cancel).await }.in_current_span(),
        )
    };

    let phases = async {
        info!(delay = ?config.settle_delay, "Waiting for network to stabilize");
        tokio::time::sleep(config.settle_delay).await;

        let mut rng = StdRng::from_entropy();
        let bootstrap = MeshBootstrapper::new(ordinal, config, host, resolver, &*observer).run(&mut rng).await?;

        let rendezvous = config.rendezvous.instant(started_at);
        let publish = PublishCoordinator::new(ordinal, config.message_size, config.message_count, topic, &*observer)
            .run(rendezvous)
            .await;

        Ok::<_, BootstrapError>((bootstrap, publish))
    };

    let outcome = tokio::select! {
        outcome = phases => outcome,
        joined = &mut delivery_task => {
            let delivery = joined??;
            warn!("Run cancelled before the publish phase completed");
            return Ok(RunReport { bootstrap: None, publish: None, delivery });
        }
    };

    let (bootstrap, publish) = match outcome {
        Ok(phases) => phases,
        Err(error) => {
            cancel.cancel();
            let _ = delivery_task.await;
            return Err(error.into());
        }
    };

    info!("Publish phase complete, receiving until shutdown");
    let delivery = delivery_task.await??;

    Ok(RunReport { bootstrap: Some(bootstrap), publish: Some(publish), delivery })
}
