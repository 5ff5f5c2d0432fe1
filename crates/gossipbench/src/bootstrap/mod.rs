//! Mesh formation.
//!
//! The bootstrapper draws random ordinals from the fleet and dials them until
//! the host reports the target number of connected peers. Self and peers that
//! were already dialed are skipped; resolution and dial failures are logged and
//! followed by a fresh draw.

pub mod policy;

use std::collections::{BTreeSet, HashSet};

use rand::Rng;
use tracing::{debug, info, warn};

pub use policy::{Backoff, RetryPolicy};

use crate::{
    config::BenchConfig,
    error::BootstrapError,
    host::Host,
    observer::BenchObserver,
    resolver::{AddressLookup, PeerResolver},
};

/// Outcome of a completed bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Ordinals this node dialed successfully
    pub connected: BTreeSet<u64>,

    /// Live peer count when the target was reached
    pub peer_count: usize,

    /// Random ordinals drawn
    pub draws: u64,

    /// Draws skipped because they hit self or an already dialed ordinal
    pub skipped: u64,

    /// Failed resolutions and dials
    pub failures: u64,
}

/// Drives the local connected-peer count up to the configured target
pub struct MeshBootstrapper<'a, H: ?Sized, L, O: ?Sized> {
    local_ordinal: u64,
    config: &'a BenchConfig,
    host: &'a H,
    resolver: &'a PeerResolver<L>,
    observer: &'a O,
    connected: HashSet<u64>,
}

impl<'a, H, L, O> MeshBootstrapper<'a, H, L, O>
where
    H: Host + ?Sized,
    L: AddressLookup,
    O: BenchObserver + ?Sized,
{
    pub fn new(
        local_ordinal: u64,
        config: &'a BenchConfig,
        host: &'a H,
        resolver: &'a PeerResolver<L>,
        observer: &'a O,
    ) -> Self {
        Self { local_ordinal, config, host, resolver, observer, connected: HashSet::new() }
    }

    /// Ordinals dialed so far
    pub fn connected(&self) -> &HashSet<u64> {
        &self.connected
    }

    /// Sample, resolve and dial until the host holds `target_peers` connections
    ///
    /// With the default retry policy this only returns once the target is
    /// reached, which never happens if the target exceeds what the fleet can
    /// provide.
    pub async fn run<R>(&mut self, rng: &mut R) -> Result<BootstrapReport, BootstrapError>
    where
        R: Rng + Send,
    {
        let target = self.config.target_peers;
        let node_count = self.config.node_count;
        if target as u64 >= node_count {
            warn!(target, node_count, "Target peer count is unreachable in this fleet, bootstrap may never finish");
        }

        info!(target, node_count, "Starting peer discovery and connection");

        let mut report = BootstrapReport::default();
        let mut consecutive_failures: u32 = 0;

        loop {
            let peer_count = self.host.connected_peer_count().await?;
            if peer_count >= target {
                report.peer_count = peer_count;
                break;
            }

            let ordinal = rng.gen_range(0..node_count);
            report.draws += 1;

            if ordinal == self.local_ordinal || self.connected.contains(&ordinal) {
                report.skipped += 1;
                tokio::task::yield_now().await;
                continue;
            }

            let connected = match self.resolver.resolve(ordinal).await {
                Ok(endpoint) => match self.host.connect(&endpoint, self.config.dial_timeout).await {
                    Ok(()) => Some(endpoint),
                    Err(error) => {
                        warn!(ordinal, endpoint = %endpoint.address, %error, "Failed to connect to peer, resampling");
                        None
                    }
                },
                Err(error) => {
                    warn!(ordinal, %error, "Failed to resolve peer, resampling");
                    None
                }
            };

            match connected {
                Some(endpoint) => {
                    consecutive_failures = 0;
                    self.connected.insert(ordinal);
                    info!(ordinal, endpoint = %endpoint.address, "Connected to peer");
                    self.observer.peer_connected(&endpoint);
                }
                None => {
                    report.failures += 1;
                    consecutive_failures = consecutive_failures.saturating_add(1);

                    if self.config.retry.is_exhausted(report.failures) {
                        return Err(BootstrapError::AttemptsExhausted {
                            failures: report.failures,
                            connected: peer_count,
                            target,
                        });
                    }

                    match self.config.retry.delay_after(consecutive_failures) {
                        Some(delay) => {
                            debug!(?delay, consecutive_failures, "Backing off before next draw");
                            tokio::time::sleep(delay).await;
                        }
                        None => tokio::task::yield_now().await,
                    }
                }
            }
        }

        report.connected = self.connected.iter().copied().collect();
        info!(
            peer_count = report.peer_count,
            dialed = report.connected.len(),
            draws = report.draws,
            failures = report.failures,
            "Achieved target of connected peers"
        );

        Ok(report)
    }
}
