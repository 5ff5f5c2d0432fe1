//! Benchmark configuration types.

use std::{fmt, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use libp2p::Multiaddr;

use crate::{bootstrap::RetryPolicy, pubsub::GossipParams, LISTEN_PORT, TOPIC_NAME};

/// The instant at which the publisher starts sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendezvous {
    /// A fixed wall-clock instant shared by the whole fleet
    At(DateTime<Utc>),

    /// A delay relative to the local process start
    AfterStart(Duration),
}

impl Rendezvous {
    /// Resolve to a wall-clock instant for a process started at `started_at`
    pub fn instant(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Rendezvous::At(at) => at,
            Rendezvous::AfterStart(delay) => chrono::Duration::from_std(delay)
                .ok()
                .and_then(|delay| started_at.checked_add_signed(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Rendezvous::AfterStart(Duration::ZERO)
    }
}

impl fmt::Display for Rendezvous {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendezvous::At(at) => write!(f, "{}", at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Rendezvous::AfterStart(delay) => write!(f, "start + {delay:?}"),
        }
    }
}

/// Immutable benchmark configuration, built once at startup
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of nodes in the fleet
    pub node_count: u64,

    /// Connected peers to reach before publishing
    pub target_peers: usize,

    /// Port to listen on and to dial
    pub listen_port: u16,

    /// Topic every node joins
    pub topic: String,

    pub gossip: GossipParams,

    /// Size of each published message in bytes
    pub message_size: usize,

    /// Messages published by the publisher node
    pub message_count: usize,

    /// Pause before bootstrap so the rest of the fleet can start listening
    pub settle_delay: Duration,

    /// Deadline of a single connect attempt
    pub dial_timeout: Duration,

    pub rendezvous: Rendezvous,

    pub retry: RetryPolicy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            node_count: 5000,
            target_peers: 70,
            listen_port: LISTEN_PORT,
            topic: TOPIC_NAME.to_string(),
            gossip: GossipParams::default(),
            message_size: 32,
            message_count: 1,
            settle_delay: Duration::from_secs(30),
            dial_timeout: Duration::from_secs(30),
            rendezvous: Rendezvous::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BenchConfig {
    /// Create a new configuration builder
    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder::default()
    }

    /// Listen on every local IPv4 interface
    pub fn listen_address(&self) -> Multiaddr {
        Multiaddr::empty()
            .with(libp2p::multiaddr::Protocol::Ip4(std::net::Ipv4Addr::UNSPECIFIED))
            .with(libp2p::multiaddr::Protocol::Tcp(self.listen_port))
    }
}

impl fmt::Display for BenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Benchmark Configuration:")?;
        write_title_1(f, "Fleet")?;
        write_1(f, "Node count", &self.node_count)?;
        write_1(f, "Target peers", &self.target_peers)?;
        write_1(f, "Listen port", &self.listen_port)?;
        write_1(f, "Settle delay", &format_args!("{:?}", self.settle_delay))?;
        write_1(f, "Dial timeout", &format_args!("{:?}", self.dial_timeout))?;
        write_1(f, "Retry", &format_args!("{:?}", self.retry))?;
        write_title_1(f, "Gossip")?;
        write_1(f, "Topic", &self.topic)?;
        write_1(
            f,
            "Mesh degree",
            &format_args!("{} ({}..{})", self.gossip.mesh_n, self.gossip.mesh_n_low, self.gossip.mesh_n_high),
        )?;
        write_1(f, "Heartbeat", &format_args!("{:?}", self.gossip.heartbeat_interval))?;
        write_1(
            f,
            "History",
            &format_args!("{} (gossip {})", self.gossip.history_length, self.gossip.history_gossip),
        )?;
        write_title_1(f, "Publish")?;
        write_1(f, "Messages", &self.message_count)?;
        write_1(f, "Message size", &self.message_size)?;
        write_1(f, "Rendezvous", &self.rendezvous)?;

        Ok(())
    }
}

/// Builder for BenchConfig
#[derive(Debug, Default)]
pub struct BenchConfigBuilder {
    pub(crate) config: BenchConfig,
}
