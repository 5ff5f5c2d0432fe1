use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use gossipbench::{config::DEFAULT_BACKOFF_MAX, BenchConfig, ConfigError, FileConfig};

/// Gossipsub benchmark node
///
/// Derives its identity from the `node<N>` hostname, connects to a random
/// subset of the fleet and takes part in a synchronized publish.
#[derive(Parser, Debug)]
#[command(name = "gossipbench-node")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Total number of nodes in the fleet [default: 5000]
    #[arg(long)]
    pub count: Option<u64>,

    /// Target number of connected peers [default: 70]
    #[arg(long)]
    pub target: Option<usize>,

    /// Gossip mesh degree D, low is D-2 and high is D+4 [default: 8]
    #[arg(short = 'D', long)]
    pub degree: Option<usize>,

    /// Heartbeat interval in milliseconds [default: 700]
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Size of each published message in bytes [default: 32]
    #[arg(long)]
    pub size: Option<usize>,

    /// Number of messages to publish [default: 1]
    #[arg(short = 'n', value_name = "N")]
    pub messages: Option<usize>,

    /// Seconds to wait for the fleet to come up before bootstrapping [default: 30]
    #[arg(long, value_name = "SECS")]
    pub settle_secs: Option<u64>,

    /// Deadline for a single connection attempt [default: 30000]
    #[arg(long, value_name = "MS")]
    pub dial_timeout_ms: Option<u64>,

    /// Absolute publish instant (RFC 3339)
    #[arg(long, conflicts_with = "publish_after_secs")]
    pub publish_at: Option<DateTime<Utc>>,

    /// Publish this many seconds after process start [default: 0]
    #[arg(long, value_name = "SECS")]
    pub publish_after_secs: Option<u64>,

    /// Give up bootstrapping after this many failed connection attempts
    #[arg(long)]
    pub max_attempts: Option<u64>,

    /// Base delay of the exponential backoff between failed attempts
    #[arg(long, value_name = "MS")]
    pub backoff_ms: Option<u64>,

    /// Ceiling of the exponential backoff
    #[arg(long, value_name = "MS", requires = "backoff_ms")]
    pub backoff_max_ms: Option<u64>,

    /// Use this hostname instead of the system one
    #[arg(long)]
    pub hostname: Option<String>,

    /// Path to a configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Layer defaults, the config file and explicit flags, in that order
    pub fn bench_config(&self) -> Result<BenchConfig> {
        let mut builder = BenchConfig::builder();

        if let Some(path) = &self.config {
            let file = FileConfig::load(path)?;
            builder = builder.apply_file(&file);
        }

        if let Some(count) = self.count {
            builder = builder.node_count(count);
        }
        if let Some(target) = self.target {
            builder = builder.target_peers(target);
        }
        if let Some(degree) = self.degree {
            builder = builder.mesh_degree(degree);
        }
        if let Some(interval) = self.interval {
            builder = builder.heartbeat_interval(Duration::from_millis(interval));
        }
        if let Some(size) = self.size {
            builder = builder.message_size(size);
        }
        if let Some(messages) = self.messages {
            builder = builder.message_count(messages);
        }
        if let Some(settle_secs) = self.settle_secs {
            builder = builder.settle_delay(Duration::from_secs(settle_secs));
        }
        if let Some(dial_timeout_ms) = self.dial_timeout_ms {
            builder = builder.dial_timeout(Duration::from_millis(dial_timeout_ms));
        }
        if let Some(after_secs) = self.publish_after_secs {
            builder = builder.publish_after(Duration::from_secs(after_secs));
        }
        if let Some(at) = self.publish_at {
            builder = builder.publish_at(at);
        }
        if let Some(backoff_ms) = self.backoff_ms {
            let max = self.backoff_max_ms.map(Duration::from_millis).unwrap_or(DEFAULT_BACKOFF_MAX);
            builder = builder.backoff(Duration::from_millis(backoff_ms), max);
        }
        if let Some(max_attempts) = self.max_attempts {
            builder = builder.max_failures(max_attempts);
        }

        Ok(builder.build()?)
    }

    /// The `--hostname` override, or the system hostname
    pub fn hostname(&self) -> Result<String> {
        if let Some(hostname) = &self.hostname {
            return Ok(hostname.clone());
        }

        let hostname = hostname::get().map_err(ConfigError::HostnameUnavailable)?;
        hostname
            .into_string()
            .map_err(|raw| ConfigError::Hostname { hostname: raw.to_string_lossy().into_owned() })
            .context("system hostname is not valid UTF-8")
    }
}
