//! Builder methods for BenchConfig.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{
    file::FileConfig,
    types::{BenchConfig, BenchConfigBuilder, Rendezvous},
};
use crate::{bootstrap::RetryPolicy, error::ConfigError, pubsub::GossipParams};

/// Backoff ceiling used when only a base delay is configured
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

impl BenchConfigBuilder {
    /// Validate and build the configuration
    pub fn build(self) -> Result<BenchConfig, ConfigError> {
        let config = self.config;
        let invalid = |reason: &str| Err(ConfigError::Invalid(reason.to_string()));

        if config.node_count == 0 {
            return invalid("count must be at least 1");
        }
        if config.topic.is_empty() {
            return invalid("topic must not be empty");
        }
        if config.gossip.mesh_n == 0 {
            return invalid("mesh degree must be at least 1");
        }
        if config.gossip.heartbeat_interval.is_zero() {
            return invalid("heartbeat interval must be positive");
        }
        if config.gossip.history_gossip > config.gossip.history_length {
            return invalid("history gossip must not exceed history length");
        }
        if config.gossip.outbound_queue_size == 0 || config.gossip.validate_queue_size == 0 {
            return invalid("queue sizes must be at least 1");
        }
        if config.message_size == 0 {
            return invalid("message size must be at least 1 byte");
        }
        if config.message_size > config.gossip.max_transmit_size {
            return invalid("message size exceeds the maximum transmit size");
        }
        if config.dial_timeout.is_zero() {
            return invalid("dial timeout must be positive");
        }

        Ok(config)
    }

    /// Overlay every value present in a config file
    pub fn apply_file(mut self, file: &FileConfig) -> Self {
        if let Some(count) = file.count {
            self = self.node_count(count);
        }
        if let Some(target) = file.target {
            self = self.target_peers(target);
        }
        if let Some(degree) = file.degree {
            self = self.mesh_degree(degree);
        }
        if let Some(interval_ms) = file.interval_ms {
            self = self.heartbeat_interval(Duration::from_millis(interval_ms));
        }
        if let Some(size) = file.size {
            self = self.message_size(size);
        }
        if let Some(messages) = file.messages {
            self = self.message_count(messages);
        }
        if let Some(port) = file.listen_port {
            self = self.listen_port(port);
        }
        if let Some(topic) = &file.topic {
            self = self.topic(topic.clone());
        }
        if let Some(settle_secs) = file.settle_secs {
            self = self.settle_delay(Duration::from_secs(settle_secs));
        }
        if let Some(dial_timeout_ms) = file.dial_timeout_ms {
            self = self.dial_timeout(Duration::from_millis(dial_timeout_ms));
        }
        if let Some(after_secs) = file.publish_after_secs {
            self = self.publish_after(Duration::from_secs(after_secs));
        }
        if let Some(at) = file.publish_at {
            self = self.publish_at(at);
        }
        if let Some(backoff_ms) = file.backoff_ms {
            let max = file.backoff_max_ms.map(Duration::from_millis).unwrap_or(DEFAULT_BACKOFF_MAX);
            self = self.backoff(Duration::from_millis(backoff_ms), max);
        }
        if let Some(max_failures) = file.max_failures {
            self = self.max_failures(max_failures);
        }
        if let Some(history_length) = file.history_length {
            self.config.gossip.history_length = history_length;
        }
        if let Some(history_gossip) = file.history_gossip {
            self.config.gossip.history_gossip = history_gossip;
        }
        if let Some(max_transmit_size) = file.max_transmit_size {
            self.config.gossip.max_transmit_size = max_transmit_size;
        }
        if let Some(outbound_queue_size) = file.outbound_queue_size {
            self.config.gossip.outbound_queue_size = outbound_queue_size;
        }
        if let Some(validate_queue_size) = file.validate_queue_size {
            self.config.gossip.validate_queue_size = validate_queue_size;
        }
        self
    }

    pub fn node_count(mut self, count: u64) -> Self {
        self.config.node_count = count;
        self
    }

    pub fn target_peers(mut self, target: usize) -> Self {
        self.config.target_peers = target;
        self
    }

    /// Set the mesh degree, deriving the low and high watermarks from it
    pub fn mesh_degree(mut self, degree: usize) -> Self {
        let heartbeat = self.config.gossip.heartbeat_interval;
        let derived = GossipParams::with_degree(degree, heartbeat);
        self.config.gossip.mesh_n_low = derived.mesh_n_low;
        self.config.gossip.mesh_n = derived.mesh_n;
        self.config.gossip.mesh_n_high = derived.mesh_n_high;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.gossip.heartbeat_interval = interval;
        self
    }

    /// Replace the whole gossip parameter set
    pub fn gossip(mut self, gossip: GossipParams) -> Self {
        self.config.gossip = gossip;
        self
    }

    pub fn message_size(mut self, size: usize) -> Self {
        self.config.message_size = size;
        self
    }

    pub fn message_count(mut self, count: usize) -> Self {
        self.config.message_count = count;
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.listen_port = port;
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topic = topic.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.config.dial_timeout = timeout;
        self
    }

    /// Publish at a fixed wall-clock instant
    pub fn publish_at(mut self, at: DateTime<Utc>) -> Self {
        self.config.rendezvous = Rendezvous::At(at);
        self
    }

    /// Publish a fixed delay after process start
    pub fn publish_after(mut self, delay: Duration) -> Self {
        self.config.rendezvous = Rendezvous::AfterStart(delay);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.retry = self.config.retry.with_backoff(base, max);
        self
    }

    pub fn max_failures(mut self, max_failures: u64) -> Self {
        self.config.retry = self.config.retry.with_max_failures(max_failures);
        self
    }
}
