//! Error types for gossipbench.
//!
//! Startup errors (`ConfigError`, `IdentityError`, `StartupError`) are fatal for
//! the process. `ResolutionError` and dial failures are absorbed by the
//! bootstrapper, publish failures by the publish coordinator.

use std::{io, path::PathBuf, time::Duration};

use libp2p::PeerId;
use thiserror::Error;

/// Errors raised while building or loading the benchmark configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The hostname does not follow the `node<N>` convention.
    #[error("hostname '{hostname}' does not match node<ordinal>")]
    Hostname { hostname: String },

    /// The system hostname could not be read.
    #[error("failed to read system hostname: {0}")]
    HostnameUnavailable(#[source] io::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for this harness.
    #[error("failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The cryptographic library rejected a derived seed.
#[derive(Debug, Error)]
#[error("ed25519 key derivation failed for ordinal {ordinal}: {source}")]
pub struct IdentityError {
    pub ordinal: u64,
    #[source]
    pub source: libp2p::identity::DecodingError,
}

/// Failure to turn an ordinal into a dialable endpoint.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to resolve {hostname}: {source}")]
    Lookup {
        hostname: String,
        #[source]
        source: io::Error,
    },

    #[error("{hostname} resolved to no addresses")]
    NoAddresses { hostname: String },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("failed to compose endpoint '{endpoint}': {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: libp2p::multiaddr::Error,
    },
}

/// Errors reported by the transport host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to build transport: {0}")]
    Transport(String),

    #[error("failed to listen on {address}: {reason}")]
    Listen { address: String, reason: String },

    #[error("failed to connect to {peer}: {reason}")]
    Dial { peer: PeerId, reason: String },

    #[error("connecting to {peer} timed out after {deadline:?}")]
    Timeout { peer: PeerId, deadline: Duration },

    #[error("network event loop has shut down")]
    Shutdown,
}

/// Errors reported by the pub/sub router.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("failed to build gossipsub router: {0}")]
    Router(String),

    #[error("failed to join topic '{topic}': {reason}")]
    Join { topic: String, reason: String },

    #[error("failed to subscribe to topic '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("failed to publish to topic '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscription to topic '{topic}' closed")]
    Closed { topic: String },

    #[error("network event loop has shut down")]
    Shutdown,
}

/// Fatal errors while constructing the libp2p node.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    PubSub(#[from] PubSubError),
}

/// The mesh bootstrapper gave up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Only reachable with a bounded retry policy.
    #[error("bootstrap gave up after {failures} failures with {connected}/{target} peers")]
    AttemptsExhausted {
        failures: u64,
        connected: usize,
        target: usize,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

/// The delivery loop stopped because the subscription failed.
#[derive(Debug, Error)]
#[error("delivery loop stopped after {delivered} messages: {source}")]
pub struct DeliveryError {
    pub delivered: u64,
    #[source]
    pub source: PubSubError,
}

/// Errors from a complete node run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("delivery task failed: {0}")]
    DeliveryTask(#[from] tokio::task::JoinError),
}
