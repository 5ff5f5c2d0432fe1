use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer, filter::EnvFilter, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

/// Microsecond UTC timestamps so receive times of different nodes line up
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Install the global subscriber, panicking if one is already set
pub fn init_tracing() {
    if let Err(error) = try_init_tracing() {
        panic!("failed to install tracing subscriber: {error}");
    }
}

/// Install the global subscriber
///
/// Filtering follows `RUST_LOG` (default `info`); `RUST_LOG_FORMAT=json`
/// switches from compact lines to JSON that carries the current span fields.
pub fn try_init_tracing() -> Result<(), TryInitError> {
    initialize_tracing(LevelFilter::INFO)
}

fn initialize_tracing(level: LevelFilter) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT")
        .inspect_err(|error| {
            warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
        })
        .unwrap_or_default();

    let timer = ChronoUtc::new(TIMESTAMP_FORMAT.to_string());
    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_timer(timer)
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_timer(timer)
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).try_init()
}
