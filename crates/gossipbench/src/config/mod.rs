//! Benchmark configuration.
//!
//! Defaults, an optional TOML file and command-line flags are layered into a
//! single immutable [`BenchConfig`] that every component borrows.

mod file;
mod methods;
mod types;

pub use file::FileConfig;
pub use methods::DEFAULT_BACKOFF_MAX;
pub use types::{BenchConfig, BenchConfigBuilder, Rendezvous};
