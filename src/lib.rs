//! Grid frequency provider
//!
//! Reads frequency samples from a measurement board (or a simulator),
//! filters out implausible values and sensor spikes, and pushes accepted
//! readings to the submission API from a pool of workers. The `timeseries`
//! module gives read/write access to stored readings.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod timeseries;
pub mod types;

pub use config::{ConfigError, ProviderConfig};
pub use error::{ProviderError, ProviderResult};
pub use types::{MeterReading, Reading};

/// Initialise stderr logging with `info` as the default filter
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}
