//! Configuration from environment variables
//!
//! Every section has a `from_env()` constructor; `.env` files are honoured by
//! the binaries through `dotenv` before these run. Sections are also
//! constructible from an arbitrary lookup function so tests never touch the
//! process environment.

use std::env;
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Source of configuration values keyed by variable name
pub trait Lookup: Fn(&str) -> Option<String> {}
impl<F: Fn(&str) -> Option<String>> Lookup for F {}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required(lookup: &impl Lookup, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parsed_or<T: FromStr>(lookup: &impl Lookup, key: &str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a valid number, got '{}'", key, raw))
        }),
    }
}

fn flag(lookup: &impl Lookup, key: &str) -> bool {
    lookup(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Identity of the meter this provider reports for
#[derive(Debug, Clone)]
pub struct MeterConfig {
    pub id: String,
    pub key: String,
}

/// Remote submission endpoint
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Host including scheme, e.g. `https://netzsin.us`
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl NetworkConfig {
    /// `{host}:{port}/api/submit/{meter_id}`
    pub fn submit_url(&self, meter_id: &str) -> String {
        format!("{}:{}/api/submit/{}", self.host, self.port, meter_id)
    }
}

/// Serial device the hardware adapter reads from
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub path: String,
    /// Line speed; the port is expected to be configured before we open it
    pub baud: u32,
}

/// Thresholds consumed by the validator
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    pub spike_threshold: f64,
    pub warmup: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            low_hz: 48.0,
            high_hz: 52.0,
            spike_threshold: 0.5,
            warmup: Duration::from_secs(2),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.low_hz < self.high_hz) {
            return Err(ConfigError::InvalidValue(format!(
                "plausible range is empty: [{}, {}]",
                self.low_hz, self.high_hz
            )));
        }
        if !(self.spike_threshold > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "spike threshold must be positive, got {}",
                self.spike_threshold
            )));
        }
        if Instant::now().checked_add(self.warmup).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "warmup of {}s cannot be scheduled",
                self.warmup.as_secs()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub seed: Option<u64>,
    pub tick: Duration,
}

/// Distribution channel and worker pool sizing
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub channel_buffer: usize,
    pub workers: usize,
}

/// Connection parameters for the InfluxDB store
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub database: String,
}

impl InfluxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            host: lookup("INFLUX_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parsed_or(lookup, "INFLUX_PORT", 8086)?,
            user: lookup("INFLUX_USER").unwrap_or_default(),
            pass: lookup("INFLUX_PASS").unwrap_or_default(),
            database: lookup("INFLUX_DATABASE").unwrap_or_else(|| "defluxio".to_string()),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Everything the acquisition pipeline needs
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub meter: MeterConfig,
    pub network: NetworkConfig,
    pub device: DeviceConfig,
    pub validation: ValidationConfig,
    pub simulation: SimulationConfig,
    pub pipeline: PipelineConfig,
}

impl ProviderConfig {
    /// Load configuration from environment variables
    ///
    /// `METER_ID` and `METER_KEY` are required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let meter = MeterConfig {
            id: required(lookup, "METER_ID")?,
            key: required(lookup, "METER_KEY")?,
        };

        let host = lookup("SUBMIT_HOST").unwrap_or_else(|| "http://localhost".to_string());
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SUBMIT_HOST must start with http:// or https://".to_string(),
            ));
        }
        let network = NetworkConfig {
            host,
            port: parsed_or(lookup, "SUBMIT_PORT", 8080)?,
            timeout: Duration::from_secs(parsed_or(lookup, "SUBMIT_TIMEOUT_SECS", 10)?),
        };

        let device = DeviceConfig {
            path: lookup("DEVICE_PATH").unwrap_or_else(|| "/dev/ttyACM0".to_string()),
            baud: parsed_or(lookup, "DEVICE_BAUD", 115_200)?,
        };

        let defaults = ValidationConfig::default();
        let warmup_secs: f64 = parsed_or(lookup, "WARMUP_SECS", defaults.warmup.as_secs_f64())?;
        let warmup = Duration::try_from_secs_f64(warmup_secs).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "WARMUP_SECS must be a non-negative number of seconds, got {}: {}",
                warmup_secs, e
            ))
        })?;
        let validation = ValidationConfig {
            low_hz: parsed_or(lookup, "RANGE_LOW_HZ", defaults.low_hz)?,
            high_hz: parsed_or(lookup, "RANGE_HIGH_HZ", defaults.high_hz)?,
            spike_threshold: parsed_or(lookup, "SPIKE_THRESHOLD", defaults.spike_threshold)?,
            warmup,
        };
        validation.validate()?;

        let tick_ms: u64 = parsed_or(lookup, "SIMULATION_TICK_MS", 2_000)?;
        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SIMULATION_TICK_MS must be at least 1".to_string(),
            ));
        }
        let simulation = SimulationConfig {
            enabled: flag(lookup, "SIMULATION_MODE"),
            seed: match lookup("SIMULATION_SEED") {
                Some(_) => Some(parsed_or(lookup, "SIMULATION_SEED", 0u64)?),
                None => None,
            },
            tick: Duration::from_millis(tick_ms),
        };

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pipeline = PipelineConfig {
            channel_buffer: parsed_or(lookup, "CHANNEL_BUFFER", 1_024)?,
            workers: parsed_or(lookup, "PUSH_WORKERS", default_workers)?,
        };
        if pipeline.channel_buffer == 0 || pipeline.workers == 0 {
            return Err(ConfigError::InvalidValue(
                "CHANNEL_BUFFER and PUSH_WORKERS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            meter,
            network,
            device,
            validation,
            simulation,
            pipeline,
        })
    }
}
