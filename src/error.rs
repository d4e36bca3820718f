//! Crate-wide error type
//!
//! Every failure that leaves a component is folded into [`ProviderError`].
//! Each variant is either recoverable (log it and carry on with the next
//! sample or query) or fatal (the binary logs it and exits). Only the
//! binaries make the exit decision; library code never terminates the
//! process.

use crate::config::ConfigError;
use crate::pipeline::submit::SubmitError;
use crate::timeseries::decode::DecodeError;
use crate::timeseries::store::StoreError;

#[derive(Debug)]
pub enum ProviderError {
    /// Configuration could not be loaded
    Config(ConfigError),
    /// The submission client could not be built
    Submitter(SubmitError),
    /// The measurement source could not be opened
    SourceUnavailable { path: String, source: std::io::Error },
    /// The time-series store did not answer the startup catalog query
    StoreUnreachable(StoreError),
    /// The configured database is not in the store's catalog
    DatabaseMissing(String),
    /// A query that must produce one reading produced none
    NoData(String),
    /// A single store operation failed
    Store(StoreError),
    /// Query rows did not match the expected shape
    Decode(DecodeError),
}

impl ProviderError {
    /// Whether the process must stop after logging this error
    pub fn is_fatal(&self) -> bool {
        match self {
            ProviderError::Config(_)
            | ProviderError::Submitter(_)
            | ProviderError::SourceUnavailable { .. }
            | ProviderError::StoreUnreachable(_)
            | ProviderError::DatabaseMissing(_)
            | ProviderError::NoData(_) => true,
            ProviderError::Store(_) | ProviderError::Decode(_) => false,
        }
    }
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::Config(err)
    }
}

impl From<SubmitError> for ProviderError {
    fn from(err: SubmitError) -> Self {
        ProviderError::Submitter(err)
    }
}

impl From<StoreError> for ProviderError {
    fn from(err: StoreError) -> Self {
        ProviderError::Store(err)
    }
}

impl From<DecodeError> for ProviderError {
    fn from(err: DecodeError) -> Self {
        ProviderError::Decode(err)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Config(e) => write!(f, "Configuration error: {}", e),
            ProviderError::Submitter(e) => write!(f, "{}", e),
            ProviderError::SourceUnavailable { path, source } => {
                write!(f, "Cannot open data source {}: {}", path, source)
            }
            ProviderError::StoreUnreachable(e) => {
                write!(f, "Cannot retrieve list of databases: {}", e)
            }
            ProviderError::DatabaseMissing(db) => {
                write!(f, "Did not find database \"{}\" - please create it", db)
            }
            ProviderError::NoData(meter_id) => {
                write!(f, "No readings stored for meter {}", meter_id)
            }
            ProviderError::Store(e) => write!(f, "Store error: {}", e),
            ProviderError::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Config(e) => Some(e),
            ProviderError::Submitter(e) => Some(e),
            ProviderError::SourceUnavailable { source, .. } => Some(source),
            ProviderError::StoreUnreachable(e) | ProviderError::Store(e) => Some(e),
            ProviderError::Decode(e) => Some(e),
            ProviderError::DatabaseMissing(_) | ProviderError::NoData(_) => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
