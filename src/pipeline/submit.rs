//! Submission of readings to the remote ingestion API
//!
//! `POST {host}:{port}/api/submit/{meter_id}` with an `X-API-Key` header and
//! a JSON body `{"Timestamp": ..., "Value": ...}`. Anything but 200 is a
//! rejection; the server may explain it with `{"Id": ..., "Message": ...}`.

use crate::config::{MeterConfig, NetworkConfig};
use crate::types::{ErrorMessage, Reading};
use async_trait::async_trait;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// What the server made of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Delivered,
    Rejected {
        status: u16,
        /// Decoded error body, if the server sent one
        error: Option<ErrorMessage>,
        raw: String,
    },
}

#[derive(Debug)]
pub enum SubmitError {
    /// Endpoint unreachable, timed out, or connection dropped
    Transport(String),
    /// Response arrived but its body could not be read
    Body(String),
    /// HTTP client could not be constructed
    Client(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Transport(e) => write!(f, "Error posting data: {}", e),
            SubmitError::Body(e) => write!(f, "Error getting post result data: {}", e),
            SubmitError::Client(e) => write!(f, "Cannot create HTTP client: {}", e),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Destination for validated readings
#[async_trait]
pub trait ReadingSubmitter: Send + Sync {
    async fn submit(&self, reading: &Reading) -> Result<SubmitOutcome, SubmitError>;

    /// Target description for logging
    fn endpoint(&self) -> &str;
}

/// Classify a response from the submission API
pub fn interpret_response(status: u16, body: &[u8]) -> SubmitOutcome {
    if status == 200 {
        return SubmitOutcome::Delivered;
    }
    SubmitOutcome::Rejected {
        status,
        error: serde_json::from_slice::<ErrorMessage>(body).ok(),
        raw: String::from_utf8_lossy(body).into_owned(),
    }
}

/// reqwest-backed submitter; one client (and connection pool) per worker pool
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpSubmitter {
    pub fn new(network: &NetworkConfig, meter: &MeterConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(network.timeout)
            .build()
            .map_err(|e| SubmitError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: network.submit_url(&meter.id),
            api_key: meter.key.clone(),
        })
    }
}

#[async_trait]
impl ReadingSubmitter for HttpSubmitter {
    async fn submit(&self, reading: &Reading) -> Result<SubmitOutcome, SubmitError> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(reading)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| SubmitError::Body(e.to_string()))?;

        Ok(interpret_response(status, &body))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
