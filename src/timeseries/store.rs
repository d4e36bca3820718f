//! Storage seam for the time-series client
//!
//! The client only needs three operations from a store: write one point,
//! run a select over one meter's series, and list the database catalog.
//! Implementations must be safe to share between concurrent readers and
//! writers (`Send + Sync`).

use crate::timeseries::query::SelectQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug)]
pub enum StoreError {
    /// Store could not be reached
    Transport(String),
    /// Store answered with a non-success status
    Status { code: u16, body: String },
    /// Store reported an error inside a well-formed response
    Query(String),
    /// Response body was not in the expected format
    Protocol(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Transport(e) => write!(f, "transport error: {}", e),
            StoreError::Status { code, body } => write!(f, "store returned {}: {}", code, body),
            StoreError::Query(e) => write!(f, "query failed: {}", e),
            StoreError::Protocol(e) => write!(f, "unexpected response: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// A value stored in a point field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

/// One point to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// One series of a query result, in the store's generic tabular shape
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write_point(&self, database: &str, point: &Point) -> Result<(), StoreError>;

    async fn run_query(&self, query: &SelectQuery, database: &str) -> Result<Vec<Series>, StoreError>;

    async fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    /// Backend name for logging
    fn backend_type(&self) -> &'static str;
}
