//! InfluxDB 1.x HTTP backend
//!
//! Writes go to `/write` as Line Protocol with millisecond precision:
//!
//! ```text
//! measurement,tag1=val1 field1=1.5,field2=42i 1420070400000
//! ```
//!
//! Queries go to `/query` and come back as
//! `{"results":[{"series":[{"name":..,"columns":[..],"values":[[..]]}]}]}`.
//!
//! `reqwest::Client` pools connections and is safe to share, so one
//! `InfluxStore` serves concurrent reads and writes.

use crate::config::InfluxConfig;
use crate::timeseries::query::SelectQuery;
use crate::timeseries::store::{FieldValue, Point, Series, StoreError, TimeSeriesStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

impl FieldValue {
    /// Float as-is, integer with an `i` suffix
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
        }
    }
}

/// Escape commas, spaces (and `=` for keys and tag values)
fn escape(s: &str, escape_equals: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ',' | ' ' => out.push('\\'),
            '=' if escape_equals => out.push('\\'),
            _ => {}
        }
        out.push(c);
    }
    out
}

impl Point {
    /// Render as one Line Protocol line with a millisecond timestamp
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, false);

        let mut tags: Vec<_> = self.tags.iter().collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in tags {
            line.push(',');
            line.push_str(&escape(key, true));
            line.push('=');
            line.push_str(&escape(value, true));
        }

        line.push(' ');
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape(key, true), value.to_line_protocol()))
            .collect();
        line.push_str(&fields.join(","));

        line.push(' ');
        line.push_str(&self.time.timestamp_millis().to_string());
        line
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

/// Pull the series of the first statement out of a `/query` response body
pub fn parse_query_response(body: &[u8]) -> Result<Vec<Series>, StoreError> {
    let response: QueryResponse =
        serde_json::from_slice(body).map_err(|e| StoreError::Protocol(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(StoreError::Query(error));
    }
    let first = match response.results.into_iter().next() {
        Some(first) => first,
        None => return Ok(Vec::new()),
    };
    if let Some(error) = first.error {
        return Err(StoreError::Query(error));
    }
    Ok(first.series)
}

/// Database names out of a `SHOW DATABASES` result
pub fn database_names(series: &[Series]) -> Vec<String> {
    series
        .iter()
        .filter(|s| s.name == "databases")
        .flat_map(|s| s.values.iter())
        .flat_map(|row| row.iter())
        .filter_map(|cell| cell.as_str().map(str::to_string))
        .collect()
}

pub struct InfluxStore {
    client: reqwest::Client,
    base_url: String,
    user: String,
    pass: String,
}

impl InfluxStore {
    pub fn new(config: &InfluxConfig) -> Result<Self, StoreError> {
        Self::with_base_url(config.base_url(), &config.user, &config.pass)
    }

    pub fn with_base_url(base_url: impl Into<String>, user: &str, pass: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.user.is_empty() {
            request
        } else {
            request.basic_auth(&self.user, Some(&self.pass))
        }
    }

    async fn query_raw(&self, command: &str, database: Option<&str>) -> Result<Vec<Series>, StoreError> {
        let mut params = vec![("q", command)];
        if let Some(db) = database {
            params.push(("db", db));
        }

        let response = self
            .authorize(self.client.get(format!("{}/query", self.base_url)))
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        // 400 still carries a JSON error body worth surfacing
        if !status.is_success() && status.as_u16() != 400 {
            return Err(StoreError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_query_response(&body)
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn write_point(&self, database: &str, point: &Point) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.post(format!("{}/write", self.base_url)))
            .query(&[("db", database), ("precision", "ms")])
            .body(point.to_line_protocol())
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn run_query(&self, query: &SelectQuery, database: &str) -> Result<Vec<Series>, StoreError> {
        let command = query.to_string();
        log::debug!("Running query >{}<", command);
        self.query_raw(&command, Some(database)).await
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let series = self.query_raw("SHOW DATABASES", None).await?;
        Ok(database_names(&series))
    }

    fn backend_type(&self) -> &'static str {
        "InfluxDB"
    }
}
