//! In-process store
//!
//! Evaluates `SelectQuery` directly over stored points and answers in the
//! same generic row shape as InfluxDB, so the client's decode path is the
//! same for both backends. Guarded by an `RwLock`; safe to share.

use crate::timeseries::query::{Order, SelectQuery, METER_TAG, TIMESTAMP_COLUMN, VALUE_COLUMN};
use crate::timeseries::store::{FieldValue, Point, Series, StoreError, TimeSeriesStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, Vec<Point>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given databases already created
    pub fn with_databases(names: &[&str]) -> Self {
        let store = Self::new();
        for name in names {
            store.create_database(name);
        }
        store
    }

    pub fn create_database(&self, name: &str) {
        if let Ok(mut dbs) = self.databases.write() {
            dbs.entry(name.to_string()).or_default();
        }
    }

    /// Number of points written to `database`
    pub fn point_count(&self, database: &str) -> usize {
        self.databases
            .read()
            .ok()
            .and_then(|dbs| dbs.get(database).map(Vec::len))
            .unwrap_or(0)
    }

    fn poisoned() -> StoreError {
        StoreError::Transport("memory store lock poisoned".to_string())
    }
}

fn field_as_json(value: Option<&FieldValue>) -> Value {
    match value {
        Some(FieldValue::Float(f)) => json!(f),
        Some(FieldValue::Integer(i)) => json!(i),
        None => Value::Null,
    }
}

fn timestamp_field(point: &Point) -> Option<i64> {
    match point.field(TIMESTAMP_COLUMN)? {
        FieldValue::Integer(i) => Some(*i),
        FieldValue::Float(_) => None,
    }
}

fn matches(point: &Point, query: &SelectQuery) -> bool {
    if point.measurement != query.measurement || point.tag(METER_TAG) != Some(query.meter_id.as_str()) {
        return false;
    }
    match query.timestamp_between {
        None => true,
        Some((start, end)) => timestamp_field(point).is_some_and(|ts| ts > start && ts < end),
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn write_point(&self, database: &str, point: &Point) -> Result<(), StoreError> {
        let mut dbs = self.databases.write().map_err(|_| Self::poisoned())?;
        let points = dbs.get_mut(database).ok_or_else(|| StoreError::Status {
            code: 404,
            body: format!("database not found: {}", database),
        })?;
        points.push(point.clone());
        Ok(())
    }

    async fn run_query(&self, query: &SelectQuery, database: &str) -> Result<Vec<Series>, StoreError> {
        let dbs = self.databases.read().map_err(|_| Self::poisoned())?;
        let points = dbs
            .get(database)
            .ok_or_else(|| StoreError::Query(format!("database not found: {}", database)))?;

        let mut selected: Vec<&Point> = points.iter().filter(|p| matches(p, query)).collect();
        // Stable sort keeps write order for equal times
        selected.sort_by_key(|p| p.time);
        if query.order == Order::Descending {
            selected.reverse();
        }
        if let Some(n) = query.limit {
            selected.truncate(n);
        }

        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let values = selected
            .into_iter()
            .map(|p| {
                vec![
                    json!(p.time.to_rfc3339()),
                    field_as_json(p.field(TIMESTAMP_COLUMN)),
                    field_as_json(p.field(VALUE_COLUMN)),
                ]
            })
            .collect();

        Ok(vec![Series {
            name: query.measurement.clone(),
            columns: vec![
                "time".to_string(),
                TIMESTAMP_COLUMN.to_string(),
                VALUE_COLUMN.to_string(),
            ],
            values,
        }])
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let dbs = self.databases.read().map_err(|_| Self::poisoned())?;
        let mut names: Vec<String> = dbs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
