use std::fmt;

/// Column holding the reading's Unix timestamp in seconds
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Column holding the frequency value
pub const VALUE_COLUMN: &str = "value";
/// Tag identifying the meter
pub const METER_TAG: &str = "meterid";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    /// Oldest first (store default)
    Ascending,
    /// Newest first
    Descending,
}

/// Select of `timestamp, value` for one meter
///
/// Rendered as InfluxQL through `Display`; other backends evaluate the fields
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub measurement: String,
    pub meter_id: String,
    /// Exclusive bounds on the `timestamp` field, Unix seconds
    pub timestamp_between: Option<(i64, i64)>,
    pub order: Order,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(measurement: impl Into<String>, meter_id: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            meter_id: meter_id.into(),
            timestamp_between: None,
            order: Order::Ascending,
            limit: None,
        }
    }

    pub fn between(mut self, start: i64, end: i64) -> Self {
        self.timestamp_between = Some((start, end));
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

fn quote_identifier(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT {}, {} FROM {} WHERE {} = {}",
            quote_identifier(TIMESTAMP_COLUMN),
            quote_identifier(VALUE_COLUMN),
            quote_identifier(&self.measurement),
            quote_identifier(METER_TAG),
            quote_string(&self.meter_id)
        )?;
        if let Some((start, end)) = self.timestamp_between {
            let ts = quote_identifier(TIMESTAMP_COLUMN);
            write!(f, " AND {} > {} AND {} < {}", ts, start, ts, end)?;
        }
        if self.order == Order::Descending {
            write!(f, " ORDER BY time DESC")?;
        }
        if let Some(n) = self.limit {
            write!(f, " LIMIT {}", n)?;
        }
        Ok(())
    }
}
