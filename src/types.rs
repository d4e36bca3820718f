use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped frequency measurement
///
/// Serialized with the field names the submission API expects:
/// `{"Timestamp": "<RFC3339>", "Value": 49.98}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Stamp a value with the current wall-clock time
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now(), value)
    }
}

/// A reading together with the meter it originated from
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub meter_id: String,
    pub reading: Reading,
}

impl MeterReading {
    pub fn new(meter_id: impl Into<String>, reading: Reading) -> Self {
        Self {
            meter_id: meter_id.into(),
            reading,
        }
    }
}

/// Sort readings by timestamp (second resolution, ascending)
///
/// Stable, so readings within the same second keep their relative order.
pub fn sort_by_timestamp(readings: &mut [MeterReading]) {
    readings.sort_by_key(|r| r.reading.timestamp.timestamp());
}

/// Error body returned by the submission API on non-200 responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Message")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reading_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let reading = Reading::new(ts, 49.98);

        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["Value"], 49.98);
        assert_eq!(json["Timestamp"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_error_message_decodes_pascal_case() {
        let msg: ErrorMessage =
            serde_json::from_str(r#"{"Id":"E1","Message":"bad key"}"#).unwrap();
        assert_eq!(msg.id, "E1");
        assert_eq!(msg.message, "bad key");
    }

    #[test]
    fn test_sort_by_timestamp() {
        let mk = |secs: i64, value: f64| {
            MeterReading::new("m1", Reading::new(Utc.timestamp_opt(secs, 0).unwrap(), value))
        };
        let mut readings = vec![mk(30, 3.0), mk(10, 1.0), mk(20, 2.0)];

        sort_by_timestamp(&mut readings);

        let values: Vec<f64> = readings.iter().map(|r| r.reading.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
