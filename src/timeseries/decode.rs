//! Row decoding for query results
//!
//! Stores hand back rows as untyped JSON cells. Columns are located by name
//! and every cell is coerced explicitly; anything that does not fit fails
//! the whole query with a `DecodeError` instead of producing a bogus reading.

use crate::timeseries::query::{TIMESTAMP_COLUMN, VALUE_COLUMN};
use crate::timeseries::store::Series;
use crate::types::{MeterReading, Reading};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// Series lacks a required column
    MissingColumn(String),
    /// Row has fewer cells than the header
    ShortRow { row: usize, expected: usize, got: usize },
    /// Cell is not a number of the expected kind
    NotANumber { column: String, row: usize, cell: String },
    /// Timestamp cannot be represented as an instant
    TimestampOutOfRange(i64),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingColumn(c) => write!(f, "missing column '{}'", c),
            DecodeError::ShortRow { row, expected, got } => {
                write!(f, "row {} has {} cells, expected {}", row, got, expected)
            }
            DecodeError::NotANumber { column, row, cell } => {
                write!(f, "row {} column '{}' is not numeric: {}", row, column, cell)
            }
            DecodeError::TimestampOutOfRange(ts) => write!(f, "timestamp {} out of range", ts),
        }
    }
}

impl std::error::Error for DecodeError {}

fn column_index(series: &Series, name: &str) -> Result<usize, DecodeError> {
    series
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| DecodeError::MissingColumn(name.to_string()))
}

fn cell<'a>(row: &'a [Value], idx: usize, row_no: usize, width: usize) -> Result<&'a Value, DecodeError> {
    row.get(idx).ok_or(DecodeError::ShortRow {
        row: row_no,
        expected: width,
        got: row.len(),
    })
}

fn not_a_number(column: &str, row: usize, cell: &Value) -> DecodeError {
    DecodeError::NotANumber {
        column: column.to_string(),
        row,
        cell: cell.to_string(),
    }
}

/// Integer seconds; whole-valued floats are accepted since some stores
/// return every number as a float
fn as_unix_seconds(value: &Value, row: usize) -> Result<i64, DecodeError> {
    if let Some(secs) = value.as_i64() {
        return Ok(secs);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(not_a_number(TIMESTAMP_COLUMN, row, value)),
    }
}

fn as_frequency(value: &Value, row: usize) -> Result<f64, DecodeError> {
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| not_a_number(VALUE_COLUMN, row, value))
}

/// Decode every row of every series into readings for `meter_id`
///
/// Row order is preserved.
pub fn decode_readings(meter_id: &str, series: &[Series]) -> Result<Vec<MeterReading>, DecodeError> {
    let mut readings = Vec::new();

    for s in series {
        let ts_idx = column_index(s, TIMESTAMP_COLUMN)?;
        let value_idx = column_index(s, VALUE_COLUMN)?;
        let width = s.columns.len();

        for (row_no, row) in s.values.iter().enumerate() {
            let secs = as_unix_seconds(cell(row, ts_idx, row_no, width)?, row_no)?;
            let value = as_frequency(cell(row, value_idx, row_no, width)?, row_no)?;
            let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or(DecodeError::TimestampOutOfRange(secs))?;

            log::debug!("T: {}, F: {:.3}", secs, value);
            readings.push(MeterReading::new(meter_id, Reading::new(timestamp, value)));
        }
    }

    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn series(columns: &[&str], values: Vec<Vec<Value>>) -> Series {
        Series {
            name: "defluxio".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    #[test]
    fn test_decodes_influx_shaped_rows() {
        let s = series(
            &["time", "timestamp", "value"],
            vec![
                vec![json!("2015-01-01T00:00:00Z"), json!(1420070400), json!(50.012)],
                vec![json!("2015-01-01T00:00:02Z"), json!(1420070402), json!(50)],
            ],
        );

        let readings = decode_readings("m1", &[s]).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].meter_id, "m1");
        assert_eq!(readings[0].reading.timestamp.timestamp(), 1420070400);
        assert_eq!(readings[0].reading.value, 50.012);
        assert_eq!(readings[1].reading.value, 50.0);
    }

    #[test]
    fn test_columns_located_by_name() {
        let s = series(&["value", "timestamp"], vec![vec![json!(49.9), json!(10)]]);

        let readings = decode_readings("m1", &[s]).unwrap();
        assert_eq!(readings[0].reading.value, 49.9);
        assert_eq!(readings[0].reading.timestamp.timestamp(), 10);
    }

    #[test]
    fn test_whole_float_timestamp_accepted() {
        let s = series(&["timestamp", "value"], vec![vec![json!(1420070400.0), json!(50.0)]]);
        assert!(decode_readings("m1", &[s]).is_ok());
    }

    #[test]
    fn test_missing_column() {
        let s = series(&["time", "value"], vec![]);
        assert_eq!(
            decode_readings("m1", &[s]),
            Err(DecodeError::MissingColumn("timestamp".to_string()))
        );
    }

    #[test]
    fn test_short_row() {
        let s = series(&["time", "timestamp", "value"], vec![vec![json!("t"), json!(1)]]);
        assert_eq!(
            decode_readings("m1", &[s]),
            Err(DecodeError::ShortRow {
                row: 0,
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_non_numeric_cells_rejected() {
        let bad_value = series(&["timestamp", "value"], vec![vec![json!(1), json!("fifty")]]);
        let bad_ts = series(&["timestamp", "value"], vec![vec![json!(1.5), json!(50.0)]]);
        let null_value = series(&["timestamp", "value"], vec![vec![json!(1), Value::Null]]);

        assert!(matches!(
            decode_readings("m1", &[bad_value]),
            Err(DecodeError::NotANumber { ref column, .. }) if column == "value"
        ));
        assert!(matches!(
            decode_readings("m1", &[bad_ts]),
            Err(DecodeError::NotANumber { ref column, .. }) if column == "timestamp"
        ));
        assert!(decode_readings("m1", &[null_value]).is_err());
    }

    #[test]
    fn test_timestamp_out_of_range() {
        let s = series(&["timestamp", "value"], vec![vec![json!(i64::MAX), json!(50.0)]]);
        assert_eq!(
            decode_readings("m1", &[s]),
            Err(DecodeError::TimestampOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(decode_readings("m1", &[]), Ok(Vec::new()));
    }
}
