//! Time-series storage of meter readings
//!
//! - `store` - the storage seam (write point, run query, list databases)
//! - `query` - select over one meter's series, rendered as InfluxQL
//! - `decode` - schema-checked row decoding into readings
//! - `influx` - InfluxDB 1.x HTTP backend
//! - `memory` - in-process backend
//! - `client` - read/write facade used by the binaries

pub mod client;
pub mod decode;
pub mod influx;
pub mod memory;
pub mod query;
pub mod store;

pub use client::TimeSeriesClient;
pub use decode::{decode_readings, DecodeError};
pub use influx::InfluxStore;
pub use memory::MemoryStore;
pub use query::{Order, SelectQuery};
pub use store::{FieldValue, Point, Series, StoreError, TimeSeriesStore};
