use crate::config::InfluxConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::timeseries::decode::decode_readings;
use crate::timeseries::influx::InfluxStore;
use crate::timeseries::query::{SelectQuery, METER_TAG, TIMESTAMP_COLUMN, VALUE_COLUMN};
use crate::timeseries::store::{FieldValue, Point, TimeSeriesStore};
use crate::types::MeterReading;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Read/write facade over a time-series store
///
/// Cheap to clone; clones share the underlying store handle, which is safe
/// for concurrent use. Readings of all meters live in one measurement named
/// after the database and are told apart by the `meterid` tag.
#[derive(Clone)]
pub struct TimeSeriesClient {
    store: Arc<dyn TimeSeriesStore>,
    database: String,
}

impl TimeSeriesClient {
    /// Connect after checking that `database` exists in the store's catalog
    ///
    /// Fails with a fatal error when the catalog cannot be read or the
    /// database is absent.
    pub async fn connect(store: Arc<dyn TimeSeriesStore>, database: &str) -> ProviderResult<Self> {
        log::info!("🔧 Getting list of databases ({})", store.backend_type());
        let names = store
            .list_databases()
            .await
            .map_err(ProviderError::StoreUnreachable)?;

        for name in &names {
            log::debug!("found database: {}", name);
        }
        if !names.iter().any(|n| n == database) {
            return Err(ProviderError::DatabaseMissing(database.to_string()));
        }

        log::info!("✅ Using database {}", database);
        Ok(Self {
            store,
            database: database.to_string(),
        })
    }

    /// Connect to the InfluxDB server described by `config`
    pub async fn connect_influx(config: &InfluxConfig) -> ProviderResult<Self> {
        let store = InfluxStore::new(config).map_err(ProviderError::StoreUnreachable)?;
        Self::connect(Arc::new(store), &config.database).await
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn point_for(&self, reading: &MeterReading) -> Point {
        Point {
            measurement: self.database.clone(),
            tags: vec![(METER_TAG.to_string(), reading.meter_id.clone())],
            fields: vec![
                (VALUE_COLUMN.to_string(), FieldValue::Float(reading.reading.value)),
                (
                    TIMESTAMP_COLUMN.to_string(),
                    FieldValue::Integer(reading.reading.timestamp.timestamp()),
                ),
            ],
            time: reading.reading.timestamp,
        }
    }

    /// Write one reading as one point
    pub async fn write_reading(&self, reading: &MeterReading) -> ProviderResult<()> {
        let point = self.point_for(reading);
        self.store.write_point(&self.database, &point).await?;
        Ok(())
    }

    /// Write every reading received on `rx` until the channel closes
    ///
    /// Failed writes are logged and skipped. The task returns the number of
    /// readings written.
    pub fn spawn_pusher(&self, mut rx: mpsc::Receiver<MeterReading>) -> JoinHandle<u64> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut written = 0u64;
            while let Some(reading) = rx.recv().await {
                match client.write_reading(&reading).await {
                    Ok(()) => written += 1,
                    Err(e) => log::warn!("⚠️  Failed to write reading for {}: {}", reading.meter_id, e),
                }
            }
            log::info!("Store pusher stopped after {} writes", written);
            written
        })
    }

    async fn select(&self, query: SelectQuery) -> ProviderResult<Vec<MeterReading>> {
        let series = self
            .store
            .run_query(&query, &self.database)
            .await
            .map_err(|e| {
                log::warn!("Failed to run query: {}", e);
                ProviderError::Store(e)
            })?;
        Ok(decode_readings(&query.meter_id, &series)?)
    }

    /// Readings whose stored timestamp lies strictly between `start` and
    /// `end`, oldest first
    pub async fn get_frequencies_between(
        &self,
        meter_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<MeterReading>> {
        let query = SelectQuery::new(&self.database, meter_id).between(start.timestamp(), end.timestamp());
        self.select(query).await
    }

    /// Up to `amount` most recent readings, newest first
    pub async fn get_last_frequencies(&self, meter_id: &str, amount: usize) -> ProviderResult<Vec<MeterReading>> {
        // InfluxQL treats LIMIT 0 as unlimited
        if amount == 0 {
            return Ok(Vec::new());
        }
        let query = SelectQuery::new(&self.database, meter_id)
            .newest_first()
            .limit(amount);
        let mut readings = self.select(query).await?;
        readings.truncate(amount);
        Ok(readings)
    }

    /// The most recent reading; `NoData` if the meter has none
    pub async fn get_last_frequency(&self, meter_id: &str) -> ProviderResult<MeterReading> {
        self.get_last_frequencies(meter_id, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoData(meter_id.to_string()))
    }
}
