//! Serial record reader
//!
//! The measurement board prints one record per line:
//!
//! ```text
//! F;49.987        frequency sample in Hz
//! I;boot ok       informational message
//! ```
//!
//! Frequency records go through the [`Validator`]; accepted samples are
//! stamped and handed to the distribution channel.

use crate::acquisition::validator::{Validator, Verdict};
use crate::acquisition::AdapterStats;
use crate::config::DeviceConfig;
use crate::error::ProviderError;
use crate::pipeline::channel::Producer;
use crate::types::Reading;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Record<'a> {
    Frequency(f64),
    Info(&'a str),
    Unknown(&'a str),
}

#[derive(Debug, PartialEq)]
pub enum RecordError {
    /// `F` record without a value field
    MissingValue,
    /// `F` record whose value is not a float
    BrokenFrequency(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingValue => write!(f, "frequency record without value"),
            RecordError::BrokenFrequency(raw) => write!(f, "broken frequency: {}", raw),
        }
    }
}

impl std::error::Error for RecordError {}

/// Parse a single `;`-separated record (line terminator already removed)
pub fn parse_record(line: &str) -> Result<Record<'_>, RecordError> {
    let mut fields = line.split(';');
    match fields.next() {
        Some("F") => {
            let raw = fields.next().ok_or(RecordError::MissingValue)?;
            raw.trim()
                .parse::<f64>()
                .map(Record::Frequency)
                .map_err(|_| RecordError::BrokenFrequency(raw.to_string()))
        }
        Some("I") => Ok(Record::Info(line)),
        _ => Ok(Record::Unknown(line)),
    }
}

/// Open the configured device as a buffered byte stream
///
/// Line speed and framing are set up outside this process (udev rule or
/// `stty`); we only read the character device.
pub async fn open_device(config: &DeviceConfig) -> Result<BufReader<File>, ProviderError> {
    let file = File::open(&config.path)
        .await
        .map_err(|source| ProviderError::SourceUnavailable {
            path: config.path.clone(),
            source,
        })?;
    log::info!("🔌 Opened {} ({} baud)", config.path, config.baud);
    Ok(BufReader::new(file))
}

/// Read records until end of input, a read error, or until no worker is
/// left to receive.
///
/// Consumes the producer; returning drops it, which closes the channel.
pub async fn run_hardware_adapter<R>(
    mut reader: R,
    mut validator: Validator,
    producer: Producer<Reading>,
) -> AdapterStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = AdapterStats::default();
    let mut buf = Vec::with_capacity(64);
    let mut congested = false;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                log::info!("📭 End of input, stopping reader");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("❌ Failed to read from device: {}", e);
                stats.read_error = Some(e.to_string());
                break;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let frequency = match parse_record(line) {
            Ok(Record::Frequency(f)) => f,
            Ok(Record::Info(msg)) => {
                log::info!("Info message: {}", msg);
                stats.info += 1;
                continue;
            }
            Ok(Record::Unknown(raw)) => {
                log::warn!("Received unknown data: {}", raw);
                stats.unknown += 1;
                continue;
            }
            Err(e) => {
                log::warn!("Skipping record '{}': {}", line, e);
                stats.malformed += 1;
                continue;
            }
        };

        match validator.check_now(frequency) {
            Verdict::Accepted => {}
            Verdict::OutOfRange => {
                log::warn!("Frequency out of plausible range: {}", line);
                stats.out_of_range += 1;
                continue;
            }
            Verdict::Warmup => {
                log::debug!("Startup: ignoring measurement {}", frequency);
                stats.warmup += 1;
                continue;
            }
            Verdict::Spike { delta } => {
                log::warn!("Rejected spike: {} (Δ={:.4})", frequency, delta);
                stats.spikes += 1;
                continue;
            }
        }

        if producer.send(Reading::now(frequency)).await.is_err() {
            log::warn!("⚠️  No push workers left, stopping reader");
            break;
        }
        stats.forwarded += 1;

        let now_congested = producer.is_congested();
        if now_congested && !congested {
            log::warn!(
                "⚠️  Channel usage high: {}/{}",
                producer.depth(),
                producer.capacity()
            );
        }
        congested = now_congested;
    }

    log::info!("✅ Reader stopped: {}", stats);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::pipeline::channel::distribution_channel;
    use std::time::{Duration, Instant};

    fn no_warmup() -> Validator {
        let config = ValidationConfig {
            warmup: Duration::ZERO,
            ..ValidationConfig::default()
        };
        Validator::with_deadline(config, Instant::now())
    }

    async fn drain(rx: crate::pipeline::channel::SharedReceiver<Reading>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Some(r) = rx.recv().await {
            values.push(r.value);
        }
        values
    }

    #[test]
    fn test_parse_record_types() {
        assert_eq!(parse_record("F;49.987"), Ok(Record::Frequency(49.987)));
        assert_eq!(parse_record("F; 50.01 ;extra"), Ok(Record::Frequency(50.01)));
        assert_eq!(parse_record("I;boot ok"), Ok(Record::Info("I;boot ok")));
        assert_eq!(parse_record("X;1"), Ok(Record::Unknown("X;1")));
        assert_eq!(parse_record("F"), Err(RecordError::MissingValue));
        assert_eq!(
            parse_record("F;4x.9"),
            Err(RecordError::BrokenFrequency("4x.9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reader_filters_and_forwards() {
        let input: &[u8] = b"F;49.9\nF;61.0\nF;49.91\n";
        let (tx, rx) = distribution_channel(16);

        let stats = run_hardware_adapter(input, no_warmup(), tx).await;

        assert_eq!(drain(rx).await, vec![49.9, 49.91]);
        assert_eq!(stats.forwarded, 2);
        assert_eq!(stats.out_of_range, 1);
    }

    #[tokio::test]
    async fn test_reader_skips_noise_and_keeps_going() {
        let input: &[u8] = b"I;hello\r\nF;garbage\r\n\r\nZ;what\nF\nF;50.0\r\n\xff\xfe\nF;50.1";
        let (tx, rx) = distribution_channel(16);

        let stats = run_hardware_adapter(input, no_warmup(), tx).await;

        assert_eq!(drain(rx).await, vec![50.0, 50.1]);
        assert_eq!(stats.info, 1);
        assert_eq!(stats.unknown, 2);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.forwarded, 2);
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_reader_absorbs_during_warmup() {
        let config = ValidationConfig {
            warmup: Duration::from_secs(3600),
            ..ValidationConfig::default()
        };
        let input: &[u8] = b"F;50.0\nF;50.1\n";
        let (tx, rx) = distribution_channel(16);

        let stats = run_hardware_adapter(input, Validator::new(config), tx).await;

        assert!(drain(rx).await.is_empty());
        assert_eq!(stats.warmup, 2);
    }

    #[tokio::test]
    async fn test_reader_stops_when_receivers_dropped() {
        let input: &[u8] = b"F;50.0\nF;50.1\nF;50.2\n";
        let (tx, rx) = distribution_channel(16);
        drop(rx);

        let stats = run_hardware_adapter(input, no_warmup(), tx).await;

        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.lines, 1);
    }

    /// Hands out `data` once, then fails every read
    struct FailingDevice {
        data: Option<&'static [u8]>,
    }

    impl tokio::io::AsyncRead for FailingDevice {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(data);
                    std::task::Poll::Ready(Ok(()))
                }
                None => std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device unplugged",
                ))),
            }
        }
    }

    #[tokio::test]
    async fn test_read_error_stops_reader_and_closes_channel() {
        let device = BufReader::new(FailingDevice {
            data: Some(b"F;50.0\n"),
        });
        let (tx, rx) = distribution_channel(4);

        let stats = run_hardware_adapter(device, no_warmup(), tx).await;

        assert_eq!(stats.forwarded, 1);
        assert!(stats.read_error.as_deref().is_some_and(|e| e.contains("device unplugged")));
        // Producer is gone: the worker side drains 50.0 and then sees the end
        assert_eq!(drain(rx).await, vec![50.0]);
    }

    #[tokio::test]
    async fn test_open_device_missing_path_is_fatal() {
        let config = DeviceConfig {
            path: "/nonexistent/ttyACM9".to_string(),
            baud: 115_200,
        };

        let err = open_device(&config).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_open_device_reads_file_backed_stream() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "F;50.00").unwrap();
        writeln!(file, "F;50.02").unwrap();
        file.flush().unwrap();

        let config = DeviceConfig {
            path: file.path().to_str().unwrap().to_string(),
            baud: 9_600,
        };
        let reader = open_device(&config).await.unwrap();
        let (tx, rx) = distribution_channel(4);

        run_hardware_adapter(reader, no_warmup(), tx).await;

        assert_eq!(drain(rx).await, vec![50.0, 50.02]);
    }
}
