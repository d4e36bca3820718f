//! Query stored frequency readings
//!
//! Usage:
//!   frequency_query last [meter]
//!   frequency_query last-n <n> [meter]
//!   frequency_query between <start> <end> [meter]      (RFC3339 instants)
//!
//! The meter defaults to METER_ID. Store connection comes from INFLUX_HOST,
//! INFLUX_PORT, INFLUX_USER, INFLUX_PASS and INFLUX_DATABASE.

use chrono::{DateTime, Utc};
use dotenv::dotenv;
use gridfreq::config::{ConfigError, InfluxConfig};
use gridfreq::timeseries::TimeSeriesClient;
use gridfreq::types::{sort_by_timestamp, MeterReading};
use log::error;
use std::env;

enum Command {
    Last,
    LastN(usize),
    Between(DateTime<Utc>, DateTime<Utc>),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(msg.into())
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid(format!("'{}' is not an RFC3339 instant: {}", raw, e)))
}

fn parse_args(args: &[String]) -> Result<(Command, Option<String>), ConfigError> {
    let usage = || invalid("usage: frequency_query last|last-n <n>|between <start> <end> [meter]");
    let (command, rest) = match args.first().map(String::as_str) {
        Some("last") => (Command::Last, &args[1..]),
        Some("last-n") => {
            let n = args
                .get(1)
                .ok_or_else(usage)?
                .parse::<usize>()
                .map_err(|_| invalid("last-n expects a non-negative count"))?;
            (Command::LastN(n), &args[2..])
        }
        Some("between") => {
            let start = parse_instant(args.get(1).ok_or_else(usage)?)?;
            let end = parse_instant(args.get(2).ok_or_else(usage)?)?;
            (Command::Between(start, end), &args[3..])
        }
        _ => return Err(usage()),
    };
    Ok((command, rest.first().cloned()))
}

fn print_readings(readings: &[MeterReading]) {
    for r in readings {
        println!("{}\t{}\t{:.5}", r.meter_id, r.reading.timestamp.to_rfc3339(), r.reading.value);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    gridfreq::init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, meter) = parse_args(&args)?;
    let meter_id = match meter.or_else(|| env::var("METER_ID").ok()) {
        Some(id) => id,
        None => return Err(ConfigError::MissingVariable("METER_ID".to_string()).into()),
    };

    let config = InfluxConfig::from_env()?;
    let client = match TimeSeriesClient::connect_influx(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("❌ {}", e);
            return Err(e.into());
        }
    };

    let result = match command {
        Command::Last => client.get_last_frequency(&meter_id).await.map(|r| vec![r]),
        Command::LastN(n) => client.get_last_frequencies(&meter_id, n).await,
        Command::Between(start, end) => client
            .get_frequencies_between(&meter_id, start, end)
            .await
            .map(|mut readings| {
                sort_by_timestamp(&mut readings);
                readings
            }),
    };

    match result {
        Ok(readings) => {
            print_readings(&readings);
            Ok(())
        }
        Err(e) => {
            error!("❌ {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_last_n_with_meter() {
        let (command, meter) = parse_args(&args(&["last-n", "5", "meter-1"])).unwrap();
        assert!(matches!(command, Command::LastN(5)));
        assert_eq!(meter.as_deref(), Some("meter-1"));
    }

    #[test]
    fn test_parse_between() {
        let (command, meter) =
            parse_args(&args(&["between", "2024-01-01T00:00:00Z", "2024-01-01T01:00:00+01:00"])).unwrap();
        match command {
            Command::Between(start, end) => assert_eq!(start, end),
            _ => panic!("expected between"),
        }
        assert!(meter.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(parse_args(&args(&["export"])).is_err());
        assert!(parse_args(&args(&["last-n"])).is_err());
        assert!(parse_args(&args(&["between", "yesterday", "today"])).is_err());
    }
}
