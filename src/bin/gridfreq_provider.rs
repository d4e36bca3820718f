//! Frequency provider - acquisition pipeline
//!
//! Reads the measurement board (or simulates one), validates samples and
//! pushes accepted readings to the submission API.
//!
//! Usage:
//!   cargo run --release --bin gridfreq_provider [-- --sim]
//!
//! Environment variables:
//!   METER_ID, METER_KEY - meter identity (required)
//!   SUBMIT_HOST, SUBMIT_PORT - submission endpoint (default: http://localhost:8080)
//!   DEVICE_PATH - serial device (default: /dev/ttyACM0)
//!   SIMULATION_MODE - run without hardware (default: false)
//!   PUSH_WORKERS - worker count (default: available parallelism)

use dotenv::dotenv;
use gridfreq::config::ProviderConfig;
use gridfreq::pipeline::PipelineContext;
use log::{error, info};
use std::env;
use std::future::Future;

fn simulation_requested() -> bool {
    env::args().skip(1).any(|arg| arg == "--sim")
}

/// Resolves when `signal` fires; parks forever if the signal cannot be
/// listened for, leaving the pipeline running
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("❌ Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    shutdown_on(tokio::signal::ctrl_c()).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    gridfreq::init_logging();

    info!("🚀 Starting frequency provider");

    let mut config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Error loading configuration: {}", e);
            return Err(e.into());
        }
    };
    if simulation_requested() {
        config.simulation.enabled = true;
    }

    info!("📊 Configuration:");
    info!("   ├─ Meter: {}", config.meter.id);
    info!("   ├─ Endpoint: {}", config.network.submit_url(&config.meter.id));
    if config.simulation.enabled {
        info!("   ├─ Source: simulation");
    } else {
        info!("   ├─ Source: {} @ {} baud", config.device.path, config.device.baud);
    }
    info!("   ├─ Channel buffer: {}", config.pipeline.channel_buffer);
    info!("   └─ Push workers: {}", config.pipeline.workers);

    let context = PipelineContext::new(config)?;

    tokio::select! {
        result = context.run() => {
            match result {
                Ok(report) => {
                    info!("✅ Source: {}", report.adapter);
                    info!("✅ Delivery: {}", report.workers);
                }
                Err(e) => {
                    error!("❌ {}", e);
                    if e.is_fatal() {
                        return Err(e.into());
                    }
                }
            }
        }
        _ = shutdown_signal() => {
            info!("⚠️  Received CTRL+C, shutting down...");
        }
    }

    info!("✅ Frequency provider stopped");
    Ok(())
}
