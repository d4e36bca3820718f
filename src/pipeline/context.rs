//! Pipeline orchestration
//!
//! `PipelineContext` is built once at startup and owns everything the
//! acquisition pipeline needs. `run` wires source → channel → workers and
//! returns after the shutdown sequence has completed:
//!
//! adapter ends → producer dropped (channel closed) → workers drain → workers end

use crate::acquisition::{self, AdapterStats, Validator};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::pipeline::channel::{distribution_channel, Producer};
use crate::pipeline::pusher::{PushPool, WorkerStats};
use crate::pipeline::submit::{HttpSubmitter, ReadingSubmitter};
use crate::types::Reading;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncBufRead;

/// Summary of a completed pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub adapter: AdapterStats,
    pub workers: WorkerStats,
}

pub struct PipelineContext {
    config: ProviderConfig,
    submitter: Arc<dyn ReadingSubmitter>,
}

impl PipelineContext {
    /// Build a context that submits over HTTP
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let submitter = HttpSubmitter::new(&config.network, &config.meter)?;
        Ok(Self::with_submitter(config, Arc::new(submitter)))
    }

    pub fn with_submitter(config: ProviderConfig, submitter: Arc<dyn ReadingSubmitter>) -> Self {
        Self { config, submitter }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Run with the configured source until it ends
    ///
    /// The simulated source never ends on its own; the caller is expected to
    /// race this future against a shutdown signal.
    pub async fn run(&self) -> Result<PipelineReport, ProviderError> {
        if self.config.simulation.enabled {
            return Ok(self.run_simulated().await);
        }
        let reader = acquisition::open_device(&self.config.device).await?;
        Ok(self.run_reader(reader).await)
    }

    /// Feed records from `reader` through the validator into the pool
    pub async fn run_reader<R>(&self, reader: R) -> PipelineReport
    where
        R: AsyncBufRead + Unpin,
    {
        // Warmup deadline starts counting when the adapter starts
        let validator = Validator::new(self.config.validation.clone());
        log::info!(
            "📡 Reading {} (warmup {}ms, range [{}, {}] Hz, spike threshold {})",
            self.config.device.path,
            self.config.validation.warmup.as_millis(),
            self.config.validation.low_hz,
            self.config.validation.high_hz,
            self.config.validation.spike_threshold
        );
        self.drive(|producer| acquisition::run_hardware_adapter(reader, validator, producer))
            .await
    }

    pub async fn run_simulated(&self) -> PipelineReport {
        let simulation = self.config.simulation.clone();
        self.drive(|producer| async move { acquisition::run_simulation(&simulation, producer).await })
            .await
    }

    async fn drive<F, Fut>(&self, adapter: F) -> PipelineReport
    where
        F: FnOnce(Producer<Reading>) -> Fut,
        Fut: Future<Output = AdapterStats>,
    {
        let (producer, rx) = distribution_channel(self.config.pipeline.channel_buffer);
        let pool = PushPool::spawn(self.config.pipeline.workers, rx, self.submitter.clone());

        // The adapter owns the producer; it is dropped when the adapter returns
        let adapter_stats = adapter(producer).await;

        log::info!("🔄 Source finished, draining {} workers...", pool.size());
        let worker_stats = pool.join().await;
        log::info!("✅ Pipeline stopped: {}", worker_stats);

        PipelineReport {
            adapter: adapter_stats,
            workers: worker_stats,
        }
    }
}
