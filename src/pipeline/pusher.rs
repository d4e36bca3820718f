//! Push worker pool
//!
//! Every worker runs the same loop: take the next reading off the shared
//! channel, submit it, log the result, repeat. Failures are logged and the
//! reading is dropped. A worker ends once the channel is closed and empty.

use crate::pipeline::channel::SharedReceiver;
use crate::pipeline::submit::{ReadingSubmitter, SubmitOutcome};
use crate::types::Reading;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Per-worker delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerStats {
    pub delivered: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl WorkerStats {
    pub fn total(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }

    fn merge(&mut self, other: WorkerStats) {
        self.delivered += other.delivered;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

impl std::fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} delivered, {} rejected, {} failed",
            self.delivered, self.rejected, self.failed
        )
    }
}

/// Drain the channel until it is closed
pub async fn run_worker(
    worker_id: usize,
    rx: SharedReceiver<Reading>,
    submitter: Arc<dyn ReadingSubmitter>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(reading) = rx.recv().await {
        log::info!("[worker {}] Frequency: {:.5}", worker_id, reading.value);

        match submitter.submit(&reading).await {
            Ok(SubmitOutcome::Delivered) => {
                stats.delivered += 1;
                log::debug!("[worker {}] ✅ Submitted {:.5}", worker_id, reading.value);
            }
            Ok(SubmitOutcome::Rejected { status, error: Some(error), .. }) => {
                stats.rejected += 1;
                log::warn!("[worker {}] {} {}: {}", worker_id, status, error.id, error.message);
            }
            Ok(SubmitOutcome::Rejected { status, error: None, raw }) => {
                stats.rejected += 1;
                log::warn!(
                    "[worker {}] {} Failed to decode error message, raw: {}",
                    worker_id,
                    status,
                    raw
                );
            }
            Err(e) => {
                stats.failed += 1;
                log::warn!("[worker {}] {}", worker_id, e);
            }
        }
    }

    log::debug!("[worker {}] Channel closed, stopping ({})", worker_id, stats);
    stats
}

/// Handles of a running worker pool
pub struct PushPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl PushPool {
    /// Spawn `size` workers sharing `rx`
    pub fn spawn(size: usize, rx: SharedReceiver<Reading>, submitter: Arc<dyn ReadingSubmitter>) -> Self {
        log::info!("🚀 Spawning {} push workers → {}", size, submitter.endpoint());
        let handles = (0..size)
            .map(|worker_id| {
                let rx = rx.clone();
                let submitter = submitter.clone();
                tokio::spawn(run_worker(worker_id, rx, submitter))
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to finish and sum their counters
    pub async fn join(self) -> WorkerStats {
        let mut total = WorkerStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => total.merge(stats),
                Err(e) => log::error!("❌ Push worker panicked: {}", e),
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::distribution_channel;
    use crate::pipeline::submit::SubmitError;
    use crate::types::ErrorMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays scripted outcomes and records what it was given
    struct ScriptedSubmitter {
        script: Mutex<Vec<Result<SubmitOutcome, SubmitError>>>,
        seen: Mutex<Vec<f64>>,
    }

    impl ScriptedSubmitter {
        fn new(mut script: Vec<Result<SubmitOutcome, SubmitError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReadingSubmitter for ScriptedSubmitter {
        async fn submit(&self, reading: &Reading) -> Result<SubmitOutcome, SubmitError> {
            self.seen.lock().unwrap().push(reading.value);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(SubmitOutcome::Delivered))
        }

        fn endpoint(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_worker_survives_rejections_and_transport_errors() {
        let submitter = Arc::new(ScriptedSubmitter::new(vec![
            Ok(SubmitOutcome::Rejected {
                status: 500,
                error: Some(ErrorMessage {
                    id: "E1".to_string(),
                    message: "bad key".to_string(),
                }),
                raw: r#"{"Id":"E1","Message":"bad key"}"#.to_string(),
            }),
            Err(SubmitError::Transport("connection refused".to_string())),
            Ok(SubmitOutcome::Rejected {
                status: 503,
                error: None,
                raw: "busy".to_string(),
            }),
            Ok(SubmitOutcome::Delivered),
        ]));
        let (tx, rx) = distribution_channel(8);
        for v in [50.0, 50.1, 50.2, 50.3] {
            tx.send(Reading::now(v)).await.unwrap();
        }
        drop(tx);

        let stats = run_worker(0, rx, submitter.clone()).await;

        assert_eq!(
            stats,
            WorkerStats {
                delivered: 1,
                rejected: 2,
                failed: 1
            }
        );
        assert_eq!(*submitter.seen.lock().unwrap(), vec![50.0, 50.1, 50.2, 50.3]);
    }

    #[tokio::test]
    async fn test_pool_delivers_each_item_once() {
        let submitter = Arc::new(ScriptedSubmitter::new(Vec::new()));
        let (tx, rx) = distribution_channel(3);
        for v in [49.9, 50.0, 50.1] {
            tx.send(Reading::now(v)).await.unwrap();
        }
        drop(tx);

        let pool = PushPool::spawn(2, rx, submitter.clone());
        assert_eq!(pool.size(), 2);
        let stats = pool.join().await;

        assert_eq!(stats.delivered, 3);
        let mut seen = submitter.seen.lock().unwrap().clone();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![49.9, 50.0, 50.1]);
    }

    #[tokio::test]
    async fn test_pool_ends_on_empty_closed_channel() {
        let submitter = Arc::new(ScriptedSubmitter::new(Vec::new()));
        let (tx, rx) = distribution_channel::<Reading>(1);
        drop(tx);

        let stats = PushPool::spawn(4, rx, submitter).join().await;
        assert_eq!(stats.total(), 0);
    }
}
