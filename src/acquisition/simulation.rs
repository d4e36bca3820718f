//! Synthetic frequency source for running without measurement hardware
//!
//! Emits `49.95 + U[0, 0.1)` Hz once per tick straight into the channel;
//! simulated values are always plausible, so the validator is skipped.

use crate::acquisition::AdapterStats;
use crate::config::SimulationConfig;
use crate::pipeline::channel::Producer;
use crate::types::Reading;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, MissedTickBehavior};

const BASE_HZ: f64 = 49.95;
const SPREAD_HZ: f64 = 0.1;

pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    /// Seeded generators produce the same sequence on every run
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_value(&mut self) -> f64 {
        BASE_HZ + SPREAD_HZ * self.rng.gen::<f64>()
    }
}

/// Emit one sample per tick until every receiver is gone
pub async fn run_simulation(config: &SimulationConfig, producer: Producer<Reading>) -> AdapterStats {
    let mut simulator = Simulator::new(config.seed);
    let mut ticker = interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = AdapterStats::default();

    log::info!(
        "🎲 Simulation mode: one sample every {}ms (seed: {:?})",
        config.tick.as_millis(),
        config.seed
    );

    loop {
        ticker.tick().await;
        let value = simulator.next_value();
        if producer.send(Reading::now(value)).await.is_err() {
            log::warn!("⚠️  No push workers left, stopping simulation");
            break;
        }
        stats.lines += 1;
        stats.forwarded += 1;
        log::debug!("Simulated frequency: {:.5}", value);
    }

    stats
}
