//! Plausibility and spike filtering for raw frequency samples
//!
//! Three rules, applied in order:
//! 1. Range: samples outside `[low_hz, high_hz]` are dropped and leave no trace.
//! 2. Warmup: until the deadline passes, in-range samples only seed the
//!    baseline. The serial buffer holds stale data right after the port opens.
//! 3. Spike: after warmup, a sample is forwarded only if it differs from the
//!    previous in-range sample by less than the spike threshold.
//!
//! The baseline follows every in-range sample, including rejected spikes, so
//! a lasting step change is picked up after one rejected sample.

use crate::config::ValidationConfig;
use std::time::{Duration, Instant};

/// Outcome of validating a single sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Forward downstream
    Accepted,
    /// Outside the plausible range
    OutOfRange,
    /// Absorbed into the baseline during warmup
    Warmup,
    /// Jumped too far from the previous sample
    Spike { delta: f64 },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Filtering state owned by one ingestion task
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationState {
    /// Most recent in-range sample; `None` until one arrives
    pub last_accepted: Option<f64>,
    /// Samples are absorbed, not forwarded, before this instant
    pub warmup_until: Instant,
}

/// `now + warmup`, shortened to the latest representable instant on overflow
fn warmup_deadline(now: Instant, warmup: Duration) -> Instant {
    let mut span = warmup;
    loop {
        if let Some(deadline) = now.checked_add(span) {
            return deadline;
        }
        span /= 2;
    }
}

pub struct Validator {
    config: ValidationConfig,
    state: ValidationState,
}

impl Validator {
    /// Start a validator whose warmup window begins now
    pub fn new(config: ValidationConfig) -> Self {
        let deadline = warmup_deadline(Instant::now(), config.warmup);
        Self::with_deadline(config, deadline)
    }

    /// Start a validator with an explicit warmup deadline
    pub fn with_deadline(config: ValidationConfig, warmup_until: Instant) -> Self {
        Self {
            config,
            state: ValidationState {
                last_accepted: None,
                warmup_until,
            },
        }
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn warmup_remaining(&self, now: Instant) -> Duration {
        self.state.warmup_until.saturating_duration_since(now)
    }

    /// Validate against the current wall clock
    pub fn check_now(&mut self, candidate: f64) -> Verdict {
        self.check(candidate, Instant::now())
    }

    /// Validate `candidate` as if observed at `now`
    pub fn check(&mut self, candidate: f64, now: Instant) -> Verdict {
        // NaN fails both comparisons and must not reach the baseline
        if !(candidate >= self.config.low_hz && candidate <= self.config.high_hz) {
            return Verdict::OutOfRange;
        }

        if now < self.state.warmup_until {
            self.state.last_accepted = Some(candidate);
            return Verdict::Warmup;
        }

        let previous = self.state.last_accepted.replace(candidate);
        match previous {
            None => Verdict::Accepted,
            Some(last) => {
                let delta = (last - candidate).abs();
                if delta < self.config.spike_threshold {
                    Verdict::Accepted
                } else {
                    Verdict::Spike { delta }
                }
            }
        }
    }
}
