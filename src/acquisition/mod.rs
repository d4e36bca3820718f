//! Frequency sources
//!
//! - `validator` - range/warmup/spike filter for raw samples
//! - `hardware` - serial record reader driving the validator
//! - `simulation` - timer-driven synthetic source

pub mod hardware;
pub mod simulation;
pub mod validator;

pub use hardware::{open_device, parse_record, run_hardware_adapter, Record};
pub use simulation::{run_simulation, Simulator};
pub use validator::{ValidationState, Validator, Verdict};

/// Counters reported by a source adapter when it stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterStats {
    /// Non-empty lines read (or samples generated)
    pub lines: u64,
    pub forwarded: u64,
    pub out_of_range: u64,
    pub warmup: u64,
    pub spikes: u64,
    pub malformed: u64,
    pub info: u64,
    pub unknown: u64,
    /// Set when the source failed rather than reaching end of input
    pub read_error: Option<String>,
}

impl std::fmt::Display for AdapterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lines, {} forwarded, {} out of range, {} warmup, {} spikes, {} malformed",
            self.lines, self.forwarded, self.out_of_range, self.warmup, self.spikes, self.malformed
        )
    }
}
