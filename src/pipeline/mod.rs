//! Distribution pipeline
//!
//! Source adapter → bounded channel → N push workers → submission API.
//!
//! - `channel` - competing-consumers channel
//! - `submit` - submission seam and its HTTP implementation
//! - `pusher` - worker loop and pool
//! - `context` - startup wiring and shutdown sequence

pub mod channel;
pub mod context;
pub mod pusher;
pub mod submit;

pub use channel::{distribution_channel, ChannelClosed, Producer, SharedReceiver};
pub use context::{PipelineContext, PipelineReport};
pub use pusher::{run_worker, PushPool, WorkerStats};
pub use submit::{interpret_response, HttpSubmitter, ReadingSubmitter, SubmitError, SubmitOutcome};
