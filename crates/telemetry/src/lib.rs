//! Telemetry poller and rolling buffer.
//!
//! Polls `/distance` on a fixed period, interprets the reading into a
//! [`Sample`](cuve_core::Sample), appends it to a bounded
//! [`RollingSeries`](cuve_core::RollingSeries) and hands the series to a
//! [`RenderSink`](cuve_core::RenderSink).

pub mod format;
pub mod gauge;
pub mod poller;
pub mod sample;

pub use gauge::fill_percent;
pub use poller::{PollOutcome, PollSettings, Poller, TelemetrySource};
pub use sample::{now_label, SamplePolicy, DEFAULT_ESTIMATED_FLOOR};
