//! Rendering sinks for the telemetry poller.
//!
//! - [`chart`]: two-axis text chart of the rolling series
//! - [`terminal`]: full-screen terminal dashboard built on the chart
//! - [`colors`]: hex colour parsing and ANSI escapes

pub mod chart;
pub mod colors;
pub mod terminal;

pub use chart::{render_chart, ChartLayout, ChartStyle, Trace};
pub use colors::Color;
pub use terminal::TerminalSink;
