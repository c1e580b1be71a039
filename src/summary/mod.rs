//! Span statistics for a recorded trace.
//!
//! A quick text report for when opening a trace viewer is overkill: spans
//! grouped by name with percentiles, instant event counts, and the slowest
//! individual spans.
//!
//! # Usage
//!
//! ```
//! use trace_recorder::{TraceBuffer, summary};
//!
//! let trace = TraceBuffer::create();
//! drop(trace.span("work"));
//! let report = summary::render(&summary::analyze(&trace.snapshot()));
//! assert!(report.contains("work"));
//! ```

pub mod analyze;
pub mod display;

pub use analyze::{SpanStats, TraceSummary, analyze};
pub use display::render;
