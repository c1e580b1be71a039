//! In-process event tracing with Chrome trace-event JSON output.
//!
//! Create one [`TraceBuffer`], share it with every thread that should be
//! traced, then [`format`] or [`write_to_file`] it once capture is done.
//! Buffers captured separately (for example by two worker pools) can be
//! stitched onto one timeline with [`merge`].

pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod merge;
pub mod registry;
pub mod summary;

pub use buffer::{ThreadRecorder, TraceBuffer, TraceSnapshot, TraceSpan};
pub use config::{DisplayTimeUnit, TraceConfig};
pub use error::TraceError;
pub use event::{ArgValue, EventName, Phase, Scalar, TraceArg, TraceEvent};
pub use format::{ProcessInfo, TraceFormatter, format, write_to_file};
pub use merge::merge;
pub use registry::{ThreadRegistry, current_thread_id};
