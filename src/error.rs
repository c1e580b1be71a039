//! Trace recorder error types
//!
//! Recording itself never fails: writes into a stopped buffer are dropped and a
//! poisoned lock is recovered. Errors only surface from the edges of the crate,
//! where a trace leaves memory or configuration enters it.
//!
//! ```ignore
//! match trace_recorder::write_to_file(&buffer, &path) {
//!     Err(TraceError::Io { path, .. }) => eprintln!("could not write {}", path.display()),
//!     Err(e) => eprintln!("{e}"),
//!     Ok(()) => {}
//! }
//! ```

use std::path::PathBuf;

/// Errors surfaced by formatting, file output and configuration loading.
///
/// The in-memory buffer is never consumed or modified by an operation that
/// returns one of these, so a failed write can simply be retried.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Writing or persisting the trace file failed
    #[error("failed to write trace to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The trace document could not be serialized
    #[error("failed to serialize trace: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A configuration file exists but could not be read or parsed
    #[error("invalid trace config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}
