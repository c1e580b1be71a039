//! Chrome trace-event JSON output.
//!
//! Buffers render as a JSON object wrapping the event array:
//!
//! ```text
//! {
//!   "displayTimeUnit": "ms",
//!   "traceEvents": [ {"ph": "M", "name": "process_name", ...}, ... ]
//! }
//! ```
//!
//! The array always opens with synthesized metadata, in this order:
//! `process_name`, `process_labels`, then one `thread_name` per thread that
//! recorded at least one event (first-seen order). Trace viewers rely on that
//! order, so it must not change.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexSet;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::buffer::{TraceBuffer, TraceSnapshot};
use crate::config::{DisplayTimeUnit, TraceConfig};
use crate::error::TraceError;
use crate::event::{ArgValue, Scalar, TraceArg, TraceEvent};
use crate::trace_args;

const RECORDER: &str = env!("CARGO_PKG_NAME");
const RECORDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Context label used when none is configured.
pub const DEFAULT_CONTEXT_LABEL: &str = "main";

/// Executable name of the current process, looked up once
static EXECUTABLE_NAME: OnceLock<String> = OnceLock::new();

/// Identity of the capturing process, shown by viewers as the process name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub identifier: String,
    pub version: String,
}

impl ProcessInfo {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
        }
    }

    /// The running executable's name with an unknown version.
    pub fn current() -> Self {
        let identifier = EXECUTABLE_NAME.get_or_init(|| {
            std::env::current_exe()
                .ok()
                .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "unknown".to_string())
        });
        Self::new(identifier.clone(), "unknown")
    }

    /// e.g. `asset-pipeline/2.3.0 - trace-recorder/0.1.0`
    pub fn process_name(&self) -> String {
        format!(
            "{}/{} - {}/{}",
            self.identifier, self.version, RECORDER, RECORDER_VERSION
        )
    }
}

/// Renders buffers as trace-event JSON.
#[derive(Debug, Clone)]
pub struct TraceFormatter {
    process: ProcessInfo,
    context_label: String,
    display_time_unit: DisplayTimeUnit,
    pid: u32,
}

impl Default for TraceFormatter {
    fn default() -> Self {
        Self {
            process: ProcessInfo::current(),
            context_label: DEFAULT_CONTEXT_LABEL.to_string(),
            display_time_unit: DisplayTimeUnit::default(),
            pid: std::process::id(),
        }
    }
}

impl TraceFormatter {
    pub fn from_config(config: &TraceConfig) -> Self {
        let current = ProcessInfo::current();
        Self {
            process: ProcessInfo {
                identifier: config
                    .process_identifier
                    .clone()
                    .unwrap_or(current.identifier),
                version: config.process_version.clone().unwrap_or(current.version),
            },
            context_label: config
                .context_label
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTEXT_LABEL.to_string()),
            display_time_unit: config.display_time_unit,
            ..Self::default()
        }
    }

    pub fn with_process(mut self, process: ProcessInfo) -> Self {
        self.process = process;
        self
    }

    /// Set the `process_labels` value, typically the active scene or session.
    pub fn with_context_label(mut self, label: impl Into<String>) -> Self {
        self.context_label = label.into();
        self
    }

    pub fn with_display_time_unit(mut self, unit: DisplayTimeUnit) -> Self {
        self.display_time_unit = unit;
        self
    }

    /// Override the process id written on every event.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Render `buffer` as a JSON document.
    ///
    /// The buffer's lock is held only while taking a snapshot.
    pub fn format(&self, buffer: &TraceBuffer) -> Result<String, TraceError> {
        self.format_snapshot(&buffer.snapshot())
    }

    pub fn format_snapshot(&self, snapshot: &TraceSnapshot) -> Result<String, TraceError> {
        let metadata = self.metadata_events(snapshot);
        let document = TraceDocument {
            display_time_unit: self.display_time_unit.as_ref(),
            trace_events: metadata
                .iter()
                .chain(&snapshot.events)
                .map(|event| EventJson::new(event, self.pid))
                .collect(),
        };

        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        Ok(json)
    }

    /// Format `buffer` and atomically replace `path` with the result.
    ///
    /// The document is written to a temporary file in the destination
    /// directory and renamed over `path`, so readers never see a partial file.
    pub fn write_to_file(&self, buffer: &TraceBuffer, path: &Path) -> Result<(), TraceError> {
        let json = self.format(buffer)?;

        let io_error = |source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
        temp.write_all(json.as_bytes()).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;

        #[cfg(windows)]
        let _ = std::fs::remove_file(path);

        temp.persist(path).map_err(|e| io_error(e.error))?;

        log::debug!("Wrote {} bytes of trace to {}", json.len(), path.display());
        Ok(())
    }

    fn metadata_events(&self, snapshot: &TraceSnapshot) -> Vec<TraceEvent> {
        let thread_ids: IndexSet<u64> = snapshot.events.iter().map(|e| e.thread_id).collect();

        let mut metadata = Vec::with_capacity(thread_ids.len() + 2);
        metadata.push(TraceEvent::metadata(
            "process_name",
            0,
            trace_args!["name" => self.process.process_name()],
        ));
        metadata.push(TraceEvent::metadata(
            "process_labels",
            0,
            trace_args!["labels" => self.context_label.as_str()],
        ));
        for thread_id in thread_ids {
            // Every recorded thread is registered; the fallback only covers
            // buffers assembled by hand.
            let label = snapshot.threads.label_or_default(thread_id);
            metadata.push(TraceEvent::metadata(
                "thread_name",
                thread_id,
                trace_args!["name" => label],
            ));
        }
        metadata
    }
}

/// Format `buffer` with the default formatter.
pub fn format(buffer: &TraceBuffer) -> Result<String, TraceError> {
    TraceFormatter::default().format(buffer)
}

/// Write `buffer` to `path` with the default formatter.
pub fn write_to_file(buffer: &TraceBuffer, path: impl AsRef<Path>) -> Result<(), TraceError> {
    TraceFormatter::default().write_to_file(buffer, path.as_ref())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceDocument<'a> {
    display_time_unit: &'a str,
    trace_events: Vec<EventJson<'a>>,
}

#[derive(Serialize)]
struct EventJson<'a> {
    ph: char,
    name: &'a str,
    ts: i64,
    dur: i64,
    tid: u64,
    pid: u32,
    #[serde(skip_serializing_if = "ArgsJson::is_empty")]
    args: ArgsJson<'a>,
}

impl<'a> EventJson<'a> {
    fn new(event: &'a TraceEvent, pid: u32) -> Self {
        Self {
            ph: event.phase.code(),
            name: &event.name,
            ts: event.timestamp,
            dur: event.duration,
            tid: event.thread_id,
            pid,
            args: ArgsJson(&event.args),
        }
    }
}

/// Arguments as a JSON object, keeping their recorded order.
struct ArgsJson<'a>(&'a [TraceArg]);

impl ArgsJson<'_> {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ArgsJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for arg in self.0 {
            map.serialize_entry(arg.name.as_str(), &ArgValueJson(&arg.value))?;
        }
        map.end()
    }
}

/// Scalars render as their string form, arrays as arrays of those strings.
struct ArgValueJson<'a>(&'a ArgValue);

impl Serialize for ArgValueJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            ArgValue::Scalar(scalar) => serializer.collect_str(scalar),
            ArgValue::Array(items) => serializer.collect_seq(items.iter().map(ScalarJson)),
        }
    }
}

struct ScalarJson<'a>(&'a Scalar);

impl Serialize for ScalarJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self.0)
    }
}
