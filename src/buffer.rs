//! The shared, append-only event buffer.
//!
//! A [`TraceBuffer`] is created once and handed to producers as an
//! `Arc<TraceBuffer>`. Any thread may record into it at any time; each call
//! takes the buffer's mutex just long enough to register the thread (first
//! event only) and push one event.
//!
//! # Usage
//!
//! ```
//! use trace_recorder::TraceBuffer;
//!
//! let trace = TraceBuffer::create();
//! {
//!     let _span = trace.span("load-assets");
//!     trace.instant_event("cache-miss");
//! }
//! let start = trace.timestamp();
//! trace.complete_event("upload", start);
//! assert_eq!(trace.len(), 4);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_CAPACITY, TraceConfig};
use crate::event::{Phase, TraceArg, TraceEvent, event_name};
use crate::registry::{ThreadRegistry, current_thread_id, current_thread_label, default_label};

/// Thread-safe recorder of trace events.
#[derive(Debug)]
pub struct TraceBuffer {
    start_time: DateTime<Utc>,
    /// Monotonic clock reading taken at construction
    anchor: Instant,
    /// Microseconds from `start_time` to `anchor`
    anchor_offset: i64,
    tracing: AtomicBool,
    state: Mutex<BufferState>,
}

/// Events and thread labels; always mutated together under one lock.
#[derive(Debug, Default)]
struct BufferState {
    events: Vec<TraceEvent>,
    threads: ThreadRegistry,
}

/// A consistent copy of a buffer's contents.
#[derive(Debug, Clone)]
pub struct TraceSnapshot {
    pub start_time: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
    pub threads: ThreadRegistry,
}

/// Which thread an event is attributed to.
#[derive(Debug, Clone, Copy)]
enum Attribution {
    /// The calling thread, labelled with its OS name when first seen
    Current,
    /// An explicit id, labelled with the default label when first seen
    Thread(u64),
}

impl Attribution {
    fn thread_id(self) -> u64 {
        match self {
            Attribution::Current => current_thread_id(),
            Attribution::Thread(id) => id,
        }
    }
}

impl TraceBuffer {
    /// Create a buffer whose timeline starts now.
    pub fn create() -> Arc<Self> {
        Self::create_at(Utc::now())
    }

    /// Create a buffer whose timeline starts at `start_time`.
    ///
    /// Timestamps are measured from `start_time`, so a start in the past makes
    /// the first events land at a positive offset.
    pub fn create_at(start_time: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self::new(
            start_time,
            Vec::with_capacity(DEFAULT_CAPACITY),
            ThreadRegistry::new(),
        ))
    }

    /// Create a buffer starting now, sized from `config`.
    pub fn with_config(config: &TraceConfig) -> Arc<Self> {
        Arc::new(Self::new(
            Utc::now(),
            Vec::with_capacity(config.initial_capacity),
            ThreadRegistry::new(),
        ))
    }

    /// Build a buffer around already-recorded events.
    pub(crate) fn from_parts(
        start_time: DateTime<Utc>,
        events: Vec<TraceEvent>,
        threads: ThreadRegistry,
    ) -> Arc<Self> {
        Arc::new(Self::new(start_time, events, threads))
    }

    fn new(start_time: DateTime<Utc>, events: Vec<TraceEvent>, threads: ThreadRegistry) -> Self {
        let anchor = Instant::now();
        let anchor_offset = (Utc::now() - start_time)
            .num_microseconds()
            .unwrap_or_default();
        log::trace!("Created trace buffer starting at {}", start_time.to_rfc3339());

        Self {
            start_time,
            anchor,
            anchor_offset,
            tracing: AtomicBool::new(true),
            state: Mutex::new(BufferState { events, threads }),
        }
    }

    /// Wall-clock instant the timeline is measured from.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Microseconds elapsed since [`start_time`](Self::start_time).
    pub fn timestamp(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_micros()).unwrap_or(i64::MAX);
        self.anchor_offset.saturating_add(elapsed)
    }

    pub fn is_tracing(&self) -> bool {
        self.tracing.load(Ordering::Acquire)
    }

    /// Stop accepting events. There is no way to restart a stopped buffer.
    pub fn stop_tracing(&self) {
        if self.tracing.swap(false, Ordering::AcqRel) {
            log::debug!("Stopped tracing after {} events", self.len());
        }
    }

    /// Append one event attributed to `thread_id`.
    ///
    /// An unknown `thread_id` gets the default `"Thread {id}"` label in the
    /// same critical section as the append. Ids are shared with
    /// [`current_thread_id`]; see [`on_thread`](Self::on_thread).
    pub fn record_event(
        &self,
        phase: Phase,
        name: &str,
        timestamp: i64,
        duration: i64,
        thread_id: u64,
        args: Vec<TraceArg>,
    ) {
        self.record(
            Attribution::Thread(thread_id),
            phase,
            name,
            timestamp,
            duration,
            args,
        );
    }

    pub fn begin_event(&self, name: &str) {
        self.begin_event_with(name, Vec::new());
    }

    pub fn begin_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Attribution::Current, Phase::Begin, name, self.timestamp(), 0, args);
    }

    pub fn end_event(&self, name: &str) {
        self.end_event_with(name, Vec::new());
    }

    pub fn end_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Attribution::Current, Phase::End, name, self.timestamp(), 0, args);
    }

    pub fn instant_event(&self, name: &str) {
        self.instant_event_with(name, Vec::new());
    }

    pub fn instant_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Attribution::Current, Phase::Instant, name, self.timestamp(), 0, args);
    }

    /// Record a span that started at `start_timestamp` (from [`timestamp`](Self::timestamp)) and ends now.
    pub fn complete_event(&self, name: &str, start_timestamp: i64) {
        self.complete_event_with(name, start_timestamp, Vec::new());
    }

    pub fn complete_event_with(&self, name: &str, start_timestamp: i64, args: Vec<TraceArg>) {
        let now = self.timestamp();
        self.record_complete(Attribution::Current, name, start_timestamp, now, args);
    }

    /// Record events on behalf of another (possibly non-OS) thread id.
    ///
    /// Explicit ids share one number space with [`current_thread_id`], which
    /// hands out 1, 2, ... to recording threads. An explicit id equal to an
    /// OS thread's id lands on that thread's lane and label, so pick ids well
    /// above the number of recording threads (or pass `current_thread_id()` to
    /// join the caller's lane on purpose).
    pub fn on_thread(&self, thread_id: u64) -> ThreadRecorder<'_> {
        ThreadRecorder {
            buffer: self,
            thread_id,
        }
    }

    /// Open a span on the calling thread, closed when the guard drops.
    pub fn span(&self, name: &str) -> TraceSpan<'_> {
        self.span_with(name, Vec::new())
    }

    pub fn span_with(&self, name: &str, args: Vec<TraceArg>) -> TraceSpan<'_> {
        let thread_id = current_thread_id();
        self.record(Attribution::Current, Phase::Begin, name, self.timestamp(), 0, args);
        TraceSpan {
            buffer: self,
            name: event_name(name),
            thread_id,
        }
    }

    /// Give `thread_id` a display label, unless it already has one.
    pub fn register_thread_name(&self, thread_id: u64, label: impl Into<String>) {
        self.lock().threads.register(thread_id, label);
    }

    /// Registered label for a thread.
    pub fn thread_label(&self, thread_id: u64) -> Option<String> {
        self.lock().threads.get(thread_id).map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the current events and thread labels under the lock.
    pub fn snapshot(&self) -> TraceSnapshot {
        let state = self.lock();
        TraceSnapshot {
            start_time: self.start_time,
            events: state.events.clone(),
            threads: state.threads.clone(),
        }
    }

    fn record_complete(
        &self,
        attribution: Attribution,
        name: &str,
        start_timestamp: i64,
        now: i64,
        args: Vec<TraceArg>,
    ) {
        self.record(
            attribution,
            Phase::Complete,
            name,
            start_timestamp,
            now.saturating_sub(start_timestamp),
            args,
        );
    }

    fn record(
        &self,
        attribution: Attribution,
        phase: Phase,
        name: &str,
        timestamp: i64,
        duration: i64,
        args: Vec<TraceArg>,
    ) {
        if !self.is_tracing() {
            return;
        }

        let thread_id = attribution.thread_id();
        let event = TraceEvent {
            name: event_name(name),
            phase,
            timestamp,
            duration,
            thread_id,
            args,
        };

        let mut state = self.lock();
        match attribution {
            Attribution::Current => state
                .threads
                .register_with(thread_id, || current_thread_label(thread_id)),
            Attribution::Thread(_) => state
                .threads
                .register_with(thread_id, || default_label(thread_id)),
        }
        state.events.push(event);
    }

    /// Poisoning is ignored: every push completes before the guard drops, so
    /// the state behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records into a buffer on behalf of a fixed thread id.
///
/// Returned by [`TraceBuffer::on_thread`].
#[derive(Debug, Clone, Copy)]
pub struct ThreadRecorder<'a> {
    buffer: &'a TraceBuffer,
    thread_id: u64,
}

impl ThreadRecorder<'_> {
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    pub fn begin_event(&self, name: &str) {
        self.begin_event_with(name, Vec::new());
    }

    pub fn begin_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Phase::Begin, name, args);
    }

    pub fn end_event(&self, name: &str) {
        self.end_event_with(name, Vec::new());
    }

    pub fn end_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Phase::End, name, args);
    }

    pub fn instant_event(&self, name: &str) {
        self.instant_event_with(name, Vec::new());
    }

    pub fn instant_event_with(&self, name: &str, args: Vec<TraceArg>) {
        self.record(Phase::Instant, name, args);
    }

    pub fn complete_event(&self, name: &str, start_timestamp: i64) {
        self.complete_event_with(name, start_timestamp, Vec::new());
    }

    pub fn complete_event_with(&self, name: &str, start_timestamp: i64, args: Vec<TraceArg>) {
        let now = self.buffer.timestamp();
        self.buffer.record_complete(
            Attribution::Thread(self.thread_id),
            name,
            start_timestamp,
            now,
            args,
        );
    }

    fn record(&self, phase: Phase, name: &str, args: Vec<TraceArg>) {
        self.buffer.record(
            Attribution::Thread(self.thread_id),
            phase,
            name,
            self.buffer.timestamp(),
            0,
            args,
        );
    }
}

/// RAII span: records Begin when created and the matching End when dropped.
///
/// The End is attributed to the thread that opened the span, even if the
/// guard is dropped elsewhere.
#[must_use = "the span ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TraceSpan<'a> {
    buffer: &'a TraceBuffer,
    name: crate::event::EventName,
    thread_id: u64,
}

impl Drop for TraceSpan<'_> {
    fn drop(&mut self) {
        self.buffer.record(
            Attribution::Thread(self.thread_id),
            Phase::End,
            &self.name,
            self.buffer.timestamp(),
            0,
            Vec::new(),
        );
    }
}
