//! Combine buffers captured with independent start times.

use std::sync::Arc;

use crate::buffer::TraceBuffer;

/// Merge `a` and `b` into a new buffer on `b`'s timeline.
///
/// Events from `a` are shifted by `a.start_time - b.start_time` so both
/// inputs share one time base, then everything is stable-sorted by timestamp.
/// Thread labels from both inputs are kept; `b`'s label wins when both name
/// the same thread.
///
/// Each input is snapshotted under its own lock, one at a time, and neither
/// is modified. Whether either input is still tracing does not matter.
pub fn merge(a: &TraceBuffer, b: &TraceBuffer) -> Arc<TraceBuffer> {
    let a = a.snapshot();
    let b = b.snapshot();

    let delta = (a.start_time - b.start_time)
        .num_microseconds()
        .unwrap_or_default();

    let mut events = Vec::with_capacity(a.events.len() + b.events.len());
    events.extend(a.events.into_iter().map(|mut event| {
        event.timestamp = event.timestamp.saturating_add(delta);
        event
    }));
    events.extend(b.events);
    events.sort_by_key(|event| event.timestamp);

    let mut threads = a.threads;
    threads.overlay(&b.threads);

    log::debug!(
        "Merged {} events across {} threads (offset {}us)",
        events.len(),
        threads.len(),
        delta
    );

    TraceBuffer::from_parts(b.start_time, events, threads)
}
