//! Pair up recorded events into spans and compute per-name statistics.

use std::collections::HashMap;
use std::time::Duration;

use crate::buffer::TraceSnapshot;
use crate::event::{EventName, Phase, TraceEvent};

/// Summary statistics for all spans sharing a name.
#[derive(Debug, Clone)]
pub struct SpanStats {
    pub name: String,
    pub count: usize,
    pub total: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub max: Duration,
}

/// Complete analysis of a trace snapshot.
#[derive(Debug)]
pub struct TraceSummary {
    /// Stats grouped by span name, largest total first
    pub span_stats: Vec<SpanStats>,
    /// Sum of all span durations (nested spans count twice)
    pub total_duration: Duration,
    /// Instant event counts by name, most frequent first
    pub instant_counts: Vec<(String, usize)>,
    /// Begin events never closed plus End events never opened
    pub unmatched: usize,
    /// Longest individual spans
    pub slowest_spans: Vec<(Duration, String)>,
    pub event_count: usize,
    pub thread_count: usize,
}

/// A measured span: name and duration.
type Span = (EventName, Duration);

/// Analyze a snapshot and produce a complete summary.
pub fn analyze(snapshot: &TraceSnapshot) -> TraceSummary {
    let (spans, unmatched) = collect_spans(snapshot);
    let span_stats = compute_span_stats(&spans);
    let total_duration = spans.iter().map(|(_, d)| *d).sum();
    let instant_counts = compute_instant_counts(snapshot);
    let slowest_spans = compute_slowest(&spans, 10);
    let thread_count = {
        let mut ids: Vec<u64> = snapshot.events.iter().map(|e| e.thread_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    };

    TraceSummary {
        span_stats,
        total_duration,
        instant_counts,
        unmatched,
        slowest_spans,
        event_count: snapshot.events.len(),
        thread_count,
    }
}

/// Turn Complete events and matched Begin/End pairs into spans.
///
/// Begin/End pairs match per (thread, name), innermost first, walking events
/// in timestamp order. Explicit thread ids and timestamps mean stored order is
/// not always time order; ties keep stored order.
fn collect_spans(snapshot: &TraceSnapshot) -> (Vec<Span>, usize) {
    let mut ordered: Vec<&TraceEvent> = snapshot.events.iter().collect();
    ordered.sort_by_key(|event| event.timestamp);

    let mut open: HashMap<(u64, &str), Vec<i64>> = HashMap::new();
    let mut spans = Vec::new();
    let mut unmatched = 0;

    for event in ordered {
        let key = (event.thread_id, event.name.as_str());
        match event.phase {
            Phase::Begin => open.entry(key).or_default().push(event.timestamp),
            Phase::End => match open.get_mut(&key).and_then(Vec::pop) {
                Some(start) => spans.push((
                    event.name.clone(),
                    micros_to_duration(event.timestamp.saturating_sub(start)),
                )),
                None => unmatched += 1,
            },
            Phase::Complete => {
                spans.push((event.name.clone(), micros_to_duration(event.duration)));
            }
            Phase::Instant | Phase::Metadata => {}
        }
    }

    unmatched += open.values().map(Vec::len).sum::<usize>();
    (spans, unmatched)
}

fn micros_to_duration(micros: i64) -> Duration {
    Duration::from_micros(micros.max(0) as u64)
}

/// Group spans by name and compute statistics for each group.
fn compute_span_stats(spans: &[Span]) -> Vec<SpanStats> {
    let mut groups: HashMap<&str, Vec<Duration>> = HashMap::new();
    for (name, duration) in spans {
        groups.entry(name.as_str()).or_default().push(*duration);
    }

    let mut stats: Vec<SpanStats> = groups
        .into_iter()
        .map(|(name, mut durations)| {
            durations.sort();
            let count = durations.len();
            let total: Duration = durations.iter().sum();
            let p50 = percentile(&durations, 50);
            let p90 = percentile(&durations, 90);
            let max = durations.last().copied().unwrap_or(Duration::ZERO);

            SpanStats {
                name: name.to_string(),
                count,
                total,
                p50,
                p90,
                max,
            }
        })
        .collect();

    // Largest total first; name keeps the order stable across runs
    stats.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    stats
}

/// Compute a percentile from sorted durations.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = (sorted.len() * pct / 100).min(sorted.len() - 1);
    sorted[idx]
}

fn compute_instant_counts(snapshot: &TraceSnapshot) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in &snapshot.events {
        if event.phase == Phase::Instant {
            *counts.entry(event.name.as_str()).or_default() += 1;
        }
    }

    let mut counts: Vec<_> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Get the N longest spans.
fn compute_slowest(spans: &[Span], n: usize) -> Vec<(Duration, String)> {
    let mut sorted: Vec<_> = spans
        .iter()
        .map(|(name, duration)| (*duration, name.to_string()))
        .collect();
    sorted.sort_by(|a, b| b.0.cmp(&a.0));
    sorted.truncate(n);
    sorted
}
