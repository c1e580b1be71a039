//! Merging buffers captured on separate threads with separate start times.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use trace_recorder::{TraceBuffer, merge};

fn capture(label: &str, events: usize) -> Arc<TraceBuffer> {
    let trace = TraceBuffer::create();
    let worker = Arc::clone(&trace);
    let label = label.to_string();
    thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            for _ in 0..events {
                let _span = worker.span(&label);
            }
        })
        .unwrap()
        .join()
        .unwrap();
    trace
}

#[test]
fn test_merge_properties() {
    let a = capture("first", 50);
    thread::sleep(Duration::from_millis(3));
    let b = capture("second", 30);

    let a_before = a.snapshot();
    let b_before = b.snapshot();
    let delta = (a.start_time() - b.start_time()).num_microseconds().unwrap();
    assert!(delta < 0, "a started before b");

    let merged = merge(&a, &b);
    let snapshot = merged.snapshot();

    // Counts add up
    assert_eq!(snapshot.events.len(), a_before.events.len() + b_before.events.len());

    // Sorted by aligned timestamp
    assert!(
        snapshot
            .events
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );

    // Every event from `a` is shifted by exactly the start-time difference
    let mut shifted: Vec<i64> = snapshot
        .events
        .iter()
        .filter(|e| e.name == "first")
        .map(|e| e.timestamp)
        .collect();
    let mut expected: Vec<i64> = a_before.events.iter().map(|e| e.timestamp + delta).collect();
    shifted.sort_unstable();
    expected.sort_unstable();
    assert_eq!(shifted, expected);

    // Labels for both capturing threads survive
    for event in &snapshot.events {
        assert!(snapshot.threads.contains(event.thread_id));
    }
    let labels: Vec<&str> = snapshot.threads.iter().map(|(_, label)| label).collect();
    assert!(labels.contains(&"first"));
    assert!(labels.contains(&"second"));

    // Inputs are unchanged
    let a_after = a.snapshot();
    let b_after = b.snapshot();
    assert_eq!(a_after.events, a_before.events);
    assert_eq!(b_after.events, b_before.events);
    assert_eq!(merged.start_time(), b.start_time());
}

#[test]
fn test_merge_while_writer_active() {
    let a = TraceBuffer::create();
    let b = TraceBuffer::create();

    let merged = thread::scope(|s| {
        let writer = {
            let a = Arc::clone(&a);
            s.spawn(move || {
                for _ in 0..1000 {
                    a.instant_event("busy");
                }
            })
        };
        let merged = merge(&a, &b);
        writer.join().unwrap();
        merged
    });

    // The merge saw some consistent prefix of the writer's events
    assert!(merged.len() <= 1000);
    assert_eq!(a.len(), 1000);
    let snapshot = merged.snapshot();
    assert!(
        snapshot
            .events
            .iter()
            .all(|e| snapshot.threads.contains(e.thread_id))
    );
}

#[test]
fn test_merged_buffer_accepts_new_events() {
    let merged = merge(&capture("x", 1), &capture("y", 1));
    let before = merged.len();
    merged.instant_event("after-merge");
    assert_eq!(merged.len(), before + 1);
}
