//! Concurrent recording through the public API.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use trace_recorder::{Phase, TraceBuffer, trace_args};

const THREADS: usize = 8;
const EVENTS_PER_THREAD: usize = 500;

/// Every event from every writer lands exactly once, with a registered thread.
#[test]
fn test_concurrent_writers_lose_nothing() {
    let trace = TraceBuffer::create();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|writer| {
            let trace = Arc::clone(&trace);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..EVENTS_PER_THREAD {
                    trace.instant_event_with("tick", trace_args!["writer" => writer, "seq" => seq]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = trace.snapshot();
    assert_eq!(snapshot.events.len(), THREADS * EVENTS_PER_THREAD);

    let unique: HashSet<String> = snapshot
        .events
        .iter()
        .map(|e| format!("{:?}", e.args))
        .collect();
    assert_eq!(unique.len(), THREADS * EVENTS_PER_THREAD, "No duplicates");

    let thread_ids: HashSet<u64> = snapshot.events.iter().map(|e| e.thread_id).collect();
    assert_eq!(thread_ids.len(), THREADS);
    assert!(thread_ids.iter().all(|id| snapshot.threads.contains(*id)));
}

/// Events from one thread stay in that thread's call order.
#[test]
fn test_per_thread_order_preserved() {
    let trace = TraceBuffer::create();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    let _span = trace.span("unit");
                }
            });
        }
    });

    let snapshot = trace.snapshot();
    let thread_ids: HashSet<u64> = snapshot.events.iter().map(|e| e.thread_id).collect();
    for id in thread_ids {
        let phases: Vec<Phase> = snapshot
            .events
            .iter()
            .filter(|e| e.thread_id == id)
            .map(|e| e.phase)
            .collect();
        assert_eq!(phases.len(), 400);
        assert!(
            phases
                .chunks(2)
                .all(|pair| pair == [Phase::Begin, Phase::End])
        );
    }
}

/// Labels registered concurrently with recording never go missing.
#[test]
fn test_registration_races_with_recording() {
    let trace = TraceBuffer::create();

    thread::scope(|s| {
        for id in 0..16u64 {
            let trace = &trace;
            s.spawn(move || trace.on_thread(id).instant_event("virtual"));
            s.spawn(move || trace.register_thread_name(id, format!("lane-{id}")));
        }
    });

    let snapshot = trace.snapshot();
    assert_eq!(snapshot.events.len(), 16);
    for id in 0..16u64 {
        let label = snapshot.threads.get(id).unwrap();
        assert!(label == format!("lane-{id}") || label == format!("Thread {id}"));
    }
}

/// Stopping mid-capture keeps what was recorded and drops the rest.
#[test]
fn test_stop_tracing_while_writers_run() {
    let trace = TraceBuffer::create();
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let trace = Arc::clone(&trace);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            for _ in 0..100 {
                trace.instant_event("before");
            }
            barrier.wait();
            barrier.wait();
            for _ in 0..100 {
                trace.instant_event("after");
            }
        })
    };

    barrier.wait();
    trace.stop_tracing();
    barrier.wait();
    writer.join().unwrap();

    let snapshot = trace.snapshot();
    assert_eq!(snapshot.events.len(), 100);
    assert!(snapshot.events.iter().all(|e| e.name == "before"));
}
