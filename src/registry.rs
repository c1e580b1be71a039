//! Thread identity and display labels.
//!
//! Rust's [`std::thread::ThreadId`] has no stable integer form, so each OS
//! thread is handed a small sequential id the first time it records an event.
//! The id is cached in thread-local storage and never reused within a process.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Next id to hand out. Zero is left unused so it can mark process-level metadata.
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Logical id of the calling thread.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|cell| {
        if let Some(id) = cell.get() {
            return id;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cell.set(Some(id));
        id
    })
}

/// Label used for a thread that was never explicitly named.
pub fn default_label(thread_id: u64) -> String {
    format!("Thread {thread_id}")
}

/// Label for the calling thread: its OS name when set, else the default.
pub(crate) fn current_thread_label(thread_id: u64) -> String {
    match std::thread::current().name() {
        Some(name) => name.to_string(),
        None => default_label(thread_id),
    }
}

/// Thread id to display label, in registration order.
///
/// Registration is first-write-wins: once a thread has a label, later
/// [`register`](Self::register) calls for it are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadRegistry {
    labels: IndexMap<u64, String>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `label` for `thread_id` unless one exists. Returns whether it was inserted.
    pub fn register(&mut self, thread_id: u64, label: impl Into<String>) -> bool {
        if self.labels.contains_key(&thread_id) {
            return false;
        }
        self.labels.insert(thread_id, label.into());
        true
    }

    /// Register a label computed only when the thread is unknown.
    pub(crate) fn register_with(&mut self, thread_id: u64, label: impl FnOnce() -> String) {
        self.labels.entry(thread_id).or_insert_with(label);
    }

    pub fn get(&self, thread_id: u64) -> Option<&str> {
        self.labels.get(&thread_id).map(String::as_str)
    }

    /// Registered label, or the default label for an unknown thread.
    pub fn label_or_default(&self, thread_id: u64) -> String {
        match self.get(thread_id) {
            Some(label) => label.to_string(),
            None => default_label(thread_id),
        }
    }

    pub fn contains(&self, thread_id: u64) -> bool {
        self.labels.contains_key(&thread_id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    /// Copy every entry of `other` into `self`, overwriting on collision.
    pub(crate) fn overlay(&mut self, other: &ThreadRegistry) {
        for (id, label) in &other.labels {
            self.labels.insert(*id, label.clone());
        }
    }
}
