//! Event sinks.
//!
//! Provides a thread-safe ring-buffer sink that accumulates stamped events
//! with automatic sequence assignment, plus subscriber callbacks for
//! real-time consumers.

use super::event::{NetworkEvent, StampedEvent};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Maximum number of events kept by the default ring buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Trait for event consumers.
pub trait EventSink: Send + Sync {
    /// Record an event.
    fn emit(&self, event: NetworkEvent);

    /// Number of recorded events.
    fn len(&self) -> usize;

    /// Whether the sink holds no events.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Type alias for event subscriber callbacks.
type Subscribers = RwLock<Vec<Arc<dyn Fn(&StampedEvent) + Send + Sync>>>;

/// Thread-safe event sink with a bounded ring buffer.
pub struct RingBufferSink {
    buffer: RwLock<VecDeque<StampedEvent>>,
    capacity: usize,
    next_seq: AtomicU64,
    subscribers: Subscribers,
}

impl RingBufferSink {
    /// Create a new sink with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            next_seq: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Create a sink with default capacity.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }

    /// Add a subscriber for real-time event notifications.
    pub fn subscribe(&self, callback: Arc<dyn Fn(&StampedEvent) + Send + Sync>) {
        self.subscribers.write().push(callback);
    }

    /// All recorded events, oldest first.
    pub fn all(&self) -> Vec<StampedEvent> {
        self.buffer.read().iter().cloned().collect()
    }

    /// The most recent `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<StampedEvent> {
        self.buffer.read().iter().rev().take(limit).cloned().collect()
    }

    /// Events matching a tag (e.g. "component-errored").
    pub fn by_tag(&self, tag: &str) -> Vec<StampedEvent> {
        self.buffer
            .read()
            .iter()
            .filter(|e| e.event.tag() == tag)
            .cloned()
            .collect()
    }

    /// Events recorded after the given sequence number.
    pub fn since(&self, seq: u64) -> Vec<StampedEvent> {
        self.buffer
            .read()
            .iter()
            .filter(|e| e.seq > seq)
            .cloned()
            .collect()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.buffer.write().clear();
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventSink for RingBufferSink {
    fn emit(&self, event: NetworkEvent) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let stamped = StampedEvent::now(seq, event);

        for subscriber in self.subscribers.read().iter() {
            subscriber(&stamped);
        }

        let mut buffer = self.buffer.write();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(stamped);
    }

    fn len(&self) -> usize {
        self.buffer.read().len()
    }
}

impl Default for RingBufferSink {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// A sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: NetworkEvent) {}

    fn len(&self) -> usize {
        0
    }
}
