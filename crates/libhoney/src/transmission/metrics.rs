//! Transmission engine counters
//!
//! Shared atomic counters recorded on the hot path and reported in the
//! engine's shutdown log.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one transmission engine
#[derive(Debug, Default)]
pub(crate) struct TransmissionMetrics {
    /// Events accepted onto the work queue
    events_enqueued: AtomicU64,

    /// Events dropped because the work queue was full
    events_overflowed: AtomicU64,

    /// Events shed with a shutdown-drop response
    events_shed: AtomicU64,

    /// Batches delivered with a 2xx status
    batches_sent: AtomicU64,

    /// Batches that failed (transport, server, or parse errors)
    batches_failed: AtomicU64,

    /// Events acknowledged by the server
    events_delivered: AtomicU64,
}

impl TransmissionMetrics {
    pub(crate) const fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_overflowed: AtomicU64::new(0),
            events_shed: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overflow(&self) {
        self.events_overflowed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_shed(&self, events: u64) {
        self.events_shed.fetch_add(events, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_sent(&self, events: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.events_delivered.fetch_add(events, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_overflowed: self.events_overflowed.load(Ordering::Relaxed),
            events_shed: self.events_shed.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of transmission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MetricsSnapshot {
    pub events_enqueued: u64,
    pub events_overflowed: u64,
    pub events_shed: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub events_delivered: u64,
}
