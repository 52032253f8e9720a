//! Batcher - coalesces events into per-destination batches
//!
//! Single-owner task between the work queue and the dispatcher pool.
//! Events are partitioned by destination key; each open batch is sealed
//! when it reaches `max_batch_size` events or when its deadline
//! (first-append time + `batch_timeout`) expires. One `sleep_until` on
//! the earliest open deadline stands in for a timer per batch, so
//! sealing a batch can never leak a timer.
//!
//! When the work queue closes, every open batch is sealed and enqueued
//! unconditionally before the task exits. If the ready queue has no
//! consumers left, the sealed events are shed with shutdown-drop
//! responses instead of being lost silently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossfire::MAsyncTx;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::error::Error;
use crate::event::{DestinationKey, Event};
use crate::response::{self, Response};
use crate::transmission::metrics::TransmissionMetrics;

/// A sealed, non-empty run of events sharing one destination key
pub(crate) struct Batch {
    /// Monotonic id for logging and tracing
    pub id: u64,

    /// Destination shared by every event in the batch
    pub key: DestinationKey,

    /// Events in submission order
    pub events: Vec<Event>,

    /// When the first event was appended
    pub created_at: Instant,
}

/// An accumulating batch that has not been sealed yet
struct OpenBatch {
    id: u64,
    events: Vec<Event>,
    deadline: Instant,
    created_at: Instant,
}

enum Wake {
    Event(Event),
    Deadline,
    Closed,
}

/// The batching task; consumed by [`Batcher::run`]
pub(crate) struct Batcher {
    work_rx: mpsc::Receiver<Event>,
    ready_tx: MAsyncTx<Batch>,
    response_tx: mpsc::Sender<Response>,
    metrics: Arc<TransmissionMetrics>,
    max_batch_size: usize,
    batch_timeout: Duration,
    block_on_response: bool,
    open: HashMap<DestinationKey, OpenBatch>,
    next_batch_id: u64,
}

impl Batcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        work_rx: mpsc::Receiver<Event>,
        ready_tx: MAsyncTx<Batch>,
        response_tx: mpsc::Sender<Response>,
        metrics: Arc<TransmissionMetrics>,
        max_batch_size: usize,
        batch_timeout: Duration,
        block_on_response: bool,
    ) -> Self {
        Self {
            work_rx,
            ready_tx,
            response_tx,
            metrics,
            max_batch_size,
            batch_timeout,
            block_on_response,
            open: HashMap::new(),
            next_batch_id: 0,
        }
    }

    /// Run until the work queue closes, then seal and enqueue every open
    /// batch before exiting.
    pub(crate) async fn run(mut self) {
        tracing::debug!(
            max_batch_size = self.max_batch_size,
            batch_timeout_ms = self.batch_timeout.as_millis() as u64,
            "batcher starting"
        );

        loop {
            let wake = match self.earliest_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        received = self.work_rx.recv() => match received {
                            Some(event) => Wake::Event(event),
                            None => Wake::Closed,
                        },
                        _ = time::sleep_until(deadline) => Wake::Deadline,
                    }
                }
                None => match self.work_rx.recv().await {
                    Some(event) => Wake::Event(event),
                    None => Wake::Closed,
                },
            };

            match wake {
                Wake::Event(event) => self.append(event).await,
                Wake::Deadline => self.flush_due().await,
                Wake::Closed => break,
            }
        }

        self.drain().await;
        tracing::debug!("batcher stopped");
    }

    fn earliest_deadline(&self) -> Option<Instant> {
        self.open.values().map(|batch| batch.deadline).min()
    }

    /// Append one event to its destination's open batch, creating the
    /// batch (and arming its deadline) on first append. Seals the batch
    /// if it reaches the size trigger.
    async fn append(&mut self, event: Event) {
        let key = event.destination();

        if !self.open.contains_key(&key) {
            let id = self.next_batch_id;
            self.next_batch_id += 1;
            let now = Instant::now();
            tracing::trace!(batch_id = id, dataset = %key.dataset, "opened batch");
            self.open.insert(
                key.clone(),
                OpenBatch {
                    id,
                    events: Vec::new(),
                    deadline: now + self.batch_timeout,
                    created_at: now,
                },
            );
        }

        let full = match self.open.get_mut(&key) {
            Some(open) => {
                open.events.push(event);
                open.events.len() >= self.max_batch_size
            }
            None => false,
        };

        if full {
            if let Some(open) = self.open.remove(&key) {
                self.seal(key, open).await;
            }
        }
    }

    /// Seal every open batch whose deadline has passed
    async fn flush_due(&mut self) {
        let now = Instant::now();
        let due: Vec<DestinationKey> = self
            .open
            .iter()
            .filter(|(_, batch)| batch.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in due {
            if let Some(open) = self.open.remove(&key) {
                self.seal(key, open).await;
            }
        }
    }

    /// Seal every open batch unconditionally (shutdown path)
    async fn drain(&mut self) {
        let open = std::mem::take(&mut self.open);
        for (key, batch) in open {
            self.seal(key, batch).await;
        }
    }

    /// Hand a sealed batch to the dispatcher pool. Blocks when the ready
    /// queue is full, pushing backpressure up through the work queue.
    async fn seal(&self, key: DestinationKey, open: OpenBatch) {
        let batch = Batch {
            id: open.id,
            key,
            events: open.events,
            created_at: open.created_at,
        };

        tracing::debug!(
            batch_id = batch.id,
            events = batch.events.len(),
            dataset = %batch.key.dataset,
            "sealed batch"
        );

        if let Err(err) = self.ready_tx.send(batch).await {
            // Every dispatcher is gone; nothing will ever consume this.
            let batch = err.0;
            tracing::debug!(
                batch_id = batch.id,
                events = batch.events.len(),
                "no dispatcher available; shedding sealed batch"
            );
            self.shed(batch.events).await;
        }
    }

    /// Report a shutdown-drop response for each shed event
    async fn shed(&self, events: Vec<Event>) {
        self.metrics.record_shed(events.len() as u64);
        for event in events {
            response::deliver(
                &self.response_tx,
                Response::local(Error::ShutdownDrop, event.metadata),
                self.block_on_response,
            )
            .await;
        }
    }
}

#[cfg(test)]
#[path = "batcher_test.rs"]
mod batcher_test;
