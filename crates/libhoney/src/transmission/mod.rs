//! Transmission module - the default async batching pipeline
//!
//! The engine behind [`Client`](crate::Client) when no custom sink is
//! configured:
//!
//! ```text
//! add() ──→ work queue ──→ batcher ──→ ready queue ──→ dispatcher pool ──→ HTTP
//!                          (per-destination,            (bounded width)     │
//!                           size + deadline)                                │
//!            response channel ←── per-event outcomes ←──────────────────────┘
//! ```
//!
//! The work queue and response channel are `tokio::sync::mpsc` (single
//! consumer); the ready queue is a `crossfire` MPMC channel shared by the
//! dispatcher workers. The batcher task is the sole owner of the open
//! batch map; the three channels are the only cross-task rendezvous
//! points.

pub(crate) mod batcher;
pub(crate) mod dispatcher;
pub(crate) mod http;
pub(crate) mod metrics;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossfire::MAsyncRx;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::Error;
use crate::event::Event;
use crate::response::{self, Response};
use crate::sink::Sink;

use batcher::{Batch, Batcher};
use dispatcher::BatchSender;
use http::HttpSender;
use metrics::TransmissionMetrics;

/// Engine options frozen at construction
struct EngineOptions {
    max_batch_size: usize,
    batch_timeout: Duration,
    max_concurrent_batches: usize,
    pending_work_capacity: usize,
    block_on_send: bool,
    block_on_response: bool,
    user_agent: String,
    http_client: reqwest::Client,
}

/// Channel ends and task handles of a started engine
struct Running {
    work_tx: mpsc::Sender<Event>,

    /// Spare handle on the ready queue. Idle while workers run; when the
    /// pool width is zero it is the shutdown path's way of consuming
    /// sealed batches that nothing else will.
    ready_rx: MAsyncRx<Batch>,

    batcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

/// The default sink: batching HTTP transmission.
///
/// `start` spawns the batcher and dispatcher tasks; `stop` closes the
/// work queue and blocks until everything in flight has drained and
/// produced responses. While stopped (including mid-`flush`), `add`
/// sheds events with an immediate shutdown-drop response instead of
/// queueing them.
pub(crate) struct Transmission {
    options: EngineOptions,
    response_tx: mpsc::Sender<Response>,
    metrics: Arc<TransmissionMetrics>,
    batch_sender: Option<Arc<dyn BatchSender>>,
    state: Mutex<Option<Running>>,
}

impl Transmission {
    /// Build an engine delivering over HTTP
    pub(crate) fn new(config: &Config, response_tx: mpsc::Sender<Response>) -> Self {
        Self {
            options: EngineOptions {
                max_batch_size: config.max_batch_size,
                batch_timeout: config.batch_timeout,
                max_concurrent_batches: config.max_concurrent_batches,
                pending_work_capacity: config.pending_work_capacity,
                block_on_send: config.block_on_send,
                block_on_response: config.block_on_response,
                user_agent: http::build_user_agent(&config.user_agent_addition),
                http_client: config
                    .http_client
                    .clone()
                    .unwrap_or_else(http::default_client),
            },
            response_tx,
            metrics: Arc::new(TransmissionMetrics::new()),
            batch_sender: None,
            state: Mutex::new(None),
        }
    }

    /// Build an engine delivering to an arbitrary batch sender (tests)
    #[cfg(test)]
    pub(crate) fn with_batch_sender(
        config: &Config,
        response_tx: mpsc::Sender<Response>,
        batch_sender: Arc<dyn BatchSender>,
    ) -> Self {
        let mut transmission = Self::new(config, response_tx);
        transmission.batch_sender = Some(batch_sender);
        transmission
    }

    #[cfg(test)]
    pub(crate) fn metrics_snapshot(&self) -> metrics::MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shed one event with an immediate shutdown-drop response
    async fn shed_event(&self, event: Event) {
        self.metrics.record_shed(1);
        response::deliver(
            &self.response_tx,
            Response::local(Error::ShutdownDrop, event.metadata),
            self.options.block_on_response,
        )
        .await;
    }
}

#[async_trait]
impl Sink for Transmission {
    async fn start(&self) -> Result<(), Error> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Ok(());
        }

        let (work_tx, work_rx) = mpsc::channel(self.options.pending_work_capacity);
        let (ready_tx, ready_rx) =
            crossfire::mpmc::bounded_async(self.options.max_concurrent_batches.max(1));

        let batch_sender: Arc<dyn BatchSender> = match &self.batch_sender {
            Some(sender) => Arc::clone(sender),
            None => Arc::new(HttpSender::new(
                self.options.http_client.clone(),
                self.options.user_agent.clone(),
                self.response_tx.clone(),
                self.options.block_on_response,
                Arc::clone(&self.metrics),
            )),
        };

        let batcher = Batcher::new(
            work_rx,
            ready_tx,
            self.response_tx.clone(),
            Arc::clone(&self.metrics),
            self.options.max_batch_size,
            self.options.batch_timeout,
            self.options.block_on_response,
        );
        let batcher_handle = tokio::spawn(batcher.run());
        let workers = dispatcher::spawn_workers(
            self.options.max_concurrent_batches,
            ready_rx.clone(),
            batch_sender,
        );

        tracing::debug!(
            workers = workers.len(),
            pending_work_capacity = self.options.pending_work_capacity,
            "transmission started"
        );

        *state = Some(Running {
            work_tx,
            ready_rx,
            batcher: batcher_handle,
            workers,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), Error> {
        let running = self.state.lock().take();
        let Some(Running {
            work_tx,
            ready_rx,
            batcher,
            workers,
        }) = running
        else {
            return Ok(());
        };

        tracing::debug!("transmission stopping");

        // Closing the work queue tells the batcher to seal and drain.
        drop(work_tx);

        let shed = if workers.is_empty() {
            // Dispatch is suspended: consume sealed batches ourselves so
            // every drained event still gets a response.
            let response_tx = self.response_tx.clone();
            let block = self.options.block_on_response;
            let metrics = Arc::clone(&self.metrics);
            Some(tokio::spawn(async move {
                while let Ok(batch) = ready_rx.recv().await {
                    metrics.record_shed(batch.events.len() as u64);
                    for event in batch.events {
                        response::deliver(
                            &response_tx,
                            Response::local(Error::ShutdownDrop, event.metadata),
                            block,
                        )
                        .await;
                    }
                }
            }))
        } else {
            drop(ready_rx);
            None
        };

        if let Err(err) = batcher.await {
            tracing::error!(error = %err, "batcher task failed");
        }
        for worker in workers {
            if let Err(err) = worker.await {
                tracing::error!(error = %err, "dispatcher worker failed");
            }
        }
        if let Some(shed) = shed {
            if let Err(err) = shed.await {
                tracing::error!(error = %err, "shed task failed");
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            events_enqueued = snapshot.events_enqueued,
            events_overflowed = snapshot.events_overflowed,
            events_shed = snapshot.events_shed,
            batches_sent = snapshot.batches_sent,
            batches_failed = snapshot.batches_failed,
            events_delivered = snapshot.events_delivered,
            "transmission stopped"
        );
        Ok(())
    }

    async fn add(&self, event: Event) {
        let work_tx = self
            .state
            .lock()
            .as_ref()
            .map(|running| running.work_tx.clone());

        let Some(work_tx) = work_tx else {
            self.shed_event(event).await;
            return;
        };

        if self.options.block_on_send {
            match work_tx.send(event).await {
                Ok(()) => self.metrics.record_enqueued(),
                Err(err) => self.shed_event(err.0).await,
            }
        } else {
            match work_tx.try_send(event) {
                Ok(()) => self.metrics.record_enqueued(),
                Err(mpsc::error::TrySendError::Full(event)) => {
                    self.metrics.record_overflow();
                    tracing::debug!("work queue full; dropping event");
                    response::deliver(
                        &self.response_tx,
                        Response::local(Error::QueueOverflow, event.metadata),
                        self.options.block_on_response,
                    )
                    .await;
                }
                Err(mpsc::error::TrySendError::Closed(event)) => {
                    self.shed_event(event).await;
                }
            }
        }
    }
}
