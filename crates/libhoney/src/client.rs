//! Client - lifecycle controller and submission port
//!
//! A [`Client`] owns one engine instance (the default HTTP transmission
//! pipeline or a custom [`Sink`]), the response channel, and the root
//! event builder. Clients are cheap to clone and safe to share across
//! tasks; any number of clients can coexist in one process.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{Builder, Event};
use crate::response::{self, Response};
use crate::sampler::{RandomSampler, Sampler};
use crate::sink::Sink;
use crate::transmission::Transmission;

struct Inner {
    /// Active sink; `None` once the client has been closed
    sink: Mutex<Option<Arc<dyn Sink>>>,
    sampler: Arc<dyn Sampler>,
    root: RwLock<Builder>,
    /// Our half of the response fan-in; dropped on close so the receiver
    /// observes end-of-stream once the engine has drained
    response_tx: Mutex<Option<mpsc::Sender<Response>>>,
    response_rx: Mutex<Option<mpsc::Receiver<Response>>>,
    block_on_response: bool,
}

/// Handle to one engine instance
///
/// See the [crate docs](crate) for a usage example.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client and start its engine.
    ///
    /// Applies defaults to the configuration, instantiates the
    /// configured sink (or the default HTTP pipeline), and starts it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for an unparseable `api_host`, or
    /// the sink's startup error if it fails to start; nothing is left
    /// running in either case.
    pub async fn new(config: Config) -> Result<Self> {
        let config = config.sanitized();

        if !config.api_host.is_empty() {
            reqwest::Url::parse(&config.api_host)
                .map_err(|err| Error::InvalidUrl(err.to_string()))?;
        }

        let (response_tx, response_rx) =
            mpsc::channel((config.pending_work_capacity * 2).max(2));

        let sampler = config
            .sampler
            .clone()
            .unwrap_or_else(|| Arc::new(RandomSampler));

        let sink: Arc<dyn Sink> = match config.sink.clone() {
            Some(sink) => sink,
            None => Arc::new(Transmission::new(&config, response_tx.clone())),
        };
        sink.start().await?;

        tracing::debug!(
            dataset = %config.dataset,
            api_host = %config.api_host,
            sample_rate = config.sample_rate,
            "libhoney client initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                sink: Mutex::new(Some(sink)),
                sampler,
                root: RwLock::new(Builder::from_config(&config)),
                response_tx: Mutex::new(Some(response_tx)),
                response_rx: Mutex::new(Some(response_rx)),
                block_on_response: config.block_on_response,
            }),
        })
    }

    /// Create a new event pre-populated with the client's defaults and
    /// every field in the global scope
    pub fn new_event(&self) -> Event {
        self.inner.root.read().new_event()
    }

    /// Create an independent builder inheriting the client's defaults
    /// and the global-scope fields added so far
    pub fn new_builder(&self) -> Builder {
        self.inner.root.read().clone()
    }

    /// Add a field to the global scope, inherited by all events and
    /// builders created afterwards
    pub fn add_field(&self, key: impl Into<String>, value: impl Serialize) {
        self.inner.root.write().add_field(key, value);
    }

    /// Add every key/value of an object-shaped input to the global scope
    pub fn add(&self, data: impl Serialize) -> Result<()> {
        self.inner.root.write().add(data)
    }

    /// Add a dynamic field to the global scope; the closure runs once per
    /// created event
    pub fn add_dynamic_field(
        &self,
        name: impl Into<String>,
        supply: impl Fn() -> Value + Send + Sync + 'static,
    ) {
        self.inner.root.write().add_dynamic_field(name, supply);
    }

    /// Submit an event for delivery, sampling if its rate asks for it.
    ///
    /// Validates that the destination (api host, write key, dataset) is
    /// complete and that the event carries at least one field, returning
    /// a validation error synchronously otherwise. A sampled-out event is
    /// not an error: `send` returns `Ok` and the drop is reported with a
    /// response carrying [`Error::Sampled`].
    ///
    /// With `block_on_send` set this waits for work-queue space;
    /// otherwise it never blocks and overflow is reported via a response.
    pub async fn send(&self, mut event: Event) -> Result<()> {
        let sink = self.active_sink()?;
        event.validate()?;
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        event.sample_rate = event.sample_rate.max(1);
        if self.inner.sampler.should_drop(event.sample_rate) {
            tracing::debug!("dropping event due to sampling");
            self.respond_local(Error::Sampled, event.metadata).await;
            return Ok(());
        }

        sink.add(event).await;
        Ok(())
    }

    /// Submit an event without sampling it.
    ///
    /// For callers that decide sampling themselves: every event handed in
    /// is dispatched, and its `sample_rate` is passed along on the wire.
    pub async fn send_presampled(&self, mut event: Event) -> Result<()> {
        let sink = self.active_sink()?;
        event.validate()?;
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }
        sink.add(event).await;
        Ok(())
    }

    /// Take the response channel receiver.
    ///
    /// There is exactly one receiver; the first call gets it and later
    /// calls return `None`. The channel closes after [`Client::close`]
    /// has drained the engine.
    pub fn responses(&self) -> Option<mpsc::Receiver<Response>> {
        self.inner.response_rx.lock().take()
    }

    /// Drain everything in flight, then restart the engine.
    ///
    /// For environments where the process may terminate before batch
    /// timers fire. Flushing is **not** concurrency-safe with submission:
    /// an event submitted while the engine is mid-flush is not queued;
    /// it receives an immediate shutdown-drop response.
    pub async fn flush(&self) -> Result<()> {
        let sink = self.active_sink()?;
        tracing::debug!("flushing client");
        sink.stop().await?;
        sink.start().await
    }

    /// Stop the engine and close the response channel.
    ///
    /// Blocks until every event already accepted has been dispatched or
    /// reported as dropped. Call before process exit; a second call is a
    /// no-op. Submissions after close fail with [`Error::ClientClosed`].
    pub async fn close(&self) -> Result<()> {
        let sink = self.inner.sink.lock().take();
        let Some(sink) = sink else {
            return Ok(());
        };

        tracing::debug!("closing client");
        let result = sink.stop().await;
        drop(sink);

        // Dropping the last sender lets the response receiver observe
        // end-of-stream once in-flight responses are consumed.
        self.inner.response_tx.lock().take();
        result
    }

    fn active_sink(&self) -> Result<Arc<dyn Sink>> {
        self.inner.sink.lock().clone().ok_or(Error::ClientClosed)
    }

    async fn respond_local(&self, error: Error, metadata: Option<Value>) {
        let tx = self.inner.response_tx.lock().clone();
        if let Some(tx) = tx {
            response::deliver(
                &tx,
                Response::local(error, metadata),
                self.inner.block_on_response,
            )
            .await;
        }
    }
}
