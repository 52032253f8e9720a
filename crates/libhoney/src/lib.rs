//! Libhoney Client Library
//!
//! Async client for sending structured events to the Honeycomb events API.
//! Events are coalesced into per-dataset batches and delivered over pooled
//! HTTP by a background pipeline, so `send` never waits on the network.
//!
//! # Architecture
//!
//! ```text
//! [Caller]                        [Engine]                      [Honeycomb]
//!   send() ──→ sampler ──→ work queue ──→ batcher ──→ ready ──→ dispatcher
//!                 │                        (per-dataset,  queue   pool ──→ POST /1/batch/<dataset>
//!                 │                         size + timer)                        │
//!                 └──────────────→ response channel ←── per-event statuses ←────┘
//! ```
//!
//! - **Batching**: events sharing an (api host, write key, dataset) triple
//!   are collected into one batch, sealed at `max_batch_size` events or
//!   after `batch_timeout`, whichever comes first.
//! - **Bounded concurrency**: at most `max_concurrent_batches` HTTP
//!   requests are in flight at once.
//! - **Backpressure**: `block_on_send` selects between waiting for queue
//!   space and dropping the event with a queue-overflow response.
//! - **Responses**: every accepted event produces exactly one [`Response`]
//!   on the channel returned by [`Client::responses`]: delivered, server
//!   error, transport error, sampled, or dropped on overflow/shutdown.
//!
//! # Quick Start
//!
//! ```no_run
//! use libhoney::{Client, Config};
//!
//! # async fn run() -> libhoney::Result<()> {
//! let client = Client::new(
//!     Config::default()
//!         .with_write_key("YOUR_WRITE_KEY")
//!         .with_dataset("my-dataset"),
//! )
//! .await?;
//!
//! let mut event = client.new_event();
//! event.add_field("method", "GET");
//! event.add_field("duration_ms", 153.12);
//! client.send(event).await?;
//!
//! // Flush buffers before the process exits.
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing and local use
//!
//! Supply a [`sink::MockSink`] (records events in memory) or a
//! [`sink::WriterSink`] (writes wire-format JSON lines to stdout or a file)
//! via [`Config::with_sink`] to replace the HTTP pipeline entirely.

mod client;
mod config;
mod error;
pub mod event;
mod response;
mod sampler;
pub mod sink;
mod transmission;
mod verify;

pub use client::Client;
pub use config::{
    Config, DEFAULT_API_HOST, DEFAULT_BATCH_TIMEOUT, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_CONCURRENT_BATCHES, DEFAULT_PENDING_WORK_CAPACITY, DEFAULT_SAMPLE_RATE,
};
pub use error::{Error, Result};
pub use event::{Builder, Event, Fields};
pub use response::Response;
pub use sampler::{RandomSampler, Sampler};
pub use sink::{MockSink, Sink, WriterSink};
pub use verify::verify_write_key;
