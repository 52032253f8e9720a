//! Sink module - pluggable terminal consumers of events
//!
//! A [`Sink`] is where validated, non-sampled events go. The default is
//! the crate's HTTP transmission engine; supplying a custom sink via
//! [`Config::with_sink`](crate::Config::with_sink) replaces that whole
//! pipeline, so the submission path feeds the sink directly.
//!
//! Two sinks ship with the crate:
//!
//! - [`MockSink`] records events in memory for assertions in tests,
//! - [`WriterSink`] writes wire-format JSON lines to stdout or a file
//!   for local development.

mod mock;
mod writer;

use async_trait::async_trait;

use crate::error::Error;
use crate::event::Event;

pub use mock::MockSink;
pub use writer::WriterSink;

/// Terminal consumer of events.
///
/// Implementations are shared behind an `Arc` and must tolerate
/// concurrent `add` calls. `start` is invoked once during client
/// construction; a failure there aborts construction. `stop` must drain
/// anything buffered before returning.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Bring the sink up. Called before any `add`.
    async fn start(&self) -> Result<(), Error>;

    /// Drain buffered work and shut down.
    async fn stop(&self) -> Result<(), Error>;

    /// Accept one event. Delivery problems are reported out of band
    /// (responses, logs), never returned.
    async fn add(&self, event: Event);
}
