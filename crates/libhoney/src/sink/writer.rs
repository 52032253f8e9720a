//! Writer sink - wire-format JSON lines to any writer
//!
//! Local-development sink: each event is written as one line of the same
//! JSON object the batch endpoint would receive. Point it at stdout to
//! eyeball events, or at a file to capture a session.

use std::io::Write;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Error;
use crate::event::Event;
use crate::sink::Sink;

/// Sink that writes one JSON line per event
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use libhoney::{Config, WriterSink};
///
/// let config = Config::default()
///     .with_write_key("key")
///     .with_dataset("set")
///     .with_sink(Arc::new(WriterSink::stdout()));
/// ```
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    /// Write events to the given writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Write events to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl Sink for WriterSink {
    async fn start(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), Error> {
        if let Err(err) = self.writer.lock().flush() {
            tracing::warn!(error = %err, "failed to flush writer sink");
        }
        Ok(())
    }

    async fn add(&self, event: Event) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize event for writer sink");
                return;
            }
        };

        let mut writer = self.writer.lock();
        if let Err(err) = writeln!(writer, "{line}") {
            tracing::warn!(error = %err, "failed to write event");
        }
    }
}
