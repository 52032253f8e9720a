//! Mock sink - records events in memory
//!
//! Test double for the transmission engine. Register it via
//! [`Config::with_sink`](crate::Config::with_sink), send events through
//! the client, then assert on [`MockSink::events`].

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Error;
use crate::event::Event;
use crate::sink::Sink;

#[derive(Default)]
struct MockState {
    started: bool,
    events: Vec<Event>,
    start_error: Option<Error>,
}

/// In-memory sink for tests
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use libhoney::{Client, Config, MockSink};
///
/// # async fn run() -> libhoney::Result<()> {
/// let mock = Arc::new(MockSink::new());
/// let client = Client::new(
///     Config::default()
///         .with_write_key("key")
///         .with_dataset("set")
///         .with_sink(mock.clone()),
/// )
/// .await?;
///
/// let mut event = client.new_event();
/// event.add_field("n", 1);
/// client.send(event).await?;
///
/// assert_eq!(mock.event_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockSink {
    state: Mutex<MockState>,
}

impl MockSink {
    /// Create a mock sink that starts successfully
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock sink whose `start` fails with the given error,
    /// for exercising construction failure paths
    pub fn failing_with(error: Error) -> Self {
        Self {
            state: Mutex::new(MockState {
                start_error: Some(error),
                ..MockState::default()
            }),
        }
    }

    /// True if `start` has run (and `stop` has not)
    pub fn started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of events received so far
    pub fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Snapshot of every event received, in arrival order
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }
}

#[async_trait]
impl Sink for MockSink {
    async fn start(&self) -> Result<(), Error> {
        let mut state = self.state.lock();
        if let Some(error) = state.start_error.clone() {
            return Err(error);
        }
        state.started = true;
        Ok(())
    }

    async fn stop(&self) -> Result<(), Error> {
        self.state.lock().started = false;
        Ok(())
    }

    async fn add(&self, event: Event) {
        self.state.lock().events.push(event);
    }
}
