//! Client configuration
//!
//! Code-level configuration with sensible defaults: a zero-config
//! `Config::default()` only needs a write key and dataset before it can
//! send. The engine options cannot be changed after the client is built.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::sampler::Sampler;
use crate::sink::Sink;

/// Default ingest endpoint
pub const DEFAULT_API_HOST: &str = "https://api.honeycomb.io/";

/// Default sample rate (1 = keep every event)
pub const DEFAULT_SAMPLE_RATE: u32 = 1;

/// How many events to collect into a batch before sealing it
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// How long an under-filled batch may wait before it is sealed anyway
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(100);

/// How many batches may be in flight over HTTP simultaneously
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 80;

/// How many events may queue up for the batcher
pub const DEFAULT_PENDING_WORK_CAPACITY: usize = 10_000;

/// Configuration for a [`Client`](crate::Client)
///
/// # Example
///
/// ```
/// use libhoney::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .with_write_key("YOUR_WRITE_KEY")
///     .with_dataset("my-dataset")
///     .with_batch_timeout(Duration::from_millis(50));
/// ```
#[derive(Clone)]
pub struct Config {
    /// Default authentication token for all events
    pub write_key: String,

    /// Default destination dataset for all events
    pub dataset: String,

    /// Default sample rate; 1 means no sampling, N means keep 1 in N
    pub sample_rate: u32,

    /// Base URL of the ingest API
    pub api_host: String,

    /// Size trigger for sealing a batch
    pub max_batch_size: usize,

    /// Time trigger for sealing an under-filled batch
    pub batch_timeout: Duration,

    /// Width of the dispatcher pool; bounds in-flight HTTP requests.
    /// Zero suspends dispatch entirely (testing hook).
    pub max_concurrent_batches: usize,

    /// Depth of the work queue between submitters and the batcher
    pub pending_work_capacity: usize,

    /// If true, `send` waits for work-queue space instead of dropping
    /// the event with a queue-overflow response
    pub block_on_send: bool,

    /// If true, response delivery waits for channel space, applying
    /// backpressure end-to-end through the pipeline; if false, responses
    /// are dropped when nobody is reading them
    pub block_on_response: bool,

    /// Appended to the `User-Agent` header, separated by a space.
    /// Expected format is `product-name/version`.
    pub user_agent_addition: String,

    /// Preconfigured HTTP client; intended for tests asserting on
    /// transport behavior. Defaults to a pooled client with a timeout.
    pub http_client: Option<reqwest::Client>,

    /// Replaces the default HTTP pipeline entirely; events handed to
    /// `send` are fed to this sink after validation and sampling
    pub sink: Option<Arc<dyn Sink>>,

    /// Sampling decision hook; defaults to a thread-local uniform RNG.
    /// Intended for deterministic tests.
    pub sampler: Option<Arc<dyn Sampler>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_key: String::new(),
            dataset: String::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            api_host: DEFAULT_API_HOST.into(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            pending_work_capacity: DEFAULT_PENDING_WORK_CAPACITY,
            block_on_send: false,
            block_on_response: false,
            user_agent_addition: String::new(),
            http_client: None,
            sink: None,
            sampler: None,
        }
    }
}

impl Config {
    /// Set the default write key
    #[must_use]
    pub fn with_write_key(mut self, write_key: impl Into<String>) -> Self {
        self.write_key = write_key.into();
        self
    }

    /// Set the default dataset
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the default sample rate
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the ingest API base URL
    #[must_use]
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Set the batch size trigger
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Set the batch time trigger
    #[must_use]
    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    /// Set the dispatcher pool width
    #[must_use]
    pub fn with_max_concurrent_batches(mut self, max_concurrent_batches: usize) -> Self {
        self.max_concurrent_batches = max_concurrent_batches;
        self
    }

    /// Set the work queue depth
    #[must_use]
    pub fn with_pending_work_capacity(mut self, pending_work_capacity: usize) -> Self {
        self.pending_work_capacity = pending_work_capacity;
        self
    }

    /// Choose the submission overflow policy
    #[must_use]
    pub fn with_block_on_send(mut self, block_on_send: bool) -> Self {
        self.block_on_send = block_on_send;
        self
    }

    /// Choose the response overflow policy
    #[must_use]
    pub fn with_block_on_response(mut self, block_on_response: bool) -> Self {
        self.block_on_response = block_on_response;
        self
    }

    /// Append a product identifier to the `User-Agent` header
    #[must_use]
    pub fn with_user_agent_addition(mut self, addition: impl Into<String>) -> Self {
        self.user_agent_addition = addition.into();
        self
    }

    /// Supply a preconfigured HTTP client
    #[must_use]
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Replace the default HTTP pipeline with a custom sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Supply a custom sampling decision hook
    #[must_use]
    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Clamp nonsensical zero values to their working minimums.
    ///
    /// `max_concurrent_batches` is deliberately left alone: zero means
    /// dispatch is suspended.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.sample_rate == 0 {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self.max_batch_size = self.max_batch_size.max(1);
        self.pending_work_capacity = self.pending_work_capacity.max(1);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("dataset", &self.dataset)
            .field("api_host", &self.api_host)
            .field("sample_rate", &self.sample_rate)
            .field("max_batch_size", &self.max_batch_size)
            .field("batch_timeout", &self.batch_timeout)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("pending_work_capacity", &self.pending_work_capacity)
            .field("block_on_send", &self.block_on_send)
            .field("block_on_response", &self.block_on_response)
            .field("sink", &self.sink.as_ref().map(|_| "custom"))
            .field("sampler", &self.sampler.as_ref().map(|_| "custom"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.api_host, "https://api.honeycomb.io/");
        assert_eq!(config.sample_rate, 1);
        assert_eq!(config.max_batch_size, 50);
        assert_eq!(config.batch_timeout, Duration::from_millis(100));
        assert_eq!(config.max_concurrent_batches, 80);
        assert_eq!(config.pending_work_capacity, 10_000);
        assert!(!config.block_on_send);
        assert!(!config.block_on_response);
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::default()
            .with_write_key("key")
            .with_dataset("data")
            .with_sample_rate(4)
            .with_block_on_send(true);

        assert_eq!(config.write_key, "key");
        assert_eq!(config.dataset, "data");
        assert_eq!(config.sample_rate, 4);
        assert!(config.block_on_send);
    }

    #[test]
    fn test_sanitized_clamps_zeroes() {
        let config = Config::default()
            .with_sample_rate(0)
            .with_max_batch_size(0)
            .with_pending_work_capacity(0)
            .with_max_concurrent_batches(0)
            .sanitized();

        assert_eq!(config.sample_rate, 1);
        assert_eq!(config.max_batch_size, 1);
        assert_eq!(config.pending_work_capacity, 1);
        // Zero dispatchers is a meaningful setting, not a mistake.
        assert_eq!(config.max_concurrent_batches, 0);
    }

    #[test]
    fn test_debug_omits_write_key() {
        let config = Config::default().with_write_key("secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
    }
}
