//! Error types for the libhoney client
//!
//! Runtime delivery failures never abort the engine; they are reported
//! per event on the [`Response`](crate::Response) channel. The variants
//! returned directly from API calls are the synchronous validation and
//! startup errors.

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client, either synchronously or on responses.
///
/// `Clone` so a single batch-level failure can fan out to the response
/// of every event in the batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Validation errors (synchronous, returned from send)
    // =========================================================================
    /// Event has no API host and none was configured
    #[error("no api host configured; cannot send event")]
    MissingApiHost,

    /// Event has no write key and none was configured
    #[error("no write key configured; cannot send event")]
    MissingWriteKey,

    /// Event has no dataset and none was configured
    #[error("no dataset configured; cannot send event")]
    MissingDataset,

    /// Event carries no fields
    #[error("event has no fields; refusing to send an empty event")]
    EmptyFields,

    /// `add` was given a value that does not serialize to a JSON object
    #[error("cannot add fields from {0}; expected a JSON object")]
    FieldSource(String),

    // =========================================================================
    // Per-event delivery outcomes (reported via responses, never returned)
    // =========================================================================
    /// Event was dropped by probabilistic sampling (not an error)
    #[error("event dropped due to sampling")]
    Sampled,

    /// Work queue was full and the overflow policy is non-blocking
    #[error("event dropped; work queue overflow")]
    QueueOverflow,

    /// Event was drained during engine shutdown with no dispatcher to take it
    #[error("event dropped during engine shutdown")]
    ShutdownDrop,

    /// Network-level failure (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// Server rejected the batch or the event
    #[error("server responded with status {status}: {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body snippet or per-event error message
        body: String,
    },

    /// Server returned 2xx but the body could not be interpreted
    #[error("malformed server response: {0}")]
    Parse(String),

    // =========================================================================
    // Startup and lifecycle errors (returned from construction / send)
    // =========================================================================
    /// API host is not a valid base URL
    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    /// The configured sink failed to start
    #[error("sink failed to start: {0}")]
    SinkStart(String),

    /// The client has been closed
    #[error("client is closed")]
    ClientClosed,

    // =========================================================================
    // Key verification errors
    // =========================================================================
    /// The write key was rejected by the server (HTTP 401)
    #[error("write key rejected by server")]
    InvalidWriteKey,

    /// Key verification failed with an unexpected status
    #[error("key verification failed with status {status}: {body}")]
    Verify {
        /// HTTP status code
        status: u16,
        /// Response body snippet
        body: String,
    },
}
