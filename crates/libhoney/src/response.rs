//! Delivery outcomes surfaced to the caller
//!
//! Every event accepted by `send` produces exactly one [`Response`]:
//! delivered, server error, transport error, sampled, or dropped on
//! overflow/shutdown. Responses carry the event's caller metadata back
//! verbatim so outcomes can be correlated with submissions.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;

/// Outcome of one submitted event
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code for this event, or 0 for outcomes decided locally
    /// (sampling, overflow, shutdown, transport failure)
    pub status_code: u16,

    /// Response body snippet, if the server returned one for this event
    pub body: String,

    /// Wall time spent delivering the batch this event rode in;
    /// zero for local outcomes
    pub duration: Duration,

    /// Caller metadata copied verbatim from the originating event
    pub metadata: Option<Value>,

    /// What went wrong, if anything
    pub error: Option<Error>,
}

impl Response {
    /// True if the event was accepted by the server
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status_code)
    }

    /// Build a locally-decided response (no HTTP involved)
    pub(crate) fn local(error: Error, metadata: Option<Value>) -> Self {
        Self {
            status_code: 0,
            body: String::new(),
            duration: Duration::ZERO,
            metadata,
            error: Some(error),
        }
    }
}

/// Push a response onto the channel subject to the overflow policy.
///
/// Blocking mode applies backpressure all the way to submitters; in
/// non-blocking mode a full (or closed) channel drops the response,
/// never the event delivery itself.
pub(crate) async fn deliver(tx: &mpsc::Sender<Response>, response: Response, block: bool) {
    if block {
        if tx.send(response).await.is_err() {
            tracing::trace!("response channel closed; dropping response");
        }
    } else {
        match tx.try_send(response) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!("response channel full; dropping response");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::trace!("response channel closed; dropping response");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_response_shape() {
        let response = Response::local(Error::Sampled, Some(serde_json::json!({"id": 7})));
        assert_eq!(response.status_code, 0);
        assert_eq!(response.duration, Duration::ZERO);
        assert_eq!(response.error, Some(Error::Sampled));
        assert_eq!(response.metadata, Some(serde_json::json!({"id": 7})));
        assert!(!response.is_success());
    }

    #[test]
    fn test_is_success() {
        let ok = Response {
            status_code: 202,
            body: String::new(),
            duration: Duration::from_millis(3),
            metadata: None,
            error: None,
        };
        assert!(ok.is_success());

        let rejected = Response {
            error: Some(Error::Server {
                status: 400,
                body: "bad".into(),
            }),
            status_code: 400,
            ..ok.clone()
        };
        assert!(!rejected.is_success());
    }

    #[tokio::test]
    async fn test_deliver_nonblocking_drops_on_full() {
        let (tx, mut rx) = mpsc::channel(1);

        deliver(&tx, Response::local(Error::Sampled, None), false).await;
        // Channel is now full; this response is dropped, not blocked on.
        deliver(&tx, Response::local(Error::QueueOverflow, None), false).await;

        let first = rx.recv().await.expect("one response should arrive");
        assert_eq!(first.error, Some(Error::Sampled));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_blocking_waits_for_space() {
        let (tx, mut rx) = mpsc::channel(1);
        deliver(&tx, Response::local(Error::Sampled, None), true).await;

        let tx2 = tx.clone();
        let writer = tokio::spawn(async move {
            deliver(&tx2, Response::local(Error::QueueOverflow, None), true).await;
        });

        // Reading the first response unblocks the second.
        assert!(rx.recv().await.is_some());
        writer.await.expect("writer should finish");
        let second = rx.recv().await.expect("second response should arrive");
        assert_eq!(second.error, Some(Error::QueueOverflow));
    }
}
