//! HTTP sender - delivers one sealed batch per request
//!
//! Serializes a batch to the JSON array the `/1/batch/<dataset>` endpoint
//! expects, POSTs it, then demultiplexes the per-event status array back
//! into one [`Response`] per event. Batch-level failures (network, non-2xx,
//! unparseable body) fan the same error out to every event in the batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::event::DestinationKey;
use crate::response::{self, Response};
use crate::transmission::batcher::Batch;
use crate::transmission::dispatcher::BatchSender;
use crate::transmission::metrics::TransmissionMetrics;

/// Auth header carrying the write key
const TEAM_HEADER: &str = "X-Honeycomb-Team";

/// Longest response-body slice carried on an error
const BODY_SNIPPET_LIMIT: usize = 512;

/// Request timeout for the default HTTP client
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-event status record in a 2xx batch response body
#[derive(Debug, Deserialize)]
struct EventStatus {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<String>,
}

/// Build the `User-Agent` header value, with the optional caller-supplied
/// addition separated by a space
pub(crate) fn build_user_agent(addition: &str) -> String {
    let base = concat!("libhoney-rust/", env!("CARGO_PKG_VERSION"));
    if addition.is_empty() {
        base.to_string()
    } else {
        format!("{base} {addition}")
    }
}

/// Build a pooled HTTP client with the crate's default timeout
pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Endpoint URL for a destination: `<api-host>/1/batch/<escaped-dataset>`
pub(crate) fn batch_url(key: &DestinationKey) -> Result<Url, Error> {
    let mut url = Url::parse(&key.api_host).map_err(|err| Error::InvalidUrl(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl("api host cannot be a base url".into()))?
        .pop_if_empty()
        .extend(["1", "batch", key.dataset.as_str()]);
    Ok(url)
}

/// Production batch sender: one POST per sealed batch
pub(crate) struct HttpSender {
    client: reqwest::Client,
    user_agent: String,
    response_tx: mpsc::Sender<Response>,
    block_on_response: bool,
    metrics: Arc<TransmissionMetrics>,
}

impl HttpSender {
    pub(crate) fn new(
        client: reqwest::Client,
        user_agent: String,
        response_tx: mpsc::Sender<Response>,
        block_on_response: bool,
        metrics: Arc<TransmissionMetrics>,
    ) -> Self {
        Self {
            client,
            user_agent,
            response_tx,
            block_on_response,
            metrics,
        }
    }

    /// Fan a batch-level failure out to every event in the batch
    async fn fail(&self, batch: Batch, status_code: u16, error: Error, duration: Duration) {
        self.metrics.record_batch_failed();
        tracing::warn!(
            batch_id = batch.id,
            events = batch.events.len(),
            error = %error,
            "batch delivery failed"
        );

        let body = match &error {
            Error::Server { body, .. } => body.clone(),
            _ => String::new(),
        };

        for event in batch.events {
            let response = Response {
                status_code,
                body: body.clone(),
                duration,
                metadata: event.metadata,
                error: Some(error.clone()),
            };
            response::deliver(&self.response_tx, response, self.block_on_response).await;
        }
    }
}

#[async_trait]
impl BatchSender for HttpSender {
    async fn send_batch(&self, batch: Batch) {
        let started = Instant::now();

        let url = match batch_url(&batch.key) {
            Ok(url) => url,
            Err(err) => {
                self.fail(batch, 0, err, started.elapsed()).await;
                return;
            }
        };

        let body = match serde_json::to_vec(&batch.events) {
            Ok(body) => body,
            Err(err) => {
                let err = Error::Transport(format!("failed to encode batch: {err}"));
                self.fail(batch, 0, err, started.elapsed()).await;
                return;
            }
        };

        let result = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(TEAM_HEADER, batch.key.write_key.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .body(body)
            .send()
            .await;

        let http_response = match result {
            Ok(response) => response,
            Err(err) => {
                self.fail(batch, 0, Error::Transport(err.to_string()), started.elapsed())
                    .await;
                return;
            }
        };

        let status = http_response.status();
        let body_text = match http_response.text().await {
            Ok(text) => text,
            Err(err) => {
                self.fail(
                    batch,
                    status.as_u16(),
                    Error::Transport(err.to_string()),
                    started.elapsed(),
                )
                .await;
                return;
            }
        };
        let duration = started.elapsed();

        if !status.is_success() {
            let err = Error::Server {
                status: status.as_u16(),
                body: snippet(&body_text),
            };
            self.fail(batch, status.as_u16(), err, duration).await;
            return;
        }

        let statuses: Vec<EventStatus> = match serde_json::from_str(&body_text) {
            Ok(statuses) => statuses,
            Err(err) => {
                self.fail(batch, status.as_u16(), Error::Parse(err.to_string()), duration)
                    .await;
                return;
            }
        };

        tracing::debug!(
            batch_id = batch.id,
            events = batch.events.len(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            age_ms = batch.created_at.elapsed().as_millis() as u64,
            "batch delivered"
        );
        self.metrics.record_batch_sent(batch.events.len() as u64);

        // Statuses match events positionally; a short array means the
        // trailing events have no verdict, which is a parse-level problem.
        let mut statuses = statuses.into_iter();
        for event in batch.events {
            let response = match statuses.next() {
                Some(item) => Response {
                    status_code: item.status,
                    body: String::new(),
                    duration,
                    metadata: event.metadata,
                    error: item.error.map(|message| Error::Server {
                        status: item.status,
                        body: message,
                    }),
                },
                None => Response {
                    status_code: status.as_u16(),
                    body: String::new(),
                    duration,
                    metadata: event.metadata,
                    error: Some(Error::Parse(
                        "server response missing status for event".into(),
                    )),
                },
            };
            response::deliver(&self.response_tx, response, self.block_on_response).await;
        }
    }
}

/// Truncate a response body for error reporting
fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
