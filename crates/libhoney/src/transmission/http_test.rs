//! Tests for the HTTP batch sender
//!
//! Runs the sender against a canned single-connection HTTP server so the
//! exact request bytes (path, headers, body) can be asserted on.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{batch_url, build_user_agent, HttpSender};
use crate::error::Error;
use crate::event::{DestinationKey, Event};
use crate::response::Response;
use crate::transmission::batcher::Batch;
use crate::transmission::dispatcher::BatchSender;
use crate::transmission::metrics::TransmissionMetrics;

/// Serve exactly one request with a canned status and body, returning the
/// base URL and a handle resolving to the raw request text.
async fn canned_server(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            if request_complete(&raw) {
                break;
            }
        }

        let reply = format!(
            "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&raw).into_owned()
    });

    (format!("http://{addr}/"), handle)
}

/// True once the buffered request has complete headers and body
fn request_complete(raw: &[u8]) -> bool {
    let Some(headers_end) = raw.windows(4).position(|window| window == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&raw[..headers_end]);
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= headers_end + 4 + content_length
}

fn sender(responses: mpsc::Sender<Response>) -> HttpSender {
    HttpSender::new(
        super::default_client(),
        build_user_agent("testapp/1.0"),
        responses,
        true,
        Arc::new(TransmissionMetrics::new()),
    )
}

fn batch_for(api_host: &str, events: Vec<Event>) -> Batch {
    Batch {
        id: 0,
        key: DestinationKey {
            api_host: api_host.into(),
            write_key: "test-write-key".into(),
            dataset: "test-data".into(),
        },
        events,
        created_at: Instant::now(),
    }
}

fn event_with(n: i64, metadata: &str) -> Event {
    let mut event = Event::new();
    event.add_field("n", n);
    event.metadata = Some(serde_json::json!(metadata));
    event
}

async fn collect(rx: &mut mpsc::Receiver<Response>, n: usize) -> Vec<Response> {
    let mut out = Vec::new();
    while out.len() < n {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(response)) => out.push(response),
            _ => break,
        }
    }
    out
}

// ============================================================================
// URL and header construction
// ============================================================================

#[test]
fn test_batch_url_shape() {
    let key = DestinationKey {
        api_host: "https://api.honeycomb.io/".into(),
        write_key: "key".into(),
        dataset: "my-data".into(),
    };
    let url = batch_url(&key).unwrap();
    assert_eq!(url.as_str(), "https://api.honeycomb.io/1/batch/my-data");
}

#[test]
fn test_batch_url_escapes_dataset() {
    let key = DestinationKey {
        api_host: "https://api.honeycomb.io".into(),
        write_key: "key".into(),
        dataset: "my data/set".into(),
    };
    let url = batch_url(&key).unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.honeycomb.io/1/batch/my%20data%2Fset"
    );
}

#[test]
fn test_batch_url_rejects_garbage_host() {
    let key = DestinationKey {
        api_host: "not a url".into(),
        write_key: "key".into(),
        dataset: "set".into(),
    };
    assert!(matches!(batch_url(&key), Err(Error::InvalidUrl(_))));
}

#[test]
fn test_user_agent_addition() {
    let base = build_user_agent("");
    assert_eq!(base, format!("libhoney-rust/{}", env!("CARGO_PKG_VERSION")));

    let extended = build_user_agent("myapp/2.1");
    assert_eq!(extended, format!("{base} myapp/2.1"));
}

// ============================================================================
// Request and response handling
// ============================================================================

#[tokio::test]
async fn test_success_demultiplexes_per_event_statuses() {
    let (api_host, request) = canned_server(
        200,
        r#"[{"status":202},{"status":400,"error":"unknown field"}]"#,
    )
    .await;

    let (response_tx, mut response_rx) = mpsc::channel(16);
    let events = vec![event_with(0, "first"), event_with(1, "second")];
    sender(response_tx).send_batch(batch_for(&api_host, events)).await;

    let responses = collect(&mut response_rx, 2).await;
    assert_eq!(responses.len(), 2);

    assert_eq!(responses[0].status_code, 202);
    assert_eq!(responses[0].error, None);
    assert_eq!(responses[0].metadata, Some(serde_json::json!("first")));
    assert!(responses[0].duration > Duration::ZERO);

    assert_eq!(responses[1].status_code, 400);
    assert_eq!(responses[1].metadata, Some(serde_json::json!("second")));
    assert_eq!(
        responses[1].error,
        Some(Error::Server {
            status: 400,
            body: "unknown field".into(),
        })
    );

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /1/batch/test-data HTTP/1.1\r\n"));
    let lowered = raw.to_lowercase();
    assert!(lowered.contains("content-type: application/json"));
    assert!(lowered.contains("x-honeycomb-team: test-write-key"));
    assert!(lowered.contains(&format!(
        "user-agent: libhoney-rust/{} testapp/1.0",
        env!("CARGO_PKG_VERSION")
    )));
    assert!(raw.contains(r#"[{"data":{"n":0}},{"data":{"n":1}}]"#));
}

#[tokio::test]
async fn test_wire_body_field_rules() {
    let (api_host, request) = canned_server(200, r#"[{"status":202}]"#).await;

    let mut event = Event::new();
    event.sample_rate = 4;
    event.add_field("c", 3);
    event.add_field("a", 1);
    event.add_field("b", 2);
    event.add_field("nothing", serde_json::Value::Null);
    // A map with non-string keys cannot become JSON; it must vanish
    // without taking the batch down.
    let mut bad = std::collections::HashMap::new();
    bad.insert(vec![1u8], "x");
    event.add_field("bad", bad);

    let (response_tx, mut response_rx) = mpsc::channel(16);
    sender(response_tx).send_batch(batch_for(&api_host, vec![event])).await;
    assert_eq!(collect(&mut response_rx, 1).await.len(), 1);

    let raw = request.await.unwrap();
    assert!(raw.contains(r#""data":{"a":1,"b":2,"c":3}"#));
    assert!(raw.contains(r#""samplerate":4"#));
    assert!(!raw.contains("bad"));
    assert!(!raw.contains("nothing"));
}

#[tokio::test]
async fn test_server_error_fans_out_to_every_event() {
    let (api_host, _request) = canned_server(503, "service unavailable").await;

    let (response_tx, mut response_rx) = mpsc::channel(16);
    let events = vec![event_with(0, "first"), event_with(1, "second")];
    sender(response_tx).send_batch(batch_for(&api_host, events)).await;

    let responses = collect(&mut response_rx, 2).await;
    assert_eq!(responses.len(), 2);
    for response in &responses {
        assert_eq!(response.status_code, 503);
        assert_eq!(response.body, "service unavailable");
        assert_eq!(
            response.error,
            Some(Error::Server {
                status: 503,
                body: "service unavailable".into(),
            })
        );
    }
}

#[tokio::test]
async fn test_unparseable_success_body_synthesizes_errors() {
    let (api_host, _request) = canned_server(200, "an unexpected shape").await;

    let (response_tx, mut response_rx) = mpsc::channel(16);
    let events = vec![event_with(0, "first"), event_with(1, "second")];
    sender(response_tx).send_batch(batch_for(&api_host, events)).await;

    let responses = collect(&mut response_rx, 2).await;
    assert_eq!(responses.len(), 2);
    for response in &responses {
        assert!(matches!(response.error, Some(Error::Parse(_))));
    }
}

#[tokio::test]
async fn test_short_status_array_reports_missing_positions() {
    let (api_host, _request) = canned_server(200, r#"[{"status":202}]"#).await;

    let (response_tx, mut response_rx) = mpsc::channel(16);
    let events = vec![event_with(0, "first"), event_with(1, "second")];
    sender(response_tx).send_batch(batch_for(&api_host, events)).await;

    let responses = collect(&mut response_rx, 2).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].status_code, 202);
    assert_eq!(responses[0].error, None);
    assert!(matches!(responses[1].error, Some(Error::Parse(_))));
}

#[tokio::test]
async fn test_network_error_fans_out_transport_errors() {
    // Grab a port, then close the listener so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_host = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let (response_tx, mut response_rx) = mpsc::channel(16);
    let events = vec![event_with(0, "first"), event_with(1, "second")];
    sender(response_tx).send_batch(batch_for(&api_host, events)).await;

    let responses = collect(&mut response_rx, 2).await;
    assert_eq!(responses.len(), 2);
    for response in &responses {
        assert_eq!(response.status_code, 0);
        assert!(matches!(response.error, Some(Error::Transport(_))));
    }
}
