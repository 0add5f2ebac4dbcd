use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shrink_registry::client::{Registry, RegistryClient};
use shrink_registry::repository::RegistryEndpoint;
use shrink_util::errors::ShrinkError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve every request on a local port with the same canned answer.
async fn canned_server(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = vec![0u8; 4096];
            let mut read = Vec::new();
            while !read.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => read.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{addr}"), hits)
}

fn client(url: &str) -> RegistryClient {
    RegistryClient::new(RegistryEndpoint::new(url), Duration::from_secs(5))
        .unwrap()
        .with_retries(0)
}

const DOC: &str = r#"{
  "name": "demo",
  "dist-tags": { "latest": "1.2.0" },
  "versions": {
    "1.0.0": { "name": "demo", "version": "1.0.0" },
    "1.2.0": { "name": "demo", "version": "1.2.0", "dist": { "shasum": "abc" } },
    "2.0.0": { "name": "demo", "version": "2.0.0" }
  },
  "time": { "modified": "2021-01-01T00:00:00.000Z", "1.2.0": "2020-06-01T00:00:00.000Z" }
}"#;

#[tokio::test]
async fn fetches_and_selects_release() {
    let (url, hits) = canned_server("200 OK", DOC).await;
    let client = client(&url);

    let set = client.releases("demo").await.unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.latest(), Some("1.2.0"));

    let release = client.release("demo", "^1.0.0").await.unwrap().unwrap();
    assert_eq!(release.version, "1.2.0");
    assert_eq!(release.shasum.as_deref(), Some("abc"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unsatisfied_range_is_absent_not_error() {
    let (url, _) = canned_server("200 OK", DOC).await;
    let release = client(&url).release("demo", "^5.0.0").await.unwrap();
    assert!(release.is_none());
}

#[tokio::test]
async fn not_found_is_http_status_error() {
    let (url, hits) = canned_server("404 Not Found", r#"{"error":"Not found"}"#).await;
    let err = client(&url).releases("missing").await.unwrap_err();
    assert!(matches!(err, ShrinkError::HttpStatus { code: 404, .. }), "got: {err}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (url, hits) = canned_server("503 Service Unavailable", "").await;
    let err = client(&url).with_retries(1).releases("flaky").await.unwrap_err();
    assert!(matches!(err, ShrinkError::HttpStatus { code: 503, .. }), "got: {err}");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, hits) = canned_server("404 Not Found", r#"{"error":"Not found"}"#).await;
    let err = client(&url).with_retries(2).releases("missing").await.unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refused_connection_is_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let started = std::time::Instant::now();
    let err = client(&format!("http://{addr}"))
        .with_retries(1)
        .releases("demo")
        .await
        .unwrap_err();
    assert!(err.is_transient(), "got: {err}");
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn invalid_json_is_parse_error() {
    let (url, _) = canned_server("200 OK", "<html>oops</html>").await;
    let err = client(&url).releases("demo").await.unwrap_err();
    assert!(matches!(err, ShrinkError::Parse { .. }), "got: {err}");
}

#[tokio::test]
async fn missing_versions_is_malformed_data() {
    let (url, _) = canned_server("200 OK", r#"{"name":"demo"}"#).await;
    let err = client(&url).releases("demo").await.unwrap_err();
    assert!(matches!(err, ShrinkError::MalformedData { .. }), "got: {err}");
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = client(&format!("http://{addr}"))
        .releases("demo")
        .await
        .unwrap_err();
    assert!(matches!(err, ShrinkError::Network { .. }), "got: {err}");
}
