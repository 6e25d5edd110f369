//! HTTP implementation of the remote document store.
//!
//! Talks to the REST document API. Transient failures (timeouts, connection
//! errors, 408/429/5xx) are retried in place with capped exponential backoff
//! and jitter; everything else surfaces immediately.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use tokio::sync::mpsc;
use tokio::time::sleep;

use nocturne_core::sync::{Document, RemoteChange, RemoteStore, SubscriptionHandle};

use crate::error::{RemoteHttpError, Result};
use crate::types::{ApiErrorResponse, ChangeFeedResponse, CollectionResponse};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;
const TRANSIENT_MAX_ATTEMPTS: usize = 4;
const TRANSIENT_BASE_BACKOFF_MS: u64 = 250;
const TRANSIENT_MAX_BACKOFF_MS: u64 = 4_000;
/// Idle delay between change-feed polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

fn backoff_with_jitter(attempt: usize) -> Duration {
    let exp = (attempt.saturating_sub(1) as u32).min(8);
    let backoff = (TRANSIENT_BASE_BACKOFF_MS.saturating_mul(1_u64 << exp))
        .min(TRANSIENT_MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
    Duration::from_millis(backoff.saturating_add(jitter))
}

/// Client for the document API, one instance shared by every engine.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    poll_interval: Duration,
}

impl HttpRemoteStore {
    /// Create a new store client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the document API (e.g., "https://api.nocturne.app")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/collections/{}/documents",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn changes_url(&self, collection: &str, since: Option<&str>) -> String {
        let mut url = format!(
            "{}/v1/collections/{}/changes",
            self.base_url,
            urlencoding::encode(collection)
        );
        if let Some(cursor) = since {
            url = format!("{}?since={}", url, urlencoding::encode(cursor));
        }
        url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.bearer_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| RemoteHttpError::invalid_request("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[RemoteHttp] response status: {}", status);
            return;
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[RemoteHttp] response error ({}): {}", status, preview);
    }

    /// Issue a request, retrying transient failures in place.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Err(err) => {
                    if is_retryable_transport_error(&err) && attempt < TRANSIENT_MAX_ATTEMPTS {
                        let delay = backoff_with_jitter(attempt);
                        debug!(
                            "[RemoteHttp] transport error on {} {} (attempt {}), retrying in {:?}: {}",
                            method, url, attempt, delay, err
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(err.into());
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if is_retryable_status(status.as_u16()) && attempt < TRANSIENT_MAX_ATTEMPTS {
                        let delay = backoff_with_jitter(attempt);
                        debug!(
                            "[RemoteHttp] status {} on {} {} (attempt {}), retrying in {:?}",
                            status, method, url, attempt, delay
                        );
                        sleep(delay).await;
                        continue;
                    }

                    let body = response.text().await?;
                    Self::log_response(status, &body);
                    if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                        return Err(RemoteHttpError::api(
                            status.as_u16(),
                            format!("{}: {}", error.code, error.message),
                        ));
                    }
                    return Err(RemoteHttpError::api(
                        status.as_u16(),
                        format!("Request failed: {}", body),
                    ));
                }
            }
        }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);
        serde_json::from_str(&body).map_err(|e| {
            warn!(
                "[RemoteHttp] failed to deserialize response. Body: {}, Error: {}",
                body, e
            );
            RemoteHttpError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    async fn fetch_change_feed(
        &self,
        collection: &str,
        since: Option<&str>,
    ) -> Result<ChangeFeedResponse> {
        let url = self.changes_url(collection, since);
        let response = self.execute(Method::GET, &url, None).await?;
        Self::parse_json(response).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    /// GET /v1/collections/{collection}/documents/{id}
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> nocturne_core::Result<Option<Document>> {
        let url = self.document_url(collection, id);
        match self.execute(Method::GET, &url, None).await {
            Ok(response) => Ok(Some(Self::parse_json(response).await?)),
            Err(err) if err.status_code() == Some(404) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// PUT (replace) or PATCH (merge) /v1/collections/{collection}/documents/{id}
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> nocturne_core::Result<()> {
        let url = self.document_url(collection, id);
        let method = if merge { Method::PATCH } else { Method::PUT };
        let body = serde_json::Value::Object(doc);
        self.execute(method, &url, Some(&body)).await?;
        Ok(())
    }

    /// DELETE /v1/collections/{collection}/documents/{id}; a missing document
    /// is treated as already deleted.
    async fn delete_document(&self, collection: &str, id: &str) -> nocturne_core::Result<()> {
        let url = self.document_url(collection, id);
        match self.execute(Method::DELETE, &url, None).await {
            Ok(_) => Ok(()),
            Err(err) if err.status_code() == Some(404) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// GET /v1/collections/{collection}/documents
    async fn query_collection(
        &self,
        collection: &str,
    ) -> nocturne_core::Result<Vec<(String, Document)>> {
        let url = self.collection_url(collection);
        let response = self.execute(Method::GET, &url, None).await?;
        let listing: CollectionResponse = Self::parse_json(response).await?;
        Ok(listing
            .documents
            .into_iter()
            .map(|entry| (entry.id, entry.doc))
            .collect())
    }

    /// Poll GET /v1/collections/{collection}/changes, forwarding events and
    /// advancing the cursor. Delivery stops when the receiver is dropped.
    async fn subscribe(
        &self,
        collection: &str,
        tx: mpsc::Sender<RemoteChange>,
    ) -> nocturne_core::Result<SubscriptionHandle> {
        let store = self.clone();
        let collection = collection.to_string();
        let task = tokio::spawn(async move {
            let mut cursor: Option<String> = None;
            loop {
                match store.fetch_change_feed(&collection, cursor.as_deref()).await {
                    Ok(feed) => {
                        for event in feed.events {
                            if tx.send(event.into()).await.is_err() {
                                return;
                            }
                        }
                        if feed.next_cursor.is_some() {
                            cursor = feed.next_cursor;
                        }
                        if !feed.has_more {
                            sleep(store.poll_interval).await;
                        }
                    }
                    Err(err) => {
                        warn!(
                            "[RemoteHttp] change feed poll failed for {}: {}",
                            collection, err
                        );
                        sleep(store.poll_interval).await;
                    }
                }
            }
        });
        Ok(SubscriptionHandle::new(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nocturne_core::sync::RemoteChangeKind;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        request_line: String,
        authorization: Option<String>,
    }

    #[derive(Debug, Clone)]
    enum MockOutcome {
        DropConnection,
        Respond { status: u16, body: String },
    }

    fn api_error_body(code: &str, message: &str) -> String {
        format!(r#"{{"code":"{}","message":"{}"}}"#, code, message)
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(
        stream: &mut tokio::net::TcpStream,
    ) -> Option<(String, HashMap<String, String>)> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body_read = buffer.len().saturating_sub(header_end + 4);
        while body_read < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body_read = body_read.saturating_add(read);
        }

        Some((request_line, headers))
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            _ => "Error",
        }
    }

    async fn write_http_response(
        stream: &mut tokio::net::TcpStream,
        status: u16,
        body: &str,
    ) -> std::io::Result<()> {
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await
    }

    async fn start_mock_server(
        outcomes: Vec<MockOutcome>,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(outcomes)));
        let captured_clone = Arc::clone(&captured);
        let scripted_clone = Arc::clone(&scripted);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let captured_inner = Arc::clone(&captured_clone);
                let scripted_inner = Arc::clone(&scripted_clone);
                tokio::spawn(async move {
                    let Some((request_line, headers)) = read_http_request(&mut stream).await
                    else {
                        return;
                    };
                    captured_inner.lock().await.push(CapturedRequest {
                        request_line,
                        authorization: headers.get("authorization").cloned(),
                    });

                    let outcome =
                        scripted_inner
                            .lock()
                            .await
                            .pop_front()
                            .unwrap_or(MockOutcome::Respond {
                                status: 500,
                                body: api_error_body("INTERNAL", "unexpected request"),
                            });

                    match outcome {
                        MockOutcome::DropConnection => {}
                        MockOutcome::Respond { status, body } => {
                            let _ = write_http_response(&mut stream, status, &body).await;
                        }
                    }
                });
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    #[tokio::test]
    async fn get_document_retries_transient_failures() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockOutcome::Respond {
                status: 500,
                body: api_error_body("INTERNAL", "retry please"),
            },
            MockOutcome::Respond {
                status: 200,
                body: r#"{"title":"first flight","userId":"u1"}"#.to_string(),
            },
        ])
        .await;

        let store = HttpRemoteStore::new(&base_url);
        let doc = store.get_document("dreams", "d1").await.expect("get ok");
        let doc = doc.expect("document present");
        assert_eq!(doc.get("title").and_then(|v| v.as_str()), Some("first flight"));
        assert_eq!(captured.lock().await.len(), 2);
        server.abort();
    }

    #[tokio::test]
    async fn get_document_maps_404_to_none() {
        let (base_url, captured, server) = start_mock_server(vec![MockOutcome::Respond {
            status: 404,
            body: api_error_body("NOT_FOUND", "no such document"),
        }])
        .await;

        let store = HttpRemoteStore::new(&base_url);
        let doc = store.get_document("dreams", "missing").await.expect("get ok");
        assert!(doc.is_none());
        assert_eq!(captured.lock().await.len(), 1);
        server.abort();
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (base_url, captured, server) = start_mock_server(vec![MockOutcome::Respond {
            status: 400,
            body: api_error_body("INVALID", "malformed document"),
        }])
        .await;

        let store = HttpRemoteStore::new(&base_url);
        let mut doc = Document::new();
        doc.insert("title".into(), serde_json::Value::String("x".into()));
        let err = store
            .set_document("dreams", "d1", doc, false)
            .await
            .expect_err("rejected");
        assert!(err.to_string().contains("INVALID"));
        assert_eq!(captured.lock().await.len(), 1);
        server.abort();
    }

    #[tokio::test]
    async fn merge_writes_use_patch_and_replace_uses_put() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockOutcome::Respond {
                status: 200,
                body: "{}".to_string(),
            },
            MockOutcome::Respond {
                status: 200,
                body: "{}".to_string(),
            },
        ])
        .await;

        let store = HttpRemoteStore::new(&base_url).with_bearer_token("tok-1");
        let mut doc = Document::new();
        doc.insert("title".into(), serde_json::Value::String("x".into()));
        store
            .set_document("dreams", "d 1", doc.clone(), true)
            .await
            .expect("patch ok");
        store
            .set_document("dreams", "d 1", doc, false)
            .await
            .expect("put ok");

        let captured = captured.lock().await;
        assert!(captured[0]
            .request_line
            .starts_with("PATCH /v1/collections/dreams/documents/d%201"));
        assert!(captured[1]
            .request_line
            .starts_with("PUT /v1/collections/dreams/documents/d%201"));
        assert_eq!(captured[0].authorization.as_deref(), Some("Bearer tok-1"));
        server.abort();
    }

    #[tokio::test]
    async fn delete_tolerates_missing_documents() {
        let (base_url, _captured, server) = start_mock_server(vec![MockOutcome::Respond {
            status: 404,
            body: api_error_body("NOT_FOUND", "already gone"),
        }])
        .await;

        let store = HttpRemoteStore::new(&base_url);
        store.delete_document("dreams", "d1").await.expect("delete ok");
        server.abort();
    }

    #[tokio::test]
    async fn transport_drop_is_retried() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockOutcome::DropConnection,
            MockOutcome::Respond {
                status: 200,
                body: r#"{"documents":[{"id":"d1","doc":{"title":"x"}}]}"#.to_string(),
            },
        ])
        .await;

        let store = HttpRemoteStore::new(&base_url);
        let docs = store.query_collection("dreams").await.expect("list ok");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "d1");
        assert!(captured.lock().await.len() >= 2);
        server.abort();
    }

    #[tokio::test]
    async fn subscribe_forwards_events_and_advances_the_cursor() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockOutcome::Respond {
                status: 200,
                body: r#"{"events":[{"id":"d1","kind":"added","doc":{"title":"x"}}],"nextCursor":"c1","hasMore":false}"#
                    .to_string(),
            },
            MockOutcome::Respond {
                status: 200,
                body: r#"{"events":[],"hasMore":false}"#.to_string(),
            },
        ])
        .await;

        let store = HttpRemoteStore::new(&base_url)
            .with_poll_interval(Duration::from_millis(30));
        let (tx, mut rx) = mpsc::channel(8);
        let handle = store.subscribe("dreams", tx).await.expect("subscribe ok");

        let change = rx.recv().await.expect("change delivered");
        assert_eq!(change.id, "d1");
        assert_eq!(change.kind, RemoteChangeKind::Added);
        assert!(change.doc.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        let captured = captured.lock().await;
        assert!(captured
            .iter()
            .any(|request| request.request_line.contains("changes?since=c1")));
        drop(handle);
        server.abort();
    }
}
