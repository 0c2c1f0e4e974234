//! Blocking HTTP transport over async reqwest.
//!
//! Requests run on a shared tokio runtime, but callers see a sync interface
//! so the driver can fan out over plain worker threads. Response bodies are
//! exposed as `Read` streams with a per-read stall timeout and are never
//! buffered whole.

use std::io::{self, Read};
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::FetchError;

/// Connect timeout, independent of the per-request timeouts callers pass in
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("govline/", env!("CARGO_PKG_VERSION"));

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Anything that can perform a GET and hand back a streaming response.
///
/// The production implementation is [`HttpTransport`]; tests script responses
/// in memory. Non-2xx statuses are returned as responses, not errors, so the
/// caller decides what a 503 means.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Response, FetchError>;
}

/// Status, the headers we care about, and a streaming body
pub struct Response {
    pub status: u16,
    pub content_length: Option<u64>,
    /// Raw `Retry-After` header value
    pub retry_after: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`FetchError::Status`]
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
                message: status_reason(self.status).to_string(),
            })
        }
    }

    /// Read the whole body and parse it as JSON (metadata responses only)
    pub fn json(mut self) -> Result<serde_json::Value, FetchError> {
        let mut bytes = Vec::new();
        self.body.read_to_end(&mut bytes)?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn status_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unexpected status")
}

/// [`Transport`] backed by the shared reqwest client and runtime.
///
/// `timeout` bounds the wait for response headers and, separately, every
/// read of the body (stall detection), so large assets are not cut off
/// while data keeps flowing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let send = http_client().get(url).query(query).send();
            let resp = tokio::time::timeout(timeout, send)
                .await
                .map_err(|_| {
                    FetchError::Timeout(format!("no response within {}s", timeout.as_secs()))
                })?
                .map_err(FetchError::from_reqwest)?;

            let status = resp.status().as_u16();
            let content_length = resp.content_length();
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let stream = resp.bytes_stream();
            let async_reader = tokio_util::io::StreamReader::new(
                stream.map(|result| result.map_err(io::Error::other)),
            );

            Ok(Response {
                status,
                content_length,
                retry_after,
                body: Box::new(TimeoutReader::new(Box::pin(async_reader), timeout)),
            })
        })
    }
}

/// Async-to-sync bridge with read timeout.
///
/// If no data arrives within `timeout`, the read fails with `TimedOut`,
/// which the downloader counts as a failed attempt.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    timeout: Duration,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read stalled for {}s", timeout.as_secs()),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> Response {
        Response {
            status,
            content_length: Some(body.len() as u64),
            retry_after: None,
            body: Box::new(body.as_bytes()),
        }
    }

    #[test]
    fn success_range() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(!response(301, "").is_success());
        assert!(!response(503, "").is_success());
    }

    #[test]
    fn error_for_status_keeps_code() {
        let err = response(404, "").error_for_status().unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(format!("{err}"), "HTTP 404: Not Found");
    }

    #[test]
    fn error_for_status_passes_success() {
        assert!(response(200, "{}").error_for_status().is_ok());
    }

    #[test]
    fn json_parses_body() {
        let value = response(200, r#"{"a": [1, 2]}"#).json().unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn json_decode_error() {
        let err = response(200, "<html>").json().unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn json_invalid_utf8_is_decode_error() {
        let resp = Response {
            status: 200,
            content_length: None,
            retry_after: None,
            body: Box::new(&b"{\"title\": \"\xff\xfe\"}"[..]),
        };
        assert!(matches!(resp.json().unwrap_err(), FetchError::Decode(_)));
    }

    #[test]
    fn debug_omits_body() {
        let text = format!("{:?}", response(200, "secret"));
        assert!(text.contains("status: 200"));
        assert!(!text.contains("secret"));
    }
}
