//! Scripted in-memory GovInfo server for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};

use govline_core::{FetchError, Response, RetryPolicy, Transport, request_shutdown};
use govline_govinfo::{Config, RunArgs};

pub const BASE: &str = "https://api.govinfo.test";
pub const KEY: &str = "TEST_KEY";
pub const START: &str = "2019-01-01";
pub const END: &str = "2019-12-31";

/// One scripted answer
#[derive(Clone)]
pub enum Reply {
    Status {
        status: u16,
        retry_after: Option<String>,
        body: Vec<u8>,
    },
    /// 200 whose body fails with `kind` after yielding `prefix`
    BrokenBody { prefix: Vec<u8>, kind: io::ErrorKind },
    /// Connection-level failure before any response
    Network(String),
    /// Request a process-wide shutdown, then answer with the inner reply
    ShutdownThen(Box<Reply>),
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::Status {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn json(value: Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            retry_after: None,
            body: Vec::new(),
        }
    }

    pub fn shutdown_then(reply: Reply) -> Self {
        Self::ShutdownThen(Box::new(reply))
    }

    pub fn unavailable(retry_after: Option<&str>) -> Self {
        Self::Status {
            status: 503,
            retry_after: retry_after.map(str::to_string),
            body: Vec::new(),
        }
    }
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport answering from per-route reply queues.
///
/// Routes are keyed by URL, or by `URL#offsetMark` for page requests. The
/// last reply of a queue repeats forever; unknown routes answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `replies` for `key`, in order
    pub fn on(&self, key: impl Into<String>, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .extend(replies);
        self
    }

    /// Replace whatever is queued for `key`
    pub fn replace(&self, key: impl Into<String>, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(key.into(), replies.into_iter().collect());
        self
    }

    /// Script the published page served for `cursor`
    pub fn page(&self, cursor: &str, body: Value) -> &Self {
        self.on(format!("{}#{cursor}", published_url()), [Reply::json(body)])
    }

    /// Script a summary whose download section holds `links`
    pub fn summary(&self, id: &str, links: Value) -> &Self {
        self.on(
            summary_url(id),
            [Reply::json(json!({"packageId": id, "download": links}))],
        )
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL starts with `prefix`
    pub fn requests_to(&self, prefix: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.starts_with(prefix))
            .collect()
    }

    fn next_reply(&self, key: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        _timeout: Duration,
    ) -> Result<Response, FetchError> {
        let request = Request {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let key = match request.param("offsetMark") {
            Some(mark) => format!("{url}#{mark}"),
            None => url.to_string(),
        };
        self.requests.lock().unwrap().push(request);

        let mut reply = self.next_reply(&key);
        while let Some(Reply::ShutdownThen(inner)) = reply {
            request_shutdown();
            reply = Some(*inner);
        }

        match reply {
            None => Ok(response(404, None, Box::new(io::empty()), Some(0))),
            Some(Reply::Network(msg)) => Err(FetchError::Network(msg)),
            Some(Reply::ShutdownThen(_)) => unreachable!("unwrapped above"),
            Some(Reply::Status {
                status,
                retry_after,
                body,
            }) => {
                let len = body.len() as u64;
                Ok(response(status, retry_after, Box::new(Cursor::new(body)), Some(len)))
            }
            Some(Reply::BrokenBody { prefix, kind }) => Ok(response(
                200,
                None,
                Box::new(BrokenReader {
                    prefix: Cursor::new(prefix),
                    kind,
                }),
                None,
            )),
        }
    }
}

fn response(
    status: u16,
    retry_after: Option<String>,
    body: Box<dyn Read + Send>,
    content_length: Option<u64>,
) -> Response {
    Response {
        status,
        content_length,
        retry_after,
        body,
    }
}

/// Yields `prefix`, then fails every read
struct BrokenReader {
    prefix: Cursor<Vec<u8>>,
    kind: io::ErrorKind,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf)? {
            0 => Err(io::Error::new(self.kind, "connection dropped")),
            n => Ok(n),
        }
    }
}

pub fn published_url() -> String {
    format!("{BASE}/published/{START}/{END}")
}

pub fn summary_url(id: &str) -> String {
    format!("{BASE}/packages/{id}/summary")
}

/// Published page with `ids` issued on 2019-05-01
pub fn page_of(ids: &[&str], next_page: Option<&str>) -> Value {
    let packages: Vec<Value> = ids
        .iter()
        .map(|id| json!({"packageId": id, "dateIssued": "2019-05-01", "lastModified": "2019-05-02T00:00:00Z"}))
        .collect();
    match next_page {
        Some(next) => json!({"count": packages.len(), "packages": packages, "nextPage": next}),
        None => json!({"count": packages.len(), "packages": packages}),
    }
}

pub fn run_args(output_dir: &Path) -> RunArgs {
    RunArgs {
        api_base: BASE.to_string(),
        api_key: Some(KEY.to_string()),
        collections: vec!["BILLS".to_string()],
        start_date: Some(START.to_string()),
        end_date: Some(END.to_string()),
        output_dir: output_dir.to_path_buf(),
        formats: vec!["pdf".to_string()],
        ..RunArgs::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }
}

pub fn config(output_dir: &Path) -> Config {
    Config::try_from(run_args(output_dir)).unwrap()
}

pub fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::with_max_retries(max_retries)
}

pub fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|&s| Duration::from_secs(s)).collect()
}
