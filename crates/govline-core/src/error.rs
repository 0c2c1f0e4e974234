//! Error type shared by every HTTP-facing component

/// Failure of a single HTTP exchange (metadata fetch or asset download).
///
/// Kept as a plain enum so callers can match on the failure class:
/// the downloader retries, discovery stops, enrichment marks the record failed.
#[derive(Debug)]
pub enum FetchError {
    /// Server answered with a non-success status
    Status { status: u16, message: String },
    /// Connection-level failure (DNS, refused, reset before headers)
    Network(String),
    /// No response or no body data within the configured timeout
    Timeout(String),
    /// Body was not the JSON shape we expected
    Decode(String),
    /// Local I/O failure while reading the body or writing the destination
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout(e.to_string())
        } else {
            Self::Io(e)
        }
    }
}

impl FetchError {
    /// Build from a reqwest error, keeping the status when there is one.
    ///
    /// The URL is stripped so API keys in query strings never reach the logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Network(e.to_string())
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Everything is retryable except a full disk.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            _ => true,
        }
    }
}
