//! Retrying asset downloader
//!
//! One call makes at most `policy.max_attempts()` requests. A 503 waits for
//! the server's `Retry-After`; every other failure waits `attempt * base`.
//! The body streams into a [`FileSink`], so the destination either holds the
//! complete asset or does not exist.

use std::path::Path;
use std::time::Duration;

use indicatif::ProgressBar;

use govline_core::progress::upgrade_to_bar;
use govline_core::{is_shutdown_requested, FetchError, FileSink, RetryPolicy, Sleeper, Transport};

/// Terminal result of one download; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    Downloaded { bytes: u64, attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl DownloadResult {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Downloaded { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Outcome of a single request
enum Attempt {
    Done(u64),
    /// 503 with the raw `Retry-After` value
    Unavailable(Option<String>),
    Failed(FetchError),
}

pub struct Downloader<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
    /// Response-head timeout and per-read stall timeout
    timeout: Duration,
}

impl<'a> Downloader<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Download `url` (plus `query`) to `dest`.
    ///
    /// `pb` tracks bytes of the current attempt and is reset on retry.
    pub fn download(
        &self,
        url: &str,
        query: &[(&str, &str)],
        dest: &Path,
        pb: &ProgressBar,
    ) -> DownloadResult {
        let max_attempts = self.policy.max_attempts();
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            pb.set_position(0);
            let delay = match self.attempt(url, query, dest, pb) {
                Attempt::Done(bytes) => {
                    log::info!("Saved {} ({bytes} bytes)", dest.display());
                    return DownloadResult::Downloaded {
                        bytes,
                        attempts: attempt,
                    };
                }
                Attempt::Unavailable(retry_after) => {
                    let wait = self.policy.retry_after(retry_after.as_deref());
                    last_reason = FetchError::Status {
                        status: 503,
                        message: "Service Unavailable".into(),
                    }
                    .to_string();
                    log::info!(
                        "{name}: 503 on attempt {attempt}/{max_attempts}; retry after {}s",
                        wait.as_secs()
                    );
                    wait
                }
                Attempt::Failed(e) => {
                    last_reason = e.to_string();
                    if !e.is_retryable() {
                        log::error!("{name}: attempt {attempt}/{max_attempts} failed: {e}; giving up");
                        return DownloadResult::Failed {
                            attempts: attempt,
                            reason: last_reason,
                        };
                    }
                    log::warn!("{name}: attempt {attempt}/{max_attempts} failed: {e}");
                    self.policy.backoff(attempt)
                }
            };

            if attempt == max_attempts {
                break;
            }
            if is_shutdown_requested() {
                log::warn!("{name}: shutdown requested; not retrying");
                return DownloadResult::Failed {
                    attempts: attempt,
                    reason: format!("{last_reason} (interrupted)"),
                };
            }
            pb.set_message(format!("retry {attempt}/{} in {}s", self.policy.max_retries, delay.as_secs()));
            self.sleeper.sleep(delay);
        }

        log::error!("Failed to download {url} after {max_attempts} attempt(s): {last_reason}");
        DownloadResult::Failed {
            attempts: max_attempts,
            reason: last_reason,
        }
    }

    fn attempt(&self, url: &str, query: &[(&str, &str)], dest: &Path, pb: &ProgressBar) -> Attempt {
        let resp = match self.transport.get(url, query, self.timeout) {
            Ok(resp) => resp,
            Err(e) => return Attempt::Failed(e),
        };
        if resp.status == 503 {
            return Attempt::Unavailable(resp.retry_after);
        }
        let mut resp = match resp.error_for_status() {
            Ok(resp) => resp,
            Err(e) => return Attempt::Failed(e),
        };

        if let Some(total) = resp.content_length {
            upgrade_to_bar(pb, total);
        }

        // Dropping the sink on any error path removes the tmp file
        let result = FileSink::create(dest).and_then(|mut sink| {
            sink.copy_from(&mut resp.body, |written| pb.set_position(written))?;
            sink.finalize()
        });
        match result {
            Ok(bytes) => Attempt::Done(bytes),
            Err(e) => Attempt::Failed(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_accessors() {
        let ok = DownloadResult::Downloaded {
            bytes: 10,
            attempts: 2,
        };
        let failed = DownloadResult::Failed {
            attempts: 4,
            reason: "HTTP 500: Internal Server Error".into(),
        };
        assert!(ok.is_success());
        assert_eq!(ok.attempts(), 2);
        assert!(!failed.is_success());
        assert_eq!(failed.attempts(), 4);
    }
}
