//! Retry logic for transient download failures.
//!
//! Two retry classes exist because HTTP and FTP/SFTP fail in different ways:
//!
//! - [`RetryClass::Http`] - network/range-request failures during an HTTP transfer.
//! - [`RetryClass::FtpSftp`] - control/data channel failures during FTP or SFTP.
//!
//! A timeout is always a free retry: it sleeps a flat second and does not
//! count against `max_tries`. Any other retryable error backs off linearly
//! (`attempts / 2` seconds, no jitter) and does count against `max_tries`.
//! Non-retryable errors propagate on the first occurrence.

use std::time::Duration;

use tracing::{debug, warn};

use super::error::DownloadError;

/// Flat delay before retrying after a timeout; does not count against `max_tries`.
const TIMEOUT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Which class of errors this operation should treat as retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// HTTP/HTTPS transfers: `Network`, `RangeRequestFailed`, and `HttpStatus`.
    Http,
    /// FTP/SFTP transfers: `Ftp`, `Sftp`, and `Io`.
    FtpSftp,
}

impl RetryClass {
    fn covers(self, error: &DownloadError) -> bool {
        match self {
            Self::Http => error.is_http_retryable(),
            Self::FtpSftp => error.is_ftp_retryable(),
        }
    }
}

/// What to do after an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Sleep `delay`, then retry. `next_attempts` is the attempt counter to use for
    /// the following decision (unchanged for the free timeout retry).
    Retry { delay: Duration, next_attempts: u32 },
    /// Give up; propagate the error as-is.
    GiveUp,
}

/// Pure decision step, kept separate from the sleeping/looping so it can be
/// unit-tested without an async runtime.
fn decide(class: RetryClass, error: &DownloadError, attempts: u32, max_tries: u32) -> Outcome {
    if error.is_timeout() {
        return Outcome::Retry {
            delay: TIMEOUT_RETRY_DELAY,
            next_attempts: attempts,
        };
    }
    if class.covers(error) && attempts < max_tries {
        return Outcome::Retry {
            delay: Duration::from_secs(u64::from(attempts) / 2),
            next_attempts: attempts + 1,
        };
    }
    Outcome::GiveUp
}

/// Runs `op` until it succeeds or [`decide`] gives up, sleeping between attempts.
///
/// `max_tries` is clamped to a minimum of 1, matching [`crate::config::SessionConfig`].
pub async fn retry<T, F, Fut>(class: RetryClass, max_tries: u32, mut op: F) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, DownloadError>>,
{
    let max_tries = max_tries.max(1);
    let mut attempts: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match decide(class, &error, attempts, max_tries) {
                Outcome::Retry {
                    delay,
                    next_attempts,
                } => {
                    if next_attempts == attempts {
                        debug!(error = %error, "timed out, retrying without counting against max_tries");
                    } else {
                        warn!(
                            error = %error,
                            attempts,
                            max_tries,
                            delay_secs = delay.as_secs(),
                            "retrying after error"
                        );
                    }
                    tokio::time::sleep(delay).await;
                    attempts = next_attempts;
                }
                Outcome::GiveUp => return Err(error),
            },
        }
    }
}
