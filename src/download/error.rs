//! Error types for the download module.
//!
//! A small set of transport-level errors (`DownloadError`) wrapped, once a
//! URL is known to have failed for good, in [`FailedDownload`] which also
//! carries whatever `.matris` sidecar needs cleaning up.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transferring a single file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HEAD/initial request returned a non-2xx, non-3xx status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A byte-range GET returned a response that didn't honor the requested range.
    #[error("range request for {url} failed: {detail}")]
    RangeRequestFailed {
        /// The URL being range-requested.
        url: String,
        /// What went wrong (unexpected status, short read, missing Content-Range, ...).
        detail: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// FTP control or data channel error.
    #[error("FTP error downloading {url}: {detail}")]
    Ftp {
        /// The URL being downloaded.
        url: String,
        /// Description of the FTP failure (from the underlying client).
        detail: String,
    },

    /// SSH/SFTP channel or protocol error.
    #[error("SFTP error downloading {url}: {detail}")]
    Sftp {
        /// The URL being downloaded.
        url: String,
        /// Description of the SFTP failure (from the underlying client).
        detail: String,
    },

    /// File system error during download (create file, write, rename, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The URL's scheme has no registered protocol handler.
    #[error("unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The offending scheme (e.g. `"gopher"`).
        scheme: String,
        /// The full URL.
        url: String,
    },
}

impl DownloadError {
    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a range-request-failed error.
    pub fn range_request_failed(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RangeRequestFailed {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an FTP error.
    pub fn ftp(url: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Ftp {
            url: url.into(),
            detail: detail.to_string(),
        }
    }

    /// Creates an SFTP error.
    pub fn sftp(url: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Sftp {
            url: url.into(),
            detail: detail.to_string(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unsupported-scheme error.
    pub fn unsupported_scheme(scheme: impl Into<String>, url: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
            url: url.into(),
        }
    }

    /// Whether this error belongs to the HTTP/HTTPS retry class.
    ///
    /// `Timeout` gets an unlimited free retry, `Network`/`RangeRequestFailed`/
    /// `HttpStatus` count against `max_tries`, everything else is not retried.
    #[must_use]
    pub fn is_http_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RangeRequestFailed { .. } | Self::HttpStatus { .. }
        )
    }

    /// Whether this error belongs to the FTP/SFTP retry class (`retry_ftp`).
    #[must_use]
    pub fn is_ftp_retryable(&self) -> bool {
        matches!(self, Self::Ftp { .. } | Self::Sftp { .. } | Self::Io { .. })
    }

    /// Whether this error is the "free retry, don't count against max_tries" class.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A download that failed for good, after retries (if any) were exhausted.
///
/// `intended_path` is `None` when failure happened before any path was
/// resolved (e.g. a HEAD probe that never got a response), and `Some` from
/// the point a `.matris` sidecar was allocated onward.
#[derive(Debug, Error)]
#[error("failed to download {url}: {source}")]
pub struct FailedDownload {
    /// The URL that failed.
    pub url: String,
    /// The resolved destination path, if resolution got that far.
    pub intended_path: Option<PathBuf>,
    /// The underlying error.
    #[source]
    pub source: DownloadError,
}

impl FailedDownload {
    /// Builds a failed-download record.
    #[must_use]
    pub fn new(url: impl Into<String>, intended_path: Option<PathBuf>, source: DownloadError) -> Self {
        Self {
            url: url.into(),
            intended_path,
            source,
        }
    }
}
