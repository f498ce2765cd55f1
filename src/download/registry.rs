//! Protocol dispatch: scheme -> transfer implementation.
//!
//! Rust's `async fn` in traits isn't yet object-safe, so `#[async_trait]` is
//! used to get a `dyn ProtocolHandler` the scheduler can dispatch through
//! without knowing the concrete transfer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::DownloaderConfig;

use super::error::{DownloadError, FailedDownload};
use super::request::DownloadRequest;
use super::token::Token;
use crate::progress::ProgressSink;

/// Everything a transfer implementation needs, bundled so the scheduler's
/// dispatch call site stays small as protocols are added.
pub struct TransferContext {
    /// Batch-wide configuration.
    pub config: Arc<DownloaderConfig>,
    /// Shared HTTP client (HTTP/HTTPS transfers only; unused by FTP/SFTP).
    pub http_client: Client,
    /// The request being serviced.
    pub request: DownloadRequest,
    /// This transfer's dispatch token (caps concurrency, assigns a progress row).
    pub token: Token,
    /// Progress bar factory.
    pub progress: Arc<dyn ProgressSink>,
}

/// The outcome of a successful transfer: final URL (post-redirect for HTTP),
/// the resolved destination, and the `.matris` sidecar awaiting promotion.
#[derive(Debug, Clone)]
pub struct Transferred {
    /// The URL actually fetched (may differ from the requested URL after redirects).
    pub url: String,
    /// Final destination path chosen by the path arbiter.
    pub final_path: PathBuf,
    /// The sidecar holding the downloaded bytes, not yet promoted.
    pub tempfile_path: PathBuf,
}

/// One protocol's transfer state machine.
///
/// Implementations catch every internal error, clean up their workers and
/// writer, and wrap the cause in [`FailedDownload`] - the only error type
/// that is allowed to reach the scheduler from a transfer.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// Runs one file's transfer to completion or failure.
    async fn run_download(&self, ctx: TransferContext) -> Result<Transferred, FailedDownload>;
}

type HandlerFactory = fn() -> Box<dyn ProtocolHandler>;

/// Maps URL scheme to a transfer implementation.
pub struct ProtocolRegistry {
    handlers: HashMap<&'static str, HandlerFactory>,
}

impl ProtocolRegistry {
    /// Builds a registry with no registered schemes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `factory` for every scheme in `schemes`.
    pub fn register(&mut self, schemes: &[&'static str], factory: HandlerFactory) {
        for scheme in schemes {
            self.handlers.insert(scheme, factory);
        }
    }

    /// Every scheme with a registered handler.
    #[must_use]
    pub fn supported_protocols(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Builds a fresh handler for `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::UnsupportedScheme`] when no handler is registered.
    pub fn get_handler(&self, scheme: &str, url: &str) -> Result<Box<dyn ProtocolHandler>, DownloadError> {
        self.handlers
            .get(scheme)
            .map(|factory| factory())
            .ok_or_else(|| DownloadError::unsupported_scheme(scheme, url))
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the registry used by `Downloader`: HTTP/HTTPS, FTP, and SFTP.
#[must_use]
pub fn default_registry() -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();
    registry.register(&["http", "https"], || Box::new(super::http::HttpHandler));
    registry.register(&["ftp"], || Box::new(super::ftp::FtpHandler));
    registry.register(&["sftp"], || Box::new(super::sftp::SftpHandler));
    registry
}
