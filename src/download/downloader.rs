//! Batch entry point: queue files, then run them all to completion.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DownloaderConfig, SessionConfig};
use crate::progress::{IndicatifSink, NoopSink, ProgressSink};

use super::error::DownloadError;
use super::registry::{default_registry, ProtocolRegistry};
use super::request::{DownloadRequest, RequestOverrides};
use super::results::Results;
use super::scheduler;

/// A batch of queued downloads, configured once and run to completion by a
/// single call to [`Downloader::download`].
pub struct Downloader {
    config: Arc<DownloaderConfig>,
    registry: Arc<ProtocolRegistry>,
    queue: Vec<DownloadRequest>,
    /// URLs rejected at enqueue time (bad URL, unsupported scheme), with the
    /// rendered cause. Folded into the next [`Self::download`] call's
    /// [`Results`] as errors, so a rejection is never invisible to a caller
    /// that only inspects the returned `Results`.
    rejected: Vec<(String, String)>,
}

impl Downloader {
    /// Builds a downloader with the given batch-wide settings.
    #[must_use]
    pub fn new(max_parallel: u32, max_splits: u32, all_progress: bool, overwrite: bool, session: SessionConfig) -> Self {
        Self {
            config: Arc::new(DownloaderConfig::new(max_parallel, max_splits, all_progress, overwrite, session)),
            registry: Arc::new(default_registry()),
            queue: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Builds a downloader from a pre-assembled config, for callers that
    /// already have one (the CLI does).
    #[must_use]
    pub fn from_config(config: DownloaderConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(default_registry()),
            queue: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Queues one file for download.
    ///
    /// `path` defaults to the current directory; `overwrite` defaults to the
    /// batch-wide setting. `filename`, if absent, is derived later from the
    /// URL or a `Content-Disposition` response header.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`]/[`DownloadError::UnsupportedScheme`]
    /// immediately if `url` can't be parsed or its scheme has no registered
    /// handler. The rejection is also recorded and surfaces as an error entry
    /// in the [`Results`] returned by the next [`Self::download`] call.
    pub fn enqueue_file(
        &mut self,
        url: impl Into<String>,
        path: Option<PathBuf>,
        filename: Option<String>,
        overwrite: Option<bool>,
        overrides: RequestOverrides,
    ) -> Result<(), DownloadError> {
        let url = url.into();
        let scheme = match url::Url::parse(&url) {
            Ok(parsed) => parsed.scheme().to_string(),
            Err(_) => {
                let error = DownloadError::invalid_url(&url);
                self.rejected.push((url, error.to_string()));
                return Err(error);
            }
        };
        if let Err(error) = self.registry.get_handler(&scheme, &url) {
            self.rejected.push((url, error.to_string()));
            return Err(error);
        }

        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        let overwrite = overwrite.unwrap_or(self.config.overwrite);
        self.queue.push(DownloadRequest::new(url, dir, filename, overwrite, overrides));
        Ok(())
    }

    /// Queues one file with no per-request overrides, for the common case.
    ///
    /// # Errors
    ///
    /// See [`Self::enqueue_file`].
    pub fn enqueue(&mut self, url: impl Into<String>) -> Result<(), DownloadError> {
        self.enqueue_file(url, None, None, None, RequestOverrides::new())
    }

    /// Number of files still queued (not yet run).
    #[must_use]
    pub fn queued_downloads(&self) -> usize {
        self.queue.len()
    }

    /// Runs every queued download to completion and returns the consolidated
    /// results, draining the queue.
    ///
    /// If called from within an already-running Tokio runtime, the batch is
    /// run to completion on a fresh runtime spun up on a worker thread (used
    /// when `download()` is called from inside a host application's own
    /// event loop, e.g. a notebook kernel); otherwise a runtime is built on
    /// the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if a fallback Tokio runtime cannot be built (resource
    /// exhaustion only) or if the worker thread spawned for that fallback
    /// panics itself, rather than folding such failures into [`Results`].
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn download(&mut self) -> Results {
        let requests = std::mem::take(&mut self.queue);
        let rejected = std::mem::take(&mut self.rejected);
        let config = Arc::clone(&self.config);
        let registry = Arc::clone(&self.registry);
        let progress: Arc<dyn ProgressSink> = if config.all_progress {
            Arc::new(IndicatifSink::new(config.session().file_progress))
        } else {
            Arc::new(NoopSink)
        };

        let mut results = if tokio::runtime::Handle::try_current().is_ok() {
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .expect("failed to build fallback Tokio runtime");
                runtime.block_on(scheduler::run_batch(config, registry, progress, requests))
            })
            .join()
            .expect("downloader worker thread panicked")
        } else {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build Tokio runtime");
            runtime.block_on(scheduler::run_batch(config, registry, progress, requests))
        };

        for (url, cause) in rejected {
            results.add_error(None, url, cause);
        }
        results
    }

    /// Every scheme this downloader can currently dispatch.
    #[must_use]
    pub fn supported_protocols(&self) -> Vec<&'static str> {
        self.registry.supported_protocols()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_rejects_unsupported_scheme() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        let result = downloader.enqueue("gopher://example.com/file");
        assert!(result.is_err());
        assert_eq!(downloader.queued_downloads(), 0);
    }

    #[test]
    fn test_rejected_enqueue_surfaces_as_error_in_next_download_results() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        assert!(downloader.enqueue("gopher://example.com/file").is_err());

        let results = downloader.download();
        assert!(results.success().is_empty());
        assert_eq!(results.errors().len(), 1);
        assert_eq!(results.errors()[0].url, "gopher://example.com/file");
        assert!(results.errors()[0].intended_path.is_none());
        assert_eq!(results.urls().len(), 1);
    }

    #[test]
    fn test_rejected_enqueue_is_cleared_after_a_download_call() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        assert!(downloader.enqueue("gopher://example.com/file").is_err());
        let first = downloader.download();
        assert_eq!(first.errors().len(), 1);

        let second = downloader.download();
        assert!(second.is_empty());
    }

    #[test]
    fn test_enqueue_accepts_supported_scheme() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        downloader.enqueue("https://example.com/file.pdf").unwrap();
        assert_eq!(downloader.queued_downloads(), 1);
    }

    #[test]
    fn test_download_with_empty_queue_returns_empty_results() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        let results = downloader.download();
        assert!(results.is_empty());
        assert_eq!(downloader.queued_downloads(), 0);
    }

    #[test]
    fn test_enqueue_file_honors_per_request_overwrite_override() {
        let mut downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        downloader
            .enqueue_file(
                "https://example.com/file.pdf",
                None,
                None,
                Some(true),
                RequestOverrides::new(),
            )
            .unwrap();
        assert_eq!(downloader.queued_downloads(), 1);
    }

    #[test]
    fn test_supported_protocols_lists_all_four_schemes() {
        let downloader = Downloader::new(5, 5, false, false, SessionConfig::default());
        let mut schemes = downloader.supported_protocols();
        schemes.sort_unstable();
        assert_eq!(schemes, vec!["ftp", "http", "https", "sftp"]);
    }
}
