//! Aggregated outcome of a download batch.

use std::path::PathBuf;

/// One file that downloaded successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    /// Final on-disk path.
    pub path: PathBuf,
    /// The URL it was downloaded from.
    pub url: String,
}

/// One file that failed to download after retries (if any) were exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The path that would have been used, if path resolution got that far.
    pub intended_path: Option<PathBuf>,
    /// The URL that failed.
    pub url: String,
    /// Human-readable cause, rendered from the underlying [`super::DownloadError`].
    pub cause: String,
}

/// Consolidated outcome of a `Downloader::download()` call.
///
/// `success` and `errors` are disjoint by URL; `urls` is their union in
/// enqueue order (not completion order, which is not stable).
#[derive(Debug, Clone, Default)]
pub struct Results {
    success: Vec<Success>,
    errors: Vec<Error>,
    urls: Vec<String>,
}

impl Results {
    /// Builds an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful download.
    pub fn add_success(&mut self, path: PathBuf, url: String) {
        self.urls.push(url.clone());
        self.success.push(Success { path, url });
    }

    /// Records a failed download.
    pub fn add_error(&mut self, intended_path: Option<PathBuf>, url: String, cause: String) {
        self.urls.push(url.clone());
        self.errors.push(Error {
            intended_path,
            url,
            cause,
        });
    }

    /// Successful downloads, in enqueue order (relative to other successes).
    #[must_use]
    pub fn success(&self) -> &[Success] {
        &self.success
    }

    /// Failed downloads, in enqueue order (relative to other failures).
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Every enqueued URL, in enqueue order.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Total number of outcomes recorded (`success.len() + errors.len()`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.success.len() + self.errors.len()
    }

    /// Whether no outcomes have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_errors_are_disjoint() {
        let mut results = Results::new();
        results.add_success(PathBuf::from("/tmp/a.txt"), "https://a".to_string());
        results.add_error(
            Some(PathBuf::from("/tmp/b.txt")),
            "https://b".to_string(),
            "HTTP 404".to_string(),
        );
        assert_eq!(results.success().len(), 1);
        assert_eq!(results.errors().len(), 1);
        assert_eq!(results.urls(), &["https://a".to_string(), "https://b".to_string()]);
    }

    #[test]
    fn test_len_counts_success_and_errors() {
        let mut results = Results::new();
        assert!(results.is_empty());
        results.add_success(PathBuf::from("/tmp/a.txt"), "https://a".to_string());
        results.add_error(None, "https://b".to_string(), "connection refused".to_string());
        assert_eq!(results.len(), 2);
        assert!(!results.is_empty());
    }

    #[test]
    fn test_error_preserves_absent_intended_path() {
        let mut results = Results::new();
        results.add_error(None, "https://unreachable".to_string(), "DNS failure".to_string());
        assert!(results.errors()[0].intended_path.is_none());
    }
}
