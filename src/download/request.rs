//! A queued download and its per-request overrides.

use std::collections::HashMap;
use std::path::PathBuf;

use super::path_arbiter;

/// Per-request overrides of the batch-wide [`crate::DownloaderConfig`]/[`crate::SessionConfig`].
///
/// Any field left unset falls back to the session/downloader default at
/// dispatch time.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    headers: HashMap<String, String>,
    max_splits: Option<u32>,
    max_tries: Option<u32>,
}

impl RequestOverrides {
    /// Builds an empty override set (every field falls back to the default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds headers merged over (and taking precedence over) the session default headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Overrides the number of byte-range splits for this file only.
    #[must_use]
    pub fn with_max_splits(mut self, max_splits: u32) -> Self {
        self.max_splits = Some(max_splits.max(1));
        self
    }

    /// Overrides the number of retry attempts for this file only.
    #[must_use]
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = Some(max_tries.max(1));
        self
    }

    pub(crate) fn max_splits_or(&self, default: u32) -> u32 {
        self.max_splits.unwrap_or(default)
    }

    pub(crate) fn max_tries_or(&self, default: u32) -> u32 {
        self.max_tries.unwrap_or(default)
    }

    /// Merges `base` headers with this request's overrides, the overrides winning.
    pub(crate) fn merged_headers(&self, base: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = base.clone();
        merged.extend(self.headers.clone());
        merged
    }
}

/// A single queued download: created by [`crate::download::Downloader::enqueue_file`],
/// consumed exactly once by the scheduler.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    url: String,
    dir: PathBuf,
    filename: Option<String>,
    overwrite: bool,
    overrides: RequestOverrides,
}

impl DownloadRequest {
    pub(crate) fn new(
        url: String,
        dir: PathBuf,
        filename: Option<String>,
        overwrite: bool,
        overrides: RequestOverrides,
    ) -> Self {
        Self {
            url,
            dir,
            filename,
            overwrite,
            overrides,
        }
    }

    /// The requested URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether an existing file at the resolved path may be overwritten.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// This request's override bag.
    #[must_use]
    pub fn overrides(&self) -> &RequestOverrides {
        &self.overrides
    }

    /// Resolves the pre-collision-check target path: `dir / filename`, where
    /// `filename` is the caller-supplied name if any, else derived from the
    /// URL (preferring a `Content-Disposition` header when one is available).
    pub(crate) fn target_path(&self, content_disposition: Option<&str>) -> PathBuf {
        let filename = self
            .filename
            .clone()
            .unwrap_or_else(|| path_arbiter::default_filename(&self.url, content_disposition));
        self.dir.join(filename)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filename_ignores_content_disposition() {
        let request = DownloadRequest::new(
            "https://example.com/a".to_string(),
            PathBuf::from("/tmp"),
            Some("chosen.bin".to_string()),
            false,
            RequestOverrides::new(),
        );
        let path = request.target_path(Some(r#"attachment; filename="other.bin""#));
        assert_eq!(path, PathBuf::from("/tmp/chosen.bin"));
    }

    #[test]
    fn test_default_filename_derived_from_content_disposition() {
        let request = DownloadRequest::new(
            "https://example.com/a".to_string(),
            PathBuf::from("/tmp"),
            None,
            false,
            RequestOverrides::new(),
        );
        let path = request.target_path(Some(r#"attachment; filename="testfile.txt""#));
        assert_eq!(path, PathBuf::from("/tmp/testfile.txt"));
    }

    #[test]
    fn test_default_filename_falls_back_to_url_segment() {
        let request = DownloadRequest::new(
            "https://example.com/papers/thesis.pdf".to_string(),
            PathBuf::from("/tmp"),
            None,
            false,
            RequestOverrides::new(),
        );
        let path = request.target_path(None);
        assert_eq!(path, PathBuf::from("/tmp/thesis.pdf"));
    }

    #[test]
    fn test_override_headers_win_over_base() {
        let mut base = HashMap::new();
        base.insert("User-Agent".to_string(), "base-ua".to_string());
        base.insert("Accept".to_string(), "*/*".to_string());

        let mut override_headers = HashMap::new();
        override_headers.insert("User-Agent".to_string(), "custom-ua".to_string());
        let overrides = RequestOverrides::new().with_headers(override_headers);

        let merged = overrides.merged_headers(&base);
        assert_eq!(merged.get("User-Agent"), Some(&"custom-ua".to_string()));
        assert_eq!(merged.get("Accept"), Some(&"*/*".to_string()));
    }

    #[test]
    fn test_override_max_splits_clamped_to_minimum() {
        let overrides = RequestOverrides::new().with_max_splits(0);
        assert_eq!(overrides.max_splits_or(5), 1);
    }

    #[test]
    fn test_unset_override_falls_back_to_default() {
        let overrides = RequestOverrides::new();
        assert_eq!(overrides.max_splits_or(5), 5);
        assert_eq!(overrides.max_tries_or(3), 3);
    }
}
