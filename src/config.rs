//! Frozen configuration records for the download engine.
//!
//! `SessionConfig` and `DownloaderConfig` are the Rust analogue of the
//! reference tool's `@dataclass` pair: constructed once by the caller (or the
//! CLI), never mutated afterwards, and cheaply cloned into every spawned
//! transfer task.

use std::collections::HashMap;
use std::time::Duration;

use tracing::Level;

/// Environment variable that, when present, defaults [`SessionConfig::log_level`] to [`Level::DEBUG`].
pub const DEBUG_ENV_VAR: &str = "DOWNLOADER_DEBUG";

/// Minimum allowed value for `max_parallel`, `max_splits`, `max_tries`, `chunksize`, `timeouts`.
const MIN_CLAMPED_VALUE: u32 = 1;

/// Default number of concurrent file transfers.
pub const DEFAULT_MAX_PARALLEL: u32 = 5;

/// Default number of byte-range splits per file (HTTP/SFTP).
pub const DEFAULT_MAX_SPLITS: u32 = 5;

/// Default maximum attempts (including the first) per network operation.
pub const DEFAULT_MAX_TRIES: u32 = 5;

/// Default chunk size, in bytes, read per queue item.
pub const DEFAULT_CHUNKSIZE: u64 = 1024;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUTS_SECS: u64 = 300;

/// Per-connection / per-request settings shared by every transfer in a batch.
///
/// Immutable after construction. Scalar fields below the minimum of 1 are
/// clamped up during construction rather than rejected.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Default headers merged into every HTTP request (per-request headers take precedence).
    headers: HashMap<String, String>,
    /// Bytes read per chunk pushed onto a file's chunk queue.
    chunksize: u64,
    /// Whether a per-file progress bar is rendered.
    pub file_progress: bool,
    /// Per-request timeout.
    timeouts: Duration,
    /// Maximum attempts (including the first) for a single network operation, absent overrides.
    max_tries: u32,
    /// Log level the CLI's subscriber should default to; `None` means "let the CLI decide".
    pub log_level: Option<Level>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Builds a session config with library defaults.
    ///
    /// Reads [`DEBUG_ENV_VAR`] once at construction time: if present, `log_level`
    /// defaults to [`Level::DEBUG`] unless explicitly overridden afterwards via [`Self::with_log_level`].
    #[must_use]
    pub fn new() -> Self {
        let log_level = std::env::var(DEBUG_ENV_VAR).ok().map(|_| Level::DEBUG);
        Self {
            headers: default_headers(),
            chunksize: DEFAULT_CHUNKSIZE,
            file_progress: true,
            timeouts: Duration::from_secs(DEFAULT_TIMEOUTS_SECS),
            max_tries: DEFAULT_MAX_TRIES,
            log_level,
        }
    }

    /// Overrides the default header map.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Overrides the chunk size, clamped to a minimum of 1 byte.
    #[must_use]
    pub fn with_chunksize(mut self, chunksize: u64) -> Self {
        self.chunksize = chunksize.max(u64::from(MIN_CLAMPED_VALUE));
        self
    }

    /// Overrides the per-request timeout, clamped to a minimum of 1 second.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts_secs: u64) -> Self {
        self.timeouts = Duration::from_secs(timeouts_secs.max(u64::from(MIN_CLAMPED_VALUE)));
        self
    }

    /// Overrides the default max-tries, clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries.max(MIN_CLAMPED_VALUE);
        self
    }

    /// Overrides the log level, taking precedence over the `DOWNLOADER_DEBUG` default.
    #[must_use]
    pub fn with_log_level(mut self, log_level: Level) -> Self {
        self.log_level = Some(log_level);
        self
    }

    /// Sets whether per-file progress bars are shown.
    #[must_use]
    pub fn with_file_progress(mut self, file_progress: bool) -> Self {
        self.file_progress = file_progress;
        self
    }

    /// Returns the default header map.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns the configured chunk size in bytes.
    #[must_use]
    pub fn chunksize(&self) -> u64 {
        self.chunksize
    }

    /// Returns the configured per-request timeout.
    #[must_use]
    pub fn timeouts(&self) -> Duration {
        self.timeouts
    }

    /// Returns the default max-tries.
    #[must_use]
    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }
}

fn default_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "User-Agent".to_string(),
        crate::user_agent::default_download_user_agent(),
    );
    headers
}

/// Process-wide defaults for a single [`crate::download::Downloader`] batch.
///
/// Immutable after construction; cloned into the scheduler and from there
/// into every spawned transfer.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Maximum number of concurrent file transfers.
    max_parallel: u32,
    /// Default number of byte-range splits per file, absent a per-request override.
    max_splits: u32,
    /// Whether files that already exist at their final path may be overwritten.
    pub overwrite: bool,
    /// Whether an aggregate "files completed" progress bar is shown.
    pub all_progress: bool,
    /// Shared per-connection settings.
    session: SessionConfig,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_PARALLEL,
            DEFAULT_MAX_SPLITS,
            true,
            true,
            SessionConfig::default(),
        )
    }
}

impl DownloaderConfig {
    /// Builds a downloader config, clamping `max_parallel`/`max_splits` to a minimum of 1.
    ///
    /// When `all_progress` is `false`, per-file progress is also disabled.
    #[must_use]
    pub fn new(
        max_parallel: u32,
        max_splits: u32,
        all_progress: bool,
        overwrite: bool,
        mut session: SessionConfig,
    ) -> Self {
        if !all_progress {
            session.file_progress = false;
        }
        Self {
            max_parallel: max_parallel.max(MIN_CLAMPED_VALUE),
            max_splits: max_splits.max(MIN_CLAMPED_VALUE),
            overwrite,
            all_progress,
            session,
        }
    }

    /// Returns the maximum number of concurrent file transfers.
    #[must_use]
    pub fn max_parallel(&self) -> u32 {
        self.max_parallel
    }

    /// Returns the default number of byte-range splits per file.
    #[must_use]
    pub fn max_splits(&self) -> u32 {
        self.max_splits
    }

    /// Returns the embedded session config.
    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }
}
