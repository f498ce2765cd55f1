//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use downloader_core::config::{DEFAULT_MAX_PARALLEL, DEFAULT_MAX_SPLITS, DEFAULT_MAX_TRIES, DEFAULT_TIMEOUTS_SECS};

/// Parallel, multi-protocol (HTTP/FTP/SFTP) batch file downloader.
#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download; read from stdin (one per non-blank line) if omitted
    /// and stdin is not a terminal.
    pub urls: Vec<String>,

    /// Maximum number of files downloaded concurrently.
    #[arg(long, default_value_t = DEFAULT_MAX_PARALLEL)]
    pub max_parallel: u32,

    /// Maximum number of byte-range splits per file (HTTP/SFTP).
    #[arg(long, default_value_t = DEFAULT_MAX_SPLITS)]
    pub max_splits: u32,

    /// Maximum attempts (including the first) per network operation.
    #[arg(long, default_value_t = DEFAULT_MAX_TRIES)]
    pub max_tries: u32,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUTS_SECS)]
    pub timeouts: u64,

    /// Output directory for downloaded files.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite files that already exist at their destination.
    #[arg(long)]
    pub overwrite: bool,

    /// Suppress all progress bars.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print failed URLs and their cause to stderr, and exit non-zero if any failed.
    #[arg(long)]
    pub show_errors: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}
