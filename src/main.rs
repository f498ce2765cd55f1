//! CLI entry point for the downloader tool.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use clap::Parser;
use downloader_core::config::{DownloaderConfig, SessionConfig};
use downloader_core::download::Downloader;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let urls = collect_urls(&args);
    if urls.is_empty() {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://example.com/file.pdf' | downloader");
        return ExitCode::SUCCESS;
    }

    let session = SessionConfig::default()
        .with_timeouts(args.timeouts)
        .with_max_tries(args.max_tries);
    let config = DownloaderConfig::new(args.max_parallel, args.max_splits, !args.quiet, args.overwrite, session);
    let mut downloader = Downloader::from_config(config);

    let mut rejected = 0usize;
    for url in &urls {
        if let Err(error) = downloader.enqueue_file(url.clone(), Some(args.dir.clone()), None, None, Default::default()) {
            warn!(url = %url, %error, "skipping URL");
            rejected += 1;
        }
    }

    info!(queued = downloader.queued_downloads(), rejected, "starting download batch");

    let results = downloader.download();

    for success in results.success() {
        println!("{}", success.path.display());
    }

    let any_failed = !results.errors().is_empty();
    if args.show_errors {
        for error in results.errors() {
            eprintln!("{}: {}", error.url, error.cause);
        }
    }

    info!(
        succeeded = results.success().len(),
        failed = results.errors().len(),
        "download batch complete"
    );

    if args.show_errors && any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Positional URLs take precedence; otherwise reads one URL per non-blank
/// line from stdin, but only when stdin isn't an interactive terminal.
fn collect_urls(args: &Args) -> Vec<String> {
    if !args.urls.is_empty() {
        return args.urls.clone();
    }
    if io::stdin().is_terminal() {
        return Vec::new();
    }
    let mut buffer = String::new();
    if io::stdin().read_to_string(&mut buffer).is_err() {
        return Vec::new();
    }
    buffer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
