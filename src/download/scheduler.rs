//! Token-bounded dispatch, result aggregation, cancellation fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::task::{Id, JoinSet};
use tracing::{info, warn};

use crate::config::DownloaderConfig;
use crate::progress::ProgressSink;

use super::error::{DownloadError, FailedDownload};
use super::path_arbiter;
use super::registry::{ProtocolRegistry, Transferred, TransferContext};
use super::request::DownloadRequest;
use super::results::Results;
use super::token::{Token, TokenPool};

type Outcome = Result<Transferred, FailedDownload>;

/// Runs every queued request to completion, bounded by `config.max_parallel`.
///
/// A single file's failure never aborts the batch: each transfer's outcome
/// is collected independently and folded into the returned [`Results`].
pub(crate) async fn run_batch(
    config: Arc<DownloaderConfig>,
    registry: Arc<ProtocolRegistry>,
    progress: Arc<dyn ProgressSink>,
    requests: Vec<DownloadRequest>,
) -> Results {
    let total = requests.len();
    let aggregate_bar = progress.aggregate_bar(total as u64);
    let mut token_pool = TokenPool::new(config.max_parallel());
    let releaser = token_pool.releaser();
    let http_client = Client::new();

    let mut workers: JoinSet<(usize, Token, Outcome)> = JoinSet::new();
    let mut task_indices: HashMap<Id, usize> = HashMap::with_capacity(total);
    let mut signal_watch = SignalWatch::install();
    let mut cancelled = false;
    let mut requests_iter = requests.into_iter().enumerate();

    'dispatch: while let Some((index, request)) = requests_iter.next() {
        tokio::select! {
            biased;
            () = wait_for_signal(&mut signal_watch) => {
                warn!("received shutdown signal, cancelling in-flight downloads");
                cancelled = true;
                break 'dispatch;
            }
            token = token_pool.acquire() => {
                let handle = spawn_transfer(&mut workers, index, Arc::clone(&config), Arc::clone(&registry), Arc::clone(&progress), http_client.clone(), request, token);
                task_indices.insert(handle.id(), index);
            }
        }
    }

    if cancelled {
        workers.abort_all();
    }

    // Indexed by enqueue order, not completion order, so `Results.urls`
    // preserves the order callers enqueued in regardless of which transfer
    // finished first.
    let mut outcomes: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
    loop {
        let joined = if cancelled {
            workers.join_next_with_id().await
        } else {
            tokio::select! {
                biased;
                () = wait_for_signal(&mut signal_watch) => {
                    warn!("received shutdown signal, cancelling in-flight downloads");
                    cancelled = true;
                    workers.abort_all();
                    workers.join_next_with_id().await
                }
                joined = workers.join_next_with_id() => joined,
            }
        };

        match joined {
            None => break,
            Some(Ok((_id, (index, token, outcome)))) => {
                releaser.release(token);
                if outcome.is_ok() {
                    aggregate_bar.inc(1);
                }
                outcomes[index] = Some(outcome);
            }
            Some(Err(join_error)) => {
                // A cancelled (aborted-for-shutdown) task vanishes from the
                // batch silently, matching asyncio's CancelledError not
                // surfacing as a reportable result. A genuine panic is
                // reported as a failure so it cannot abort the whole batch.
                if !join_error.is_cancelled() {
                    warn!(error = %join_error, "download task panicked");
                    if let Some(&index) = task_indices.get(&join_error.id()) {
                        outcomes[index] = Some(Err(FailedDownload::new(
                            "unknown",
                            None,
                            DownloadError::io(std::path::PathBuf::new(), std::io::Error::other(join_error.to_string())),
                        )));
                    }
                }
            }
        }
    }

    aggregate_bar.finish();
    aggregate_results(outcomes.into_iter().flatten().collect())
}

fn spawn_transfer(
    workers: &mut JoinSet<(usize, Token, Outcome)>,
    index: usize,
    config: Arc<DownloaderConfig>,
    registry: Arc<ProtocolRegistry>,
    progress: Arc<dyn ProgressSink>,
    http_client: Client,
    request: DownloadRequest,
    token: Token,
) -> tokio::task::AbortHandle {
    workers.spawn(async move {
        let scheme = url::Url::parse(request.url()).ok().map(|u| u.scheme().to_string());
        let handler = match scheme.as_deref().map(|scheme| registry.get_handler(scheme, request.url())) {
            Some(Ok(handler)) => handler,
            Some(Err(error)) => return (index, token, Err(FailedDownload::new(request.url(), None, error))),
            None => {
                return (
                    index,
                    token,
                    Err(FailedDownload::new(request.url(), None, DownloadError::invalid_url(request.url()))),
                );
            }
        };

        let ctx = TransferContext {
            config,
            http_client,
            request,
            token,
            progress,
        };
        let outcome = handler.run_download(ctx).await;
        (index, token, outcome)
    })
}

/// Promotes sidecars for successful transfers, removes them for failed
/// transfers, and logs a batch-level summary when any file failed.
fn aggregate_results(outcomes: Vec<Outcome>) -> Results {
    let total = outcomes.len();
    let mut failed = 0usize;
    let mut results = Results::new();

    for outcome in outcomes {
        match outcome {
            Ok(transferred) => {
                let promoted = path_arbiter::promote(&transferred.tempfile_path);
                results.add_success(promoted, transferred.url);
            }
            Err(failed_download) => {
                failed += 1;
                if let Some(intended_path) = &failed_download.intended_path {
                    path_arbiter::remove(&path_arbiter::sidecar_path(intended_path));
                }
                info!(url = %failed_download.url, error = %failed_download.source, "file failed to download");
                results.add_error(failed_download.intended_path, failed_download.url, failed_download.source.to_string());
            }
        }
    }

    if failed > 0 {
        info!("{failed}/{total} files failed to download.");
    }

    results
}

/// Watches SIGINT/SIGTERM: POSIX-only, and only when running on the main OS
/// thread.
#[cfg(unix)]
struct SignalWatch {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalWatch {
    fn install() -> Option<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        if std::thread::current().name() != Some("main") {
            warn!("downloader running on a non-main thread; unable to install SIGINT/SIGTERM cancellation");
            return None;
        }
        let sigint = signal(SignalKind::interrupt()).ok()?;
        let sigterm = signal(SignalKind::terminate()).ok()?;
        Some(Self { sigint, sigterm })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {}
            _ = self.sigterm.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct SignalWatch;

#[cfg(not(unix))]
impl SignalWatch {
    fn install() -> Option<Self> {
        warn!("signal-based cancellation is only implemented on unix platforms");
        None
    }

    async fn recv(&mut self) {
        std::future::pending().await
    }
}

/// Resolves to a shutdown signal, or never resolves if no watch was installed.
async fn wait_for_signal(watch: &mut Option<SignalWatch>) {
    match watch {
        Some(watch) => watch.recv().await,
        None => std::future::pending().await,
    }
}
