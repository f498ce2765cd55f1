//! HTTP/HTTPS transfer: HEAD probe, byte-range split planning, N GET workers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use super::error::{DownloadError, FailedDownload};
use super::path_arbiter::{self, ByteRange};
use super::registry::{ProtocolHandler, TransferContext, Transferred};
use super::retry::{retry, RetryClass};
use super::writer;

/// HTTP/HTTPS transfer implementation.
pub struct HttpHandler;

struct Probe {
    url: String,
    content_length: Option<u64>,
    accept_ranges_bytes: bool,
    content_disposition: Option<String>,
}

#[async_trait]
impl ProtocolHandler for HttpHandler {
    #[instrument(skip(self, ctx), fields(url = %ctx.request.url()))]
    async fn run_download(&self, ctx: TransferContext) -> Result<Transferred, FailedDownload> {
        let url = ctx.request.url().to_string();
        let session = ctx.config.session();
        let headers = ctx.request.overrides().merged_headers(session.headers());
        let timeout = session.timeouts();
        let max_tries = ctx.request.overrides().max_tries_or(session.max_tries());
        let max_splits = ctx.request.overrides().max_splits_or(ctx.config.max_splits());
        let chunksize = session.chunksize();
        let client = ctx.http_client.clone();

        let probe = retry(RetryClass::Http, max_tries, || {
            probe_once(&client, &url, &headers, timeout)
        })
        .await
        .map_err(|source| FailedDownload::new(url.clone(), None, source))?;

        let target_path = ctx.request.target_path(probe.content_disposition.as_deref());
        let resolved_path = path_arbiter::resolve(&target_path, ctx.request.overwrite())
            .map_err(|source| {
                FailedDownload::new(url.clone(), None, DownloadError::io(target_path.clone(), source))
            })?;
        let tempfile_path = path_arbiter::allocate_tempfile(&resolved_path).map_err(|source| {
            FailedDownload::new(
                url.clone(),
                Some(resolved_path.clone()),
                DownloadError::io(resolved_path.clone(), source),
            )
        })?;

        let file_bar = ctx.progress.file_bar(
            ctx.token.n(),
            resolved_path
                .file_name()
                .map_or_else(|| url.clone(), |n| n.to_string_lossy().into_owned())
                .as_str(),
            probe.content_length,
        );
        let (sender, receiver) = writer::chunk_channel();
        let writer_handle = tokio::spawn(writer::run(receiver, tempfile_path.clone(), file_bar));

        let plan = split_plan(max_splits, probe.accept_ranges_bytes, probe.content_length);
        let mut workers = JoinSet::new();
        for range in plan {
            let client = client.clone();
            let worker_url = probe.url.clone();
            let worker_headers = headers.clone();
            let worker_sender = sender.clone();
            workers.spawn(async move {
                retry(RetryClass::Http, max_tries, || {
                    download_worker(&client, &worker_url, &worker_headers, timeout, chunksize, range, worker_sender.clone())
                })
                .await
            });
        }
        drop(sender);

        if let Err(error) = join_workers(&mut workers).await {
            workers.abort_all();
            writer_handle.abort();
            return Err(FailedDownload::new(url, Some(resolved_path), error));
        }

        match writer_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(FailedDownload::new(url, Some(resolved_path), error)),
            Err(join_error) => {
                return Err(FailedDownload::new(
                    url,
                    Some(resolved_path),
                    DownloadError::io(tempfile_path, std::io::Error::other(join_error.to_string())),
                ));
            }
        }

        Ok(Transferred {
            url: probe.url,
            final_path: resolved_path,
            tempfile_path,
        })
    }
}

fn split_plan(max_splits: u32, accept_ranges_bytes: bool, content_length: Option<u64>) -> Vec<Option<ByteRange>> {
    if !accept_ranges_bytes {
        return vec![None];
    }
    match content_length {
        Some(length) if length > 0 => {
            path_arbiter::generate_range(length, max_splits).into_iter().map(Some).collect()
        }
        _ => vec![None],
    }
}

async fn join_workers(workers: &mut JoinSet<Result<(), DownloadError>>) -> Result<(), DownloadError> {
    while let Some(outcome) = workers.join_next().await {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(error),
            Err(join_error) => {
                return Err(DownloadError::io(
                    PathBuf::new(),
                    std::io::Error::other(join_error.to_string()),
                ));
            }
        }
    }
    Ok(())
}

async fn probe_once(client: &Client, url: &str, headers: &HashMap<String, String>, timeout: Duration) -> Result<Probe, DownloadError> {
    let mut request = client.head(url).timeout(timeout);
    for (name, value) in headers {
        request = request.header(name, value);
    }
    let response = request.send().await.map_err(|source| classify_reqwest_error(url, source))?;

    debug!(status = %response.status(), "HEAD probe response");
    let status = response.status().as_u16();
    if !(200..400).contains(&status) {
        return Err(DownloadError::http_status(url, status));
    }

    let final_url = response.url().to_string();
    let content_length = response.content_length();
    let accept_ranges_bytes = response
        .headers()
        .get("accept-ranges")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("bytes"));
    let content_disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    Ok(Probe {
        url: final_url,
        content_length,
        accept_ranges_bytes,
        content_disposition,
    })
}

async fn download_worker(
    client: &Client,
    url: &str,
    headers: &HashMap<String, String>,
    timeout: Duration,
    chunksize: u64,
    range: Option<ByteRange>,
    sender: writer::ChunkSender,
) -> Result<(), DownloadError> {
    let mut request = client.get(url).timeout(timeout);
    let mut offset = 0u64;
    if let Some((start, end)) = range {
        offset = start;
        let range_header = match end {
            Some(end) => format!("bytes={start}-{end}"),
            None => format!("bytes={start}-"),
        };
        request = request.header("Range", range_header);
    }
    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request.send().await.map_err(|source| classify_reqwest_error(url, source))?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(DownloadError::range_request_failed(url, format!("unexpected status {status}")));
    }

    let mut stream = response.bytes_stream();
    let mut pending = Vec::new();
    while let Some(next) = stream.next().await {
        let bytes = next.map_err(|source| classify_reqwest_error(url, source))?;
        pending.extend_from_slice(&bytes);
        while pending.len() >= chunksize as usize {
            let chunk: Vec<u8> = pending.drain(..chunksize as usize).collect();
            let len = chunk.len() as u64;
            push_chunk(&sender, url, offset, Bytes::from(chunk)).await?;
            offset += len;
        }
    }
    if !pending.is_empty() {
        push_chunk(&sender, url, offset, Bytes::from(pending)).await?;
    }
    Ok(())
}

async fn push_chunk(sender: &writer::ChunkSender, url: &str, offset: u64, chunk: Bytes) -> Result<(), DownloadError> {
    sender
        .send((offset, chunk))
        .await
        .map_err(|_| DownloadError::range_request_failed(url, "writer task gone"))
}

fn classify_reqwest_error(url: &str, source: reqwest::Error) -> DownloadError {
    if source.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, source)
    }
}
