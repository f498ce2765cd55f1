//! Single writer task per file, draining an ordered chunk queue.
//!
//! Producers (one or more download workers) push `(offset, chunk)` pairs in
//! any order; the writer performs a positioned write for each, so producers
//! never need to coordinate among themselves.
//!
//! A `tokio::sync::mpsc` channel closes itself once every producer's sender
//! half is dropped, so the writer simply returns when
//! [`ChunkReceiver::recv`] yields `None`, which happens exactly when all
//! download workers have finished.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::progress::ProgressBarHandle;

use super::error::DownloadError;

/// Capacity of the in-memory channel between download workers and the writer.
const CHUNK_QUEUE_CAPACITY: usize = 32;

/// Sending half of a file's chunk queue.
pub type ChunkSender = mpsc::Sender<(u64, Bytes)>;
/// Receiving half of a file's chunk queue; owned by the writer task.
pub type ChunkReceiver = mpsc::Receiver<(u64, Bytes)>;

/// Builds a fresh chunk queue for one file transfer.
#[must_use]
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    mpsc::channel(CHUNK_QUEUE_CAPACITY)
}

/// Runs the writer loop for one file: opens `path` for writing (truncating
/// any prior content, matching the reference's `wb` mode), then applies
/// every `(offset, chunk)` pair that arrives until the queue closes.
///
/// # Errors
///
/// Returns the first I/O error encountered opening, seeking, writing, or
/// flushing the file.
pub async fn run(
    mut queue: ChunkReceiver,
    path: PathBuf,
    file_bar: Option<Box<dyn ProgressBarHandle>>,
) -> Result<(), DownloadError> {
    let mut file = File::create(&path)
        .await
        .map_err(|source| DownloadError::io(path.clone(), source))?;

    while let Some((offset, chunk)) = queue.recv().await {
        write_chunk(&mut file, &path, offset, &chunk).await?;
        if let Some(bar) = &file_bar {
            bar.inc(chunk.len() as u64);
        }
    }

    Ok(())
}

async fn write_chunk(file: &mut File, path: &Path, offset: u64, chunk: &Bytes) -> Result<(), DownloadError> {
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|source| DownloadError::io(path.to_path_buf(), source))?;
    file.write_all(chunk)
        .await
        .map_err(|source| DownloadError::io(path.to_path_buf(), source))?;
    file.flush()
        .await
        .map_err(|source| DownloadError::io(path.to_path_buf(), source))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writer_applies_out_of_order_chunks_correctly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.bin");
        let (sender, receiver) = chunk_channel();

        sender.send((5, Bytes::from_static(b"world"))).await.unwrap();
        sender.send((0, Bytes::from_static(b"hello"))).await.unwrap();
        drop(sender);

        writer_test_run(receiver, path.clone()).await;
        assert_eq!(std::fs::read(&path).unwrap(), b"helloworld");
    }

    #[tokio::test]
    async fn test_writer_truncates_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, b"stale-content-longer-than-new").unwrap();
        let (sender, receiver) = chunk_channel();
        sender.send((0, Bytes::from_static(b"new"))).await.unwrap();
        drop(sender);

        writer_test_run(receiver, path.clone()).await;
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_writer_returns_when_all_senders_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.bin");
        let (sender, receiver) = chunk_channel();
        drop(sender);
        let result = run(receiver, path, None).await;
        assert!(result.is_ok());
    }

    async fn writer_test_run(receiver: ChunkReceiver, path: PathBuf) {
        run(receiver, path, None).await.unwrap();
    }
}
