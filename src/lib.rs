//! Downloader Core Library
//!
//! Parallel, multi-protocol (HTTP/HTTPS, FTP, SFTP) batch download engine.
//! A caller enqueues URLs with [`Downloader::enqueue_file`] and then calls
//! [`Downloader::download`] once to run every queued transfer concurrently,
//! bounded by a token pool, and collect a consolidated [`Results`].
//!
//! # Architecture
//!
//! - [`config`] - frozen configuration records (`DownloaderConfig`, `SessionConfig`)
//! - [`download`] - the concurrent download engine: path arbiter, writer task,
//!   retry policy, per-protocol transfers, scheduler, and result aggregator
//! - [`progress`] - injectable progress sink abstraction
//!
//! The CLI front end lives in `main.rs` / `cli.rs` and is a thin consumer of
//! this library.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod progress;
mod user_agent;

pub use config::{DownloaderConfig, SessionConfig};
pub use download::{
    DownloadError, DownloadRequest, Downloader, FailedDownload, RequestOverrides, Results,
};
