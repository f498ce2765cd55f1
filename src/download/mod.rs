//! File transfer engine: a batch of queued URLs, dispatched across HTTP(S),
//! FTP, and SFTP handlers under a bounded concurrency budget.

mod downloader;
mod error;
mod ftp;
mod http;
mod path_arbiter;
mod registry;
mod request;
mod results;
mod retry;
mod scheduler;
mod sftp;
mod token;
mod writer;

pub use downloader::Downloader;
pub use error::{DownloadError, FailedDownload};
pub use registry::{ProtocolHandler, ProtocolRegistry, TransferContext, Transferred, default_registry};
pub use request::{DownloadRequest, RequestOverrides};
pub use results::{Error, Results, Success};
