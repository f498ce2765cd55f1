//! Injectable progress rendering.
//!
//! The scheduler and each transfer talk to progress bars only through
//! [`ProgressSink`], so the download engine never depends on a terminal.
//! [`IndicatifSink`] wraps `indicatif::MultiProgress` the way the reference
//! codebase wraps `tqdm`; [`NoopSink`] backs `--quiet` and library embedding
//! where the caller wants silence.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One running progress bar (aggregate "files done" or per-file "bytes done").
pub trait ProgressBarHandle: Send + Sync {
    /// Advances the bar by `delta` units.
    fn inc(&self, delta: u64);
    /// Marks the bar as finished and removes it from the display.
    fn finish(&self);
}

/// Factory for the bars a download batch needs.
///
/// Object-safe so the scheduler can hold `Arc<dyn ProgressSink>` without
/// knowing which concrete renderer (or none) is behind it.
pub trait ProgressSink: Send + Sync {
    /// Builds the aggregate "files completed out of `total`" bar.
    fn aggregate_bar(&self, total: u64) -> Box<dyn ProgressBarHandle>;

    /// Builds a per-file byte-progress bar for the transfer occupying `slot`,
    /// or `None` if per-file bars are disabled.
    fn file_bar(&self, slot: u32, label: &str, total: Option<u64>) -> Option<Box<dyn ProgressBarHandle>>;
}

impl ProgressBarHandle for ProgressBar {
    fn inc(&self, delta: u64) {
        ProgressBar::inc(self, delta);
    }

    fn finish(&self) {
        ProgressBar::finish_and_clear(self);
    }
}

/// Renders aggregate and per-file bars with `indicatif`.
pub struct IndicatifSink {
    multi: MultiProgress,
    file_progress: bool,
}

impl IndicatifSink {
    /// Builds a sink over a fresh [`MultiProgress`]. `file_progress` controls
    /// whether [`Self::file_bar`] ever produces a bar.
    #[must_use]
    pub fn new(file_progress: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            file_progress,
        }
    }
}

impl ProgressSink for IndicatifSink {
    fn aggregate_bar(&self, total: u64) -> Box<dyn ProgressBarHandle> {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos}/{len} files")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("Files Downloaded");
        Box::new(bar)
    }

    fn file_bar(&self, _slot: u32, label: &str, total: Option<u64>) -> Option<Box<dyn ProgressBarHandle>> {
        if !self.file_progress {
            return None;
        }
        let bar = self.multi.add(ProgressBar::new(total.unwrap_or(0)));
        bar.set_style(
            ProgressStyle::with_template("{msg} {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(label.to_string());
        Some(Box::new(bar))
    }
}

struct NoopBar;

impl ProgressBarHandle for NoopBar {
    fn inc(&self, _delta: u64) {}
    fn finish(&self) {}
}

/// A sink that renders nothing; used for `--quiet` and embedding.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn aggregate_bar(&self, _total: u64) -> Box<dyn ProgressBarHandle> {
        Box::new(NoopBar)
    }

    fn file_bar(&self, _slot: u32, _label: &str, _total: Option<u64>) -> Option<Box<dyn ProgressBarHandle>> {
        None
    }
}
