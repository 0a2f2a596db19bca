//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for observing a pipeline run,
//! [`CancellationToken`] for cooperative cancellation between markers, and
//! [`ProgressInfo`] snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clipmark::{Pipeline, PipelineOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.0}% of markers done", info.stage);
//!         }
//!     }
//! }
//!
//! let options = PipelineOptions::new().with_progress(Arc::new(PrintProgress));
//! let report = Pipeline::new(options).run("post.txt", "talk.mp4", "out")?;
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::marker::{Marker, MarkerKind};

/// The pipeline stage a progress snapshot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineStage {
    /// Markers have been scanned; `total` is now known.
    Scanning,
    /// A screenshot marker was processed.
    Screenshot,
    /// A clip marker was processed.
    Clip,
    /// The HTML page was assembled.
    Assembly,
}

impl From<MarkerKind> for PipelineStage {
    fn from(kind: MarkerKind) -> Self {
        match kind {
            MarkerKind::Clip => PipelineStage::Clip,
            MarkerKind::Screenshot => PipelineStage::Screenshot,
        }
    }
}

/// A snapshot of run progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What just happened.
    pub stage: PipelineStage,
    /// Markers processed so far.
    pub current: u64,
    /// Total markers in the document.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0), `None` for empty documents.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// Byte offset of the marker just processed.
    pub marker_offset: Option<usize>,
    /// Video timestamp of the marker just processed.
    pub marker_timestamp: Option<Duration>,
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be [`Send`] and [`Sync`] so a UI thread can own the
/// receiving end. Callbacks observe but cannot stop the run; use
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called after scanning, after each marker, and after assembly.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Used when no callback is set.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and keep one copy on the controlling side; call
/// [`cancel`](CancellationToken::cancel) to stop a run before its next
/// marker. Markers not yet processed are reported as cancelled and the HTML
/// page is still written.
///
/// # Example
///
/// ```
/// use clipmark::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for one run and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Report that scanning finished.
    pub(crate) fn scanned(&self) {
        self.report(PipelineStage::Scanning, None);
    }

    /// Record one processed marker.
    pub(crate) fn advance(&mut self, marker: &Marker) {
        self.current += 1;
        self.report(marker.kind.into(), Some(marker));
    }

    /// Report that the page was assembled.
    pub(crate) fn finish(&self) {
        self.report(PipelineStage::Assembly, None);
    }

    fn report(&self, stage: PipelineStage, marker: Option<&Marker>) {
        let elapsed = self.start_time.elapsed();

        let percentage =
            (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0);

        let estimated_remaining = (self.current > 0).then(|| {
            let remaining = self.total.saturating_sub(self.current);
            let per_item = elapsed / self.current as u32;
            per_item * remaining as u32
        });

        let info = ProgressInfo {
            stage,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            marker_offset: marker.map(|m| m.source_offset),
            marker_timestamp: marker.map(|m| m.timestamp),
        };

        self.callback.on_progress(&info);
    }
}
