//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes a running pipeline, [`CancellationToken`]
//! lets another thread abandon it, and [`ProgressInfo`] is the snapshot
//! delivered to callbacks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidsum::{
//!     CancellationToken, HeuristicAnalyzer, Pipeline, PipelineOptions,
//!     ProgressCallback, ProgressInfo, VidsumError,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = PipelineOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_cancellation(token.clone());
//!
//! let pipeline = Pipeline::new(options, HeuristicAnalyzer::default())?;
//! let output = pipeline.run("lecture.mp4")?;
//! # Ok::<(), VidsumError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The pipeline stage currently reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding and sampling frames from the container.
    Decoding,
    /// Running the frame analyzer over sampled frames.
    FrameAnalysis,
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is reporting.
    pub operation: OperationType,
    /// How many sampled frames have been processed so far.
    pub current: u64,
    /// Total items expected, if the container declares a frame count.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Decode position of the frame just processed.
    pub current_frame: Option<u64>,
    /// Timestamp of the frame just processed.
    pub current_timestamp: Option<Duration>,
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be [`Send`] and [`Sync`] because analysis may run on
/// worker threads when the `rayon` feature is enabled.
///
/// Callbacks observe but cannot halt the run. Use [`CancellationToken`] for
/// that.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. The pipeline checks the token before pulling each
/// frame; once cancelled, the decoder is dropped and the run returns
/// [`VidsumError::Cancelled`](crate::VidsumError::Cancelled).
///
/// ```
/// use vidsum::CancellationToken;
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

/// Tracks progress timing for one stage and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>, timestamp: Option<Duration>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(frame_number, timestamp);
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&mut self) {
        self.report(None, None);
    }

    fn report(&self, frame_number: Option<u64>, timestamp: Option<Duration>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| ((self.current as f32 / t as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
            current_timestamp: timestamp,
        };

        self.callback.on_progress(&info);
    }
}
