//! Pipeline configuration.
//!
//! [`PipelineOptions`] is a builder that carries the sampling stride, the
//! scene threshold, and operational settings (progress, cancellation, frame
//! cap, decode resolution) through a run without widening every signature.
//!
//! # Example
//!
//! ```no_run
//! use vidsum::{CancellationToken, PipelineOptions};
//!
//! let token = CancellationToken::new();
//! let options = PipelineOptions::new()
//!     .with_sample_stride(5)
//!     .with_scene_threshold(25.0)
//!     .with_max_frames(1_000)
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::VidsumError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Configuration for a pipeline run.
///
/// A default-constructed value samples every frame and uses a scene
/// threshold of 30 on the 0–255 grayscale difference scale. Both numbers
/// are empirical defaults, not invariants.
#[derive(Clone)]
pub struct PipelineOptions {
    pub(crate) sample_stride: u64,
    pub(crate) scene_threshold: f64,
    pub(crate) max_frames: Option<u64>,
    pub(crate) resolution: Option<(u32, u32)>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
    pub(crate) analysis_workers: usize,
}

impl Debug for PipelineOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOptions")
            .field("sample_stride", &self.sample_stride)
            .field("scene_threshold", &self.scene_threshold)
            .field("max_frames", &self.max_frames)
            .field("resolution", &self.resolution)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("analysis_workers", &self.analysis_workers)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Default sampling stride: every frame.
    pub const DEFAULT_SAMPLE_STRIDE: u64 = 1;

    /// Default scene threshold on the 0–255 mean-absolute-difference scale.
    pub const DEFAULT_SCENE_THRESHOLD: f64 = 30.0;

    /// A decode resolution that keeps analysis cheap on HD sources.
    /// Not applied unless passed to [`with_resolution`](Self::with_resolution).
    pub const DEFAULT_ANALYSIS_RESOLUTION: (u32, u32) = (640, 480);

    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            sample_stride: Self::DEFAULT_SAMPLE_STRIDE,
            scene_threshold: Self::DEFAULT_SCENE_THRESHOLD,
            max_frames: None,
            resolution: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            analysis_workers: default_workers(),
        }
    }

    /// Process only every `stride`-th decoded frame.
    ///
    /// Zero is rejected by [`validate`](Self::validate).
    #[must_use]
    pub fn with_sample_stride(mut self, stride: u64) -> Self {
        self.sample_stride = stride;
        self
    }

    /// Set the mean-absolute-difference above which a new scene starts.
    #[must_use]
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Stop after this many sampled frames.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Rescale decoded frames to `width × height` before analysis.
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width.max(1), height.max(1)));
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Number of frames analyzed concurrently. Clamped to a minimum of 1.
    ///
    /// Only takes effect when the `rayon` feature is enabled.
    #[must_use]
    pub fn with_analysis_workers(mut self, workers: usize) -> Self {
        self.analysis_workers = workers.max(1);
        self
    }

    /// The configured sampling stride.
    pub fn sample_stride(&self) -> u64 {
        self.sample_stride
    }

    /// The configured scene threshold.
    pub fn scene_threshold(&self) -> f64 {
        self.scene_threshold
    }

    /// The configured frame cap, if any.
    pub fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    /// Check that stride and threshold are usable.
    ///
    /// # Errors
    ///
    /// - [`VidsumError::InvalidStride`] if the stride is zero.
    /// - [`VidsumError::InvalidThreshold`] if the threshold is negative,
    ///   NaN or infinite.
    pub fn validate(&self) -> Result<(), VidsumError> {
        if self.sample_stride == 0 {
            return Err(VidsumError::InvalidStride);
        }
        if !self.scene_threshold.is_finite() || self.scene_threshold < 0.0 {
            return Err(VidsumError::InvalidThreshold(self.scene_threshold));
        }
        Ok(())
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

#[cfg(feature = "rayon")]
fn default_workers() -> usize {
    ::rayon::current_num_threads().max(1)
}

#[cfg(not(feature = "rayon"))]
fn default_workers() -> usize {
    1
}
