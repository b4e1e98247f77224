//! Parallel frame analysis.
//!
//! Frames are analyzed in bounded batches on a rayon pool. The indexed
//! parallel collect keeps results in input order, so the aggregator's
//! positional join is unaffected by scheduling.
//!
//! Only compiled with the `rayon` feature. The public surface is
//! [`PipelineOptions::with_analysis_workers`](crate::PipelineOptions::with_analysis_workers).

use ::rayon::{
    ThreadPool, ThreadPoolBuilder,
    iter::{IntoParallelIterator, ParallelIterator},
};

use crate::{
    analyzer::{FrameAnalyzer, FrameSignal},
    frame::Frame,
};

/// Frames buffered per worker before a batch is analyzed.
const FRAMES_PER_WORKER: usize = 4;

/// A pool sized to the configured worker count.
pub(crate) struct AnalysisPool {
    pool: Option<ThreadPool>,
    batch_capacity: usize,
}

impl AnalysisPool {
    pub(crate) fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pool = match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Some(pool),
            Err(error) => {
                log::warn!("Falling back to the global rayon pool: {error}");
                None
            }
        };
        Self {
            pool,
            batch_capacity: workers * FRAMES_PER_WORKER,
        }
    }

    /// How many frames to buffer before calling [`analyze`](Self::analyze).
    pub(crate) fn batch_capacity(&self) -> usize {
        self.batch_capacity
    }

    /// Analyze `(position, frame)` pairs, returning signals in the same
    /// order. Consumes the frames so their rasters are freed as soon as the
    /// batch completes.
    pub(crate) fn analyze<A>(
        &self,
        analyzer: &A,
        frames: Vec<(usize, Frame)>,
        stamp: fn(FrameSignal, usize, &Frame) -> FrameSignal,
    ) -> Vec<FrameSignal>
    where
        A: FrameAnalyzer + ?Sized,
    {
        let run = || -> Vec<FrameSignal> {
            frames
                .into_par_iter()
                .map(|(position, frame)| stamp(analyzer.analyze(&frame), position, &frame))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}
