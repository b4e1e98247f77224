//! The frame-to-scene pipeline.
//!
//! [`Pipeline`] drives one run: it pulls sampled frames from a
//! [`VideoSource`], feeds each frame to the [`SceneSegmenter`] and the
//! [`FrameAnalyzer`], drops the raster, and finally joins signals with
//! scene ranges into a [`VideoReport`].
//!
//! The segmenter always sees frames on the decode thread in sampled order.
//! With the `rayon` feature, analysis runs in bounded parallel batches whose
//! results are re-sequenced before aggregation.
//!
//! # Example
//!
//! ```no_run
//! use vidsum::{HeuristicAnalyzer, Pipeline, PipelineOptions, VidsumError};
//!
//! let options = PipelineOptions::new().with_sample_stride(15);
//! let pipeline = Pipeline::new(options, HeuristicAnalyzer::default())?;
//! let output = pipeline.run("lecture.mp4")?;
//!
//! for scene in &output.report.scenes {
//!     println!(
//!         "scene {} {:.1}s-{:.1}s ({} frames)",
//!         scene.scene_index, scene.start_time, scene.end_time, scene.frame_count
//!     );
//! }
//! # Ok::<(), VidsumError>(())
//! ```

use std::path::Path;

use crate::{
    aggregator::aggregate_scenes,
    analyzer::{FrameAnalyzer, FrameSignal},
    configuration::PipelineOptions,
    conversion::seconds_to_duration,
    error::VidsumError,
    frame::Frame,
    metadata::VideoMetadata,
    progress::{OperationType, ProgressTracker},
    report::{VideoReport, build_report, video_identifier},
    segmenter::{SceneRange, SceneSegmenter},
    sink::{SummarySink, summarize_or_placeholder},
    source::VideoSource,
};

#[cfg(feature = "rayon")]
use crate::parallel::AnalysisPool;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Stream metadata, when the frames came from a [`VideoSource`].
    pub metadata: Option<VideoMetadata>,
    /// Scene partition over the sampled frames.
    pub scenes: Vec<SceneRange>,
    /// The assembled report.
    pub report: VideoReport,
}

impl PipelineOutput {
    /// Summarize the report with `sink`, recovering failures into a
    /// placeholder text.
    pub fn summarize_with<S>(&self, sink: &S) -> String
    where
        S: SummarySink + ?Sized,
    {
        summarize_or_placeholder(sink, &self.report)
    }
}

/// Segments, analyzes and aggregates one video per run.
pub struct Pipeline<A> {
    options: PipelineOptions,
    analyzer: A,
    #[cfg(feature = "rayon")]
    pool: AnalysisPool,
}

impl<A: FrameAnalyzer> Pipeline<A> {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Whatever [`PipelineOptions::validate`] rejects.
    pub fn new(options: PipelineOptions, analyzer: A) -> Result<Self, VidsumError> {
        options.validate()?;
        Ok(Self {
            #[cfg(feature = "rayon")]
            pool: AnalysisPool::new(options.analysis_workers),
            options,
            analyzer,
        })
    }

    /// The pipeline's options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The pipeline's analyzer.
    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Process the video at `path`.
    ///
    /// # Errors
    ///
    /// - [`VidsumError::NotFound`] / [`VidsumError::UnreadableMedia`] /
    ///   [`VidsumError::NoVideoStream`] from opening the source.
    /// - [`VidsumError::VideoDecodeError`] if decoding fails mid-stream.
    /// - [`VidsumError::Cancelled`] if the cancellation token fires.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput, VidsumError> {
        let path = path.as_ref();
        log::info!("Processing video: {}", path.display());

        let source = VideoSource::open(path)?;
        let metadata = source.metadata().clone();
        log::info!(
            "Total frames: {:?}, FPS: {:.3}, sampling every {} frame(s)",
            metadata.frame_count,
            metadata.frames_per_second,
            self.options.sample_stride,
        );

        let expected = metadata
            .frame_count
            .map(|count| count.div_ceil(self.options.sample_stride));
        let frames = source.frames(self.options.sample_stride, self.options.resolution)?;

        let mut output = self.process(&video_identifier(path), frames, expected)?;
        output.metadata = Some(metadata);
        Ok(output)
    }

    /// Process an already-sampled frame sequence.
    ///
    /// Frames must arrive in sampled order; their position in the sequence
    /// is their scene-membership key and becomes
    /// [`FrameSignal::frame_index`], whatever [`Frame::index`] says.
    pub fn process_frames<I>(&self, video_id: &str, frames: I) -> Result<PipelineOutput, VidsumError>
    where
        I: IntoIterator<Item = Result<Frame, VidsumError>>,
    {
        self.process(video_id, frames, None)
    }

    fn process<I>(
        &self,
        video_id: &str,
        frames: I,
        expected: Option<u64>,
    ) -> Result<PipelineOutput, VidsumError>
    where
        I: IntoIterator<Item = Result<Frame, VidsumError>>,
    {
        let total = match (expected, self.options.max_frames) {
            (Some(expected), Some(cap)) => Some(expected.min(cap)),
            (expected, cap) => expected.or(cap),
        };
        let mut decoding = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::Decoding,
            total,
            self.options.batch_size,
        );
        let mut analysis = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::FrameAnalysis,
            total,
            self.options.batch_size,
        );

        let mut segmenter = SceneSegmenter::new(self.options.scene_threshold)?;
        let mut scenes = Vec::new();
        let mut signals: Vec<FrameSignal> = Vec::new();
        #[cfg(feature = "rayon")]
        let mut pending: Vec<(usize, Frame)> = Vec::with_capacity(self.pool.batch_capacity());

        let mut frames = frames.into_iter();
        let mut sampled: u64 = 0;
        loop {
            if self.options.is_cancelled() {
                return Err(VidsumError::Cancelled);
            }
            if self.options.max_frames.is_some_and(|cap| sampled >= cap) {
                log::debug!("Frame cap of {sampled} reached");
                break;
            }
            let Some(frame) = frames.next() else {
                break;
            };
            let frame = frame?;
            let position = sampled as usize;
            sampled += 1;
            if frame.index() != position {
                log::debug!(
                    "Frame index {} arrived at sampled position {position}",
                    frame.index()
                );
            }

            scenes.extend(segmenter.push_frame(&frame)?);
            decoding.advance(
                Some(frame.position()),
                Some(seconds_to_duration(frame.timestamp())),
            );

            #[cfg(feature = "rayon")]
            {
                pending.push((position, frame));
                if pending.len() >= self.pool.batch_capacity() {
                    self.flush(&mut pending, &mut signals, &mut analysis);
                }
            }
            #[cfg(not(feature = "rayon"))]
            {
                let signal = stamp(self.analyzer.analyze(&frame), position, &frame);
                analysis.advance(
                    Some(frame.position()),
                    Some(seconds_to_duration(signal.timestamp)),
                );
                signals.push(signal);
            }
        }
        drop(frames);

        #[cfg(feature = "rayon")]
        self.flush(&mut pending, &mut signals, &mut analysis);

        scenes.extend(segmenter.finish());
        decoding.finish();
        analysis.finish();

        log::info!(
            "Extracted {} frames across {} scenes",
            signals.len(),
            scenes.len()
        );

        let summaries = aggregate_scenes(&signals, &scenes)?;
        let report = build_report(video_id, summaries, signals);

        Ok(PipelineOutput {
            metadata: None,
            scenes,
            report,
        })
    }

    #[cfg(feature = "rayon")]
    fn flush(
        &self,
        pending: &mut Vec<(usize, Frame)>,
        signals: &mut Vec<FrameSignal>,
        analysis: &mut ProgressTracker,
    ) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        for signal in self.pool.analyze(&self.analyzer, batch, stamp) {
            analysis.advance(None, Some(seconds_to_duration(signal.timestamp)));
            signals.push(signal);
        }
    }
}

/// Pin a signal to its sampled position, which is also its scene-membership
/// key, and to the timestamp of the frame it was computed from.
fn stamp(mut signal: FrameSignal, position: usize, frame: &Frame) -> FrameSignal {
    signal.frame_index = position;
    signal.timestamp = frame.timestamp();
    signal
}
