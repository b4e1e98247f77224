//! # vidsum
//!
//! Turn a video into a structured, scene-level report and hand it to a
//! language model for summarization.
//!
//! A run decodes the video with FFmpeg (via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), samples every
//! N-th frame, splits the sampled frames into scenes by mean absolute luma
//! difference, extracts lightweight per-frame signals (text, salient
//! regions, brightness, slide detection), aggregates them per scene and
//! builds a [`VideoReport`]. A [`SummarySink`] then turns the report into
//! prose.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidsum::{HeuristicAnalyzer, Pipeline, PipelineOptions, VidsumError};
//!
//! let pipeline = Pipeline::new(PipelineOptions::new(), HeuristicAnalyzer::default())?;
//! let output = pipeline.run("lecture.mp4")?;
//! println!("{}", output.report.to_json_pretty()?);
//! # Ok::<(), VidsumError>(())
//! ```
//!
//! ### On-Screen Text
//!
//! Text extraction is off unless an OCR backend is plugged in. The bundled
//! [`TesseractExtractor`] shells out to the `tesseract` executable:
//!
//! ```no_run
//! use vidsum::{HeuristicAnalyzer, Pipeline, PipelineOptions, TesseractExtractor};
//!
//! let analyzer = HeuristicAnalyzer::default().with_text_extractor(TesseractExtractor::new());
//! let pipeline = Pipeline::new(PipelineOptions::new(), analyzer)?;
//! # Ok::<(), vidsum::VidsumError>(())
//! ```
//!
//! ### Summarize with Gemini
//!
//! ```no_run
//! use vidsum::{GeminiConfig, GeminiSink, HeuristicAnalyzer, Pipeline, PipelineOptions};
//!
//! # fn main() -> Result<(), vidsum::VidsumError> {
//! let pipeline = Pipeline::new(
//!     PipelineOptions::new().with_sample_stride(30),
//!     HeuristicAnalyzer::default(),
//! )?;
//! let output = pipeline.run("lecture.mp4")?;
//!
//! let sink = GeminiSink::new(GeminiConfig::from_env()?)?.with_retries();
//! let summary = output.summarize_with(&sink);
//! vidsum::output::save_summary("output/summaries", "lecture.mp4", &summary)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Segment Without Decoding
//!
//! Segmentation and aggregation are pure and work on any luma sequence:
//!
//! ```
//! use image::GrayImage;
//! use vidsum::segmenter::segment;
//!
//! let dark = GrayImage::new(4, 4);
//! let light = GrayImage::from_pixel(4, 4, image::Luma([255]));
//! let scenes = segment([dark.clone(), dark, light.clone(), light], 30.0)?;
//! assert_eq!(scenes.len(), 2);
//! # Ok::<(), vidsum::VidsumError>(())
//! ```
//!
//! ## Features
//!
//! - **Streaming decode** with a bounded working set: one decoded frame
//!   plus the previous frame's luma
//! - **Causal scene segmentation** with a configurable threshold
//! - **Pluggable analysis** through [`FrameAnalyzer`] and [`TextExtractor`]
//! - **Positional aggregation** of per-frame signals into scene summaries
//! - **Progress & cancellation** via [`ProgressCallback`] and
//!   [`CancellationToken`]
//! - **Pluggable summarization** through [`SummarySink`], with retries and a
//!   placeholder on failure
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `gemini` | [`GeminiSink`] over blocking HTTP (default) |
//! | `rayon` | Frame analysis in bounded parallel batches |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod aggregator;
pub mod analyzer;
pub mod configuration;
pub mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod frame;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod metadata;
pub mod output;
#[cfg(feature = "rayon")]
mod parallel;
pub mod pipeline;
pub mod progress;
pub mod regions;
pub mod report;
pub mod segmenter;
pub mod sink;
pub mod source;
pub mod tesseract;
pub mod text;

pub use aggregator::{SceneSummary, aggregate_scenes};
pub use analyzer::{AnalyzerOptions, FrameAnalyzer, FrameSignal, HeuristicAnalyzer};
pub use configuration::PipelineOptions;
pub use error::VidsumError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::Frame;
#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiSink};
pub use metadata::VideoMetadata;
pub use pipeline::{Pipeline, PipelineOutput};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use regions::{BoundingBox, DetectedRegion, RegionKind, RegionOptions};
pub use report::{PromptStyle, VideoReport, build_report};
pub use segmenter::{SceneRange, SceneSegmenter};
pub use sink::{RetryPolicy, RetryingSink, SummarySink};
pub use source::{FrameIterator, VideoSource};
pub use tesseract::TesseractExtractor;
pub use text::{NoTextExtractor, TextExtractor};
