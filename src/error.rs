//! Error types for the `vidsum` crate.
//!
//! This module defines [`VidsumError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry the context needed to
//! diagnose a failed run: input paths, frame and scene indices, and
//! upstream error messages.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `vidsum` operations.
///
/// `NotFound` and `UnreadableMedia` are fatal for a run: there is nothing to
/// process. `InconsistentFrameGeometry` and `EmptySceneData` indicate a broken
/// internal contract. `SinkFailure` and `SinkRejected` are normally recovered into a placeholder
/// summary by [`summarize_or_placeholder`](crate::sink::summarize_or_placeholder).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidsumError {
    /// The input path does not resolve to a readable file.
    #[error("Video file not found: {path}")]
    NotFound {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
    },

    /// The container could not be opened, or the first read failed.
    #[error("Unreadable media at {path}: {reason}")]
    UnreadableMedia {
        /// Path of the media file.
        path: PathBuf,
        /// Underlying reason reported by the decoder.
        reason: String,
    },

    /// The container has no video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded after decoding had started.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// A sample stride of zero was configured.
    #[error("Sample stride must be greater than zero")]
    InvalidStride,

    /// The scene threshold is negative or not a finite number.
    #[error("Scene threshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f64),

    /// Two consecutive frames handed to the segmenter differ in size.
    #[error(
        "Frame {frame_index} is {found:?} but the previous frame was {expected:?}"
    )]
    InconsistentFrameGeometry {
        /// Sampled index of the offending frame.
        frame_index: usize,
        /// `(width, height)` of the previous frame.
        expected: (u32, u32),
        /// `(width, height)` of the offending frame.
        found: (u32, u32),
    },

    /// A scene with no member frames reached the aggregator.
    #[error("Scene {scene_index} has no frame data")]
    EmptySceneData {
        /// Index of the offending scene.
        scene_index: usize,
    },

    /// The summarization sink failed.
    #[error("Summary generation failed: {0}")]
    SinkFailure(String),

    /// The summarization service refused the request. Retrying the same
    /// request will fail the same way.
    #[error("Summary generation failed: {0}")]
    SinkRejected(String),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while building a frame raster.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A report could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] JsonError),
}

impl VidsumError {
    /// Whether repeating the failed operation may succeed.
    ///
    /// Rejected sink requests and reports that cannot be serialized are
    /// permanent; everything else is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            VidsumError::SinkRejected(_) | VidsumError::SerializationError(_)
        )
    }
}

impl From<FfmpegError> for VidsumError {
    fn from(error: FfmpegError) -> Self {
        VidsumError::FfmpegError(error.to_string())
    }
}
