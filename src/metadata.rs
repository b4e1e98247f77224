//! Video metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and cached for its lifetime.

use std::time::Duration;

use serde::Serialize;

/// Metadata for the selected video stream.
///
/// ```no_run
/// use vidsum::VideoSource;
///
/// let source = VideoSource::open("input.mp4").unwrap();
/// let metadata = source.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// ```
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels, as stored in the container.
    pub width: u32,
    /// Frame height in pixels, as stored in the container.
    pub height: u32,
    /// Declared frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated total number of frames. `None` when the container declares
    /// neither a frame count nor a usable duration.
    pub frame_count: Option<u64>,
    /// Container-level duration. Zero when unknown.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}
