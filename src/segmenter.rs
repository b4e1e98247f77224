//! Scene segmentation.
//!
//! [`SceneSegmenter`] partitions the sampled-frame sequence into contiguous
//! scenes in a single causal pass. Each frame is compared with the one
//! before it; when the mean absolute grayscale difference exceeds the
//! threshold, the open scene is closed and a new one starts at the current
//! frame. Only the previous frame's luma plane is retained, so memory stays
//! constant however long the video is.
//!
//! Scenes are emitted as [`SceneRange`]s, half-open index ranges over the
//! sampled sequence. Downstream stages join on those ranges instead of
//! re-identifying frames by content.
//!
//! # Example
//!
//! ```
//! use image::{GrayImage, Luma};
//! use vidsum::{SceneSegmenter, VidsumError};
//!
//! let dark = GrayImage::from_pixel(4, 4, Luma([0]));
//! let light = GrayImage::from_pixel(4, 4, Luma([100]));
//!
//! let mut segmenter = SceneSegmenter::new(50.0)?;
//! let mut scenes = Vec::new();
//! for luma in [dark.clone(), dark, light.clone(), light] {
//!     scenes.extend(segmenter.push(luma)?);
//! }
//! scenes.extend(segmenter.finish());
//!
//! assert_eq!(scenes.len(), 2);
//! assert_eq!(scenes[0].frames, 0..2);
//! assert_eq!(scenes[1].frames, 2..4);
//! # Ok::<(), VidsumError>(())
//! ```

use std::ops::Range;

use image::GrayImage;
use serde::Serialize;

use crate::{error::VidsumError, frame::Frame};

/// One scene: a contiguous, non-empty run of sampled frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneRange {
    /// 0-based scene index, in emission order.
    pub scene_index: usize,
    /// Half-open range of sampled frame indices.
    pub frames: Range<usize>,
}

impl SceneRange {
    /// Number of frames in the scene.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the range holds no frames. Never true for emitted scenes.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Mean absolute per-pixel difference between two grayscale frames.
///
/// Ranges from 0.0 (identical) to 255.0 (black vs. white). Returns `None`
/// when the frames differ in size. Two empty frames are identical.
pub fn mean_absolute_difference(previous: &GrayImage, current: &GrayImage) -> Option<f64> {
    if previous.dimensions() != current.dimensions() {
        return None;
    }

    let pixels = previous.as_raw().len();
    if pixels == 0 {
        return Some(0.0);
    }

    let total: u64 = previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();
    Some(total as f64 / pixels as f64)
}

/// Streaming scene segmenter.
///
/// Feed frames in sampled order with [`push`](Self::push); every call that
/// closes a scene returns it. Call [`finish`](Self::finish) after the last
/// frame to close the final scene.
#[derive(Debug, Clone)]
pub struct SceneSegmenter {
    threshold: f64,
    previous: Option<GrayImage>,
    /// Sampled index of the first frame of the open scene.
    scene_start: usize,
    /// Sampled index the next pushed frame will get.
    next_frame: usize,
    next_scene: usize,
}

impl SceneSegmenter {
    /// Create a segmenter that starts a new scene when the difference to
    /// the previous frame is strictly greater than `threshold`.
    ///
    /// # Errors
    ///
    /// [`VidsumError::InvalidThreshold`] if `threshold` is negative, NaN or
    /// infinite.
    pub fn new(threshold: f64) -> Result<Self, VidsumError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(VidsumError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            previous: None,
            scene_start: 0,
            next_frame: 0,
            next_scene: 0,
        })
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of frames pushed so far.
    pub fn frames_seen(&self) -> usize {
        self.next_frame
    }

    /// Number of scenes emitted so far.
    pub fn scenes_emitted(&self) -> usize {
        self.next_scene
    }

    /// Push the grayscale version of the next sampled frame.
    ///
    /// Returns the scene this frame closed, if any. A rejected frame leaves
    /// the segmenter unchanged.
    ///
    /// # Errors
    ///
    /// [`VidsumError::InconsistentFrameGeometry`] if `luma` differs in size
    /// from the previous frame.
    pub fn push(&mut self, luma: GrayImage) -> Result<Option<SceneRange>, VidsumError> {
        let closed = self.compare(&luma)?;
        self.previous = Some(luma);
        self.next_frame += 1;
        Ok(closed)
    }

    /// Push a decoded frame. Same as [`push`](Self::push) on its cached
    /// luma plane.
    pub fn push_frame(&mut self, frame: &Frame) -> Result<Option<SceneRange>, VidsumError> {
        let luma = frame.luma();
        let closed = self.compare(luma)?;
        self.previous = Some(luma.clone());
        self.next_frame += 1;
        Ok(closed)
    }

    /// Compare `luma` with the previous frame and close the open scene on a
    /// cut. Does not record `luma`.
    fn compare(&mut self, luma: &GrayImage) -> Result<Option<SceneRange>, VidsumError> {
        let frame_index = self.next_frame;
        let Some(previous) = &self.previous else {
            return Ok(None);
        };

        let difference = mean_absolute_difference(previous, luma).ok_or(
            VidsumError::InconsistentFrameGeometry {
                frame_index,
                expected: previous.dimensions(),
                found: luma.dimensions(),
            },
        )?;

        if difference > self.threshold && frame_index > self.scene_start {
            log::trace!("Cut before frame {frame_index} (difference {difference:.2})");
            return Ok(Some(self.close(frame_index)));
        }
        Ok(None)
    }

    /// Close the open scene, if any frame was pushed since the last cut.
    pub fn finish(mut self) -> Option<SceneRange> {
        (self.next_frame > self.scene_start).then(|| self.close(self.next_frame))
    }

    fn close(&mut self, end: usize) -> SceneRange {
        let scene = SceneRange {
            scene_index: self.next_scene,
            frames: self.scene_start..end,
        };
        log::debug!(
            "Scene {} detected with {} frames",
            scene.scene_index,
            scene.len()
        );
        self.next_scene += 1;
        self.scene_start = end;
        scene
    }
}

/// Segment a complete sequence of grayscale frames.
///
/// Convenience wrapper over [`SceneSegmenter`] for callers that already
/// hold every frame.
pub fn segment<I>(frames: I, threshold: f64) -> Result<Vec<SceneRange>, VidsumError>
where
    I: IntoIterator<Item = GrayImage>,
{
    let mut segmenter = SceneSegmenter::new(threshold)?;
    let mut scenes = Vec::new();
    for luma in frames {
        scenes.extend(segmenter.push(luma)?);
    }
    scenes.extend(segmenter.finish());
    Ok(scenes)
}
