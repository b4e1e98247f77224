//! Decoded frames.
//!
//! A [`Frame`] is one sampled raster together with its place in the run:
//! the sampled index (position in the sampled sequence), the decode
//! position in the container, and the derived timestamp. Frames are
//! immutable once produced and are dropped as soon as the analyzer and the
//! segmenter are done with them.
//!
//! The grayscale plane is derived on first use and cached, so the segmenter
//! and the analyzer share one conversion per frame.

use std::sync::OnceLock;

use image::{GrayImage, RgbImage};

use crate::conversion::rgb_to_luma;

/// A sampled video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    index: usize,
    position: u64,
    timestamp: f64,
    image: RgbImage,
    luma: OnceLock<GrayImage>,
}

impl Frame {
    /// Build a frame from an RGB raster.
    ///
    /// `index` is the 0-based position in the sampled sequence, `position`
    /// the 0-based decode position in the container, `timestamp` the
    /// derived time in seconds.
    pub fn new(index: usize, position: u64, timestamp: f64, image: RgbImage) -> Self {
        Self {
            index,
            position,
            timestamp,
            image,
            luma: OnceLock::new(),
        }
    }

    /// 0-based index in the sampled-frame sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 0-based decode position in the container.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Timestamp in seconds (`index × stride / fps`).
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// The RGB raster.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// BT.601 grayscale version of the raster, computed once per frame.
    pub fn luma(&self) -> &GrayImage {
        self.luma.get_or_init(|| {
            let (width, height) = self.image.dimensions();
            let data: Vec<u8> = self
                .image
                .as_raw()
                .chunks_exact(3)
                .map(|px| rgb_to_luma(px[0], px[1], px[2]))
                .collect();
            GrayImage::from_raw(width, height, data)
                .unwrap_or_else(|| GrayImage::new(width, height))
        })
    }

    /// Whether [`luma`](Self::luma) has already been computed.
    pub fn has_cached_luma(&self) -> bool {
        self.luma.get().is_some()
    }

    /// Consume the frame and return its raster.
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
