//! Conversion helpers.
//!
//! Pixel-data copying out of FFmpeg frames and timestamp arithmetic shared
//! by the source and the pipeline. Only [`sampled_timestamp`] is public, for
//! callers that build [`Frame`](crate::Frame)s themselves.

use std::time::Duration;

use ffmpeg_next::frame::Video as VideoFrame;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// The result has no padding and can be handed to `ImageBuffer::from_raw`.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Timestamp in seconds of the `index`-th sampled frame.
///
/// Equals `index × stride / fps`. A non-positive frame rate yields `0.0`
/// rather than infinity so that containers without timing still produce
/// well-ordered reports.
pub fn sampled_timestamp(index: usize, stride: u64, frames_per_second: f64) -> f64 {
    if frames_per_second > 0.0 && frames_per_second.is_finite() {
        index as f64 * stride as f64 / frames_per_second
    } else {
        0.0
    }
}

/// Convert non-negative seconds to a [`Duration`], clamping negatives and NaN to zero.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

/// ITU-R BT.601 luma of an RGB pixel.
#[inline]
pub(crate) fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}
