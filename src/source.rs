//! Frame source.
//!
//! [`VideoSource`] opens a container, selects the best video stream and
//! caches its [`VideoMetadata`]. [`VideoSource::frames`] turns it into a
//! [`FrameIterator`], a lazy pull-based sequence of sampled frames in decode
//! order. The iterator owns the demuxer and decoder, so the decode handle is
//! released exactly when the iterator is dropped: after the last frame, on
//! error, or when the caller stops pulling early.
//!
//! # Example
//!
//! ```no_run
//! use vidsum::{VideoSource, VidsumError};
//!
//! let source = VideoSource::open("input.mp4")?;
//! println!("{:.2} fps", source.metadata().frames_per_second);
//!
//! // Every 10th frame, first five only. The decoder is closed when the
//! // iterator goes out of scope.
//! for frame in source.frames(10, None)?.take(5) {
//!     let frame = frame?;
//!     println!("frame {} at {:.2}s", frame.index(), frame.timestamp());
//! }
//! # Ok::<(), VidsumError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    conversion::{frame_to_buffer, sampled_timestamp},
    error::VidsumError,
    frame::Frame,
    metadata::VideoMetadata,
};

/// Consecutive non-EOF demuxer errors tolerated before giving up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 16;

/// An opened video container.
///
/// Created via [`VideoSource::open`]. Consumed by [`VideoSource::frames`],
/// which hands the open demuxer to the returned iterator.
pub struct VideoSource {
    input_context: Input,
    video_stream_index: usize,
    metadata: VideoMetadata,
    path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("video_stream_index", &self.video_stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, selects the best
    /// video stream and reads its metadata.
    ///
    /// # Errors
    ///
    /// - [`VidsumError::NotFound`] if `path` is not a readable regular file.
    /// - [`VidsumError::UnreadableMedia`] if FFmpeg cannot open the container
    ///   or build a decoder for its video stream.
    /// - [`VidsumError::NoVideoStream`] if the container has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VidsumError> {
        let path = path.as_ref().to_path_buf();

        let is_file = path.metadata().map(|m| m.is_file()).unwrap_or(false);
        if !is_file || File::open(&path).is_err() {
            return Err(VidsumError::NotFound { path });
        }

        log::debug!("Opening video file: {}", path.display());

        let unreadable = |reason: String| VidsumError::UnreadableMedia {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| unreadable(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| unreadable(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(VidsumError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| unreadable(format!("Failed to create video decoder: {error}")))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() > 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 && rate.numerator() > 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        // Prefer the container's declared count; fall back to an estimate.
        let declared_frames = stream.frames();
        let frame_count = if declared_frames > 0 {
            Some(declared_frames as u64)
        } else if frames_per_second > 0.0 && !duration.is_zero() {
            Some((duration.as_secs_f64() * frames_per_second) as u64)
        } else {
            None
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            format: input_context.format().name().to_string(),
        };

        log::debug!(
            "Video stream {}: {}x{} @ {:.3} fps, {:?} frames [{}]",
            video_stream_index,
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            video_stream_index,
            metadata,
            path,
        })
    }

    /// Cached metadata of the selected video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start decoding.
    ///
    /// Only decode positions where `position % stride == 0` are converted
    /// and yielded; all other frames are decoded and discarded. When
    /// `resolution` is set, frames are rescaled to it; otherwise they keep
    /// the decoded size.
    ///
    /// # Errors
    ///
    /// - [`VidsumError::InvalidStride`] if `stride` is zero.
    /// - [`VidsumError::UnreadableMedia`] if the decoder cannot be created.
    pub fn frames(
        self,
        stride: u64,
        resolution: Option<(u32, u32)>,
    ) -> Result<FrameIterator, VidsumError> {
        if stride == 0 {
            return Err(VidsumError::InvalidStride);
        }

        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(VidsumError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| VidsumError::UnreadableMedia {
                path: self.path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        Ok(FrameIterator {
            input_context: self.input_context,
            decoder,
            scaler: None,
            video_stream_index: self.video_stream_index,
            stride,
            resolution,
            metadata: self.metadata,
            path: self.path,
            position: 0,
            sampled: 0,
            consecutive_read_errors: 0,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }
}

/// Cached scaler plus the input geometry it was built for.
struct Scaler {
    context: ScalingContext,
    input: (Pixel, u32, u32),
    output: (u32, u32),
}

/// A lazy iterator over sampled frames, in decode order.
///
/// Owns the demuxer and decoder; dropping the iterator releases both.
/// After the first error the iterator is fused and yields `None`.
pub struct FrameIterator {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: Option<Scaler>,
    video_stream_index: usize,
    stride: u64,
    resolution: Option<(u32, u32)>,
    metadata: VideoMetadata,
    path: PathBuf,
    /// Decode position of the next frame the decoder emits.
    position: u64,
    /// Number of frames yielded so far.
    sampled: usize,
    consecutive_read_errors: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl FrameIterator {
    /// Metadata of the stream being decoded.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Number of frames yielded so far.
    pub fn sampled_count(&self) -> usize {
        self.sampled
    }

    /// Errors before the first decoded frame mean the file itself is bad.
    fn classify(&self, reason: String) -> VidsumError {
        if self.position == 0 {
            VidsumError::UnreadableMedia {
                path: self.path.clone(),
                reason,
            }
        } else {
            VidsumError::VideoDecodeError(reason)
        }
    }

    fn fail(&mut self, error: VidsumError) -> Option<Result<Frame, VidsumError>> {
        self.done = true;
        Some(Err(error))
    }

    /// Scale and convert the current `decoded_frame` to an RGB raster.
    fn convert_current_frame(&mut self) -> Result<RgbImage, VidsumError> {
        let input = (
            self.decoded_frame.format(),
            self.decoded_frame.width(),
            self.decoded_frame.height(),
        );

        // Some decoders change geometry or pixel format mid-stream.
        if self.scaler.as_ref().is_none_or(|scaler| scaler.input != input) {
            let output = self.resolution.unwrap_or((input.1, input.2));
            let context = ScalingContext::get(
                input.0,
                input.1,
                input.2,
                Pixel::RGB24,
                output.0,
                output.1,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some(Scaler {
                context,
                input,
                output,
            });
        }

        let Some(scaler) = self.scaler.as_mut() else {
            return Err(VidsumError::VideoDecodeError(
                "Scaler unavailable".to_string(),
            ));
        };
        scaler
            .context
            .run(&self.decoded_frame, &mut self.scaled_frame)?;

        let (width, height) = scaler.output;
        let buffer = frame_to_buffer(&self.scaled_frame, width, height, 3);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            VidsumError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}

impl Iterator for FrameIterator {
    type Item = Result<Frame, VidsumError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let position = self.position;
                self.position += 1;

                if position % self.stride != 0 {
                    continue;
                }

                return match self.convert_current_frame() {
                    Ok(image) => {
                        let index = self.sampled;
                        self.sampled += 1;
                        let timestamp =
                            sampled_timestamp(index, self.stride, self.metadata.frames_per_second);
                        Some(Ok(Frame::new(index, position, timestamp, image)))
                    }
                    Err(error) => self.fail(error),
                };
            }

            if self.eof_sent {
                self.done = true;
                // A stream that declares frames but decodes none is corrupt.
                if self.position == 0 && self.metadata.frame_count.is_some_and(|count| count > 0) {
                    return Some(Err(VidsumError::UnreadableMedia {
                        path: self.path.clone(),
                        reason: "no decodable video frames".to_string(),
                    }));
                }
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    self.consecutive_read_errors = 0;
                    if packet.stream() != self.video_stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        let error = self.classify(error.to_string());
                        return self.fail(error);
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        let error = self.classify(error.to_string());
                        return self.fail(error);
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.consecutive_read_errors += 1;
                    if self.position == 0
                        || self.consecutive_read_errors >= MAX_CONSECUTIVE_READ_ERRORS
                    {
                        let error = self.classify(error.to_string());
                        return self.fail(error);
                    }
                    log::warn!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}

impl Drop for FrameIterator {
    fn drop(&mut self) {
        log::debug!(
            "Releasing decoder for {} after {} decoded / {} sampled frames",
            self.path.display(),
            self.position,
            self.sampled,
        );
    }
}
