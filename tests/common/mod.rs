//! Test clips generated on the fly with FFmpeg's MPEG-4 encoder.

#![allow(dead_code)]

use std::path::Path;

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

pub const CLIP_WIDTH: u32 = 64;
pub const CLIP_HEIGHT: u32 = 48;
pub const CLIP_FPS: i32 = 30;

/// Write an AVI clip with one flat gray frame per entry of `levels`.
pub fn write_clip(path: &Path, levels: &[u8]) {
    ffmpeg_next::init().expect("FFmpeg init");

    let mut output = ffmpeg_next::format::output(path).expect("open output");
    let codec = ffmpeg_next::encoder::find(Id::MPEG4).expect("MPEG-4 encoder");
    let time_base = Rational::new(1, CLIP_FPS);

    let mut stream = output.add_stream(codec).expect("add stream");
    let stream_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.encoder().video())
        .expect("video encoder context");
    encoder.set_width(CLIP_WIDTH);
    encoder.set_height(CLIP_HEIGHT);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(Rational::new(CLIP_FPS, 1)));
    encoder.set_bit_rate(400_000);

    let mut encoder = encoder.open_as(codec).expect("open encoder");
    stream.set_parameters(&encoder);
    stream.set_time_base(time_base);
    output.write_header().expect("write header");
    let stream_time_base = output.stream(stream_index).expect("stream").time_base();

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        CLIP_WIDTH,
        CLIP_HEIGHT,
        Pixel::YUV420P,
        CLIP_WIDTH,
        CLIP_HEIGHT,
        ScalingFlags::BILINEAR,
    )
    .expect("scaler");

    // One flat frame per level, then `None` to flush the encoder.
    let frames = levels.iter().copied().map(Some).chain(std::iter::once(None));
    for (index, level) in frames.enumerate() {
        match level {
            Some(level) => {
                let mut rgb = VideoFrame::new(Pixel::RGB24, CLIP_WIDTH, CLIP_HEIGHT);
                let stride = rgb.stride(0);
                let row = CLIP_WIDTH as usize * 3;
                let data = rgb.data_mut(0);
                for y in 0..CLIP_HEIGHT as usize {
                    data[y * stride..y * stride + row].fill(level);
                }

                let mut yuv = VideoFrame::empty();
                scaler.run(&rgb, &mut yuv).expect("scale frame");
                yuv.set_pts(Some(index as i64));
                encoder.send_frame(&yuv).expect("send frame");
            }
            None => encoder.send_eof().expect("send eof"),
        }

        let mut packet = Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(stream_index);
            packet.rescale_ts(time_base, stream_time_base);
            packet.write_interleaved(&mut output).expect("write packet");
        }
    }

    output.write_trailer().expect("write trailer");
}

/// Mean of a frame's luma plane.
pub fn mean_luma(frame: &vidsum::Frame) -> f64 {
    let luma = frame.luma();
    let raw = luma.as_raw();
    raw.iter().map(|&value| value as f64).sum::<f64>() / raw.len() as f64
}

/// Copy `source` to `target`, cut right after the AVI `movi` list tag: the
/// headers (including the frame count) survive, every frame is gone.
pub fn write_headers_only(source: &Path, target: &Path) {
    let bytes = std::fs::read(source).expect("read clip");
    let movi = bytes
        .windows(4)
        .position(|window| window == b"movi")
        .expect("AVI movi list");
    std::fs::write(target, &bytes[..movi + 4]).expect("write truncated clip");
}
