//! Frame source and full-pipeline tests against real encoded clips.
//!
//! Each test writes a small MPEG-4 AVI into a temporary directory (see
//! `common::write_clip`), so decoding is exercised without checked-in
//! fixtures.

mod common;

use std::path::PathBuf;

use tempfile::TempDir;
use vidsum::{HeuristicAnalyzer, Pipeline, PipelineOptions, VideoSource, VidsumError};

use common::{CLIP_FPS, CLIP_HEIGHT, CLIP_WIDTH, mean_luma, write_clip, write_headers_only};

/// A 20-frame clip whose frame at position `p` has gray level `10 * p`.
fn ramp_clip() -> (TempDir, PathBuf) {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("ramp.avi");
    let levels: Vec<u8> = (0..20).map(|position| position * 10).collect();
    write_clip(&path, &levels);
    (directory, path)
}

/// Ten dark frames followed by ten bright ones.
fn two_scene_clip() -> (TempDir, PathBuf) {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("two_scenes.avi");
    let levels: Vec<u8> = (0..20).map(|position| if position < 10 { 20 } else { 230 }).collect();
    write_clip(&path, &levels);
    (directory, path)
}

// ── Metadata ───────────────────────────────────────────────────────

#[test]
fn metadata_is_populated() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let metadata = source.metadata();
    assert_eq!(metadata.width, CLIP_WIDTH);
    assert_eq!(metadata.height, CLIP_HEIGHT);
    assert!((metadata.frames_per_second - CLIP_FPS as f64).abs() < 1e-6);
    assert_eq!(metadata.frame_count, Some(20));
    assert_eq!(metadata.codec, "mpeg4");
    assert_eq!(metadata.format, "avi");
    assert_eq!(source.path(), path.as_path());
}

// ── Sampling ───────────────────────────────────────────────────────

#[test]
fn stride_samples_every_nth_frame() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let frames: Vec<_> = source
        .frames(5, None)
        .expect("Failed to start decoding")
        .collect::<Result<_, _>>()
        .expect("Failed to decode");

    assert_eq!(frames.len(), 4);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index(), index);
        assert_eq!(frame.position(), index as u64 * 5);
        let expected = index as f64 * 5.0 / CLIP_FPS as f64;
        assert!((frame.timestamp() - expected).abs() < 1e-9);

        // The sampled frame is the one at that decode position.
        let level = frame.position() as f64 * 10.0;
        assert!(
            (mean_luma(frame) - level).abs() < 6.0,
            "frame at {} has luma {:.1}, expected about {level}",
            frame.position(),
            mean_luma(frame),
        );
    }
}

#[test]
fn stride_one_drains_every_frame() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let mut frames = source.frames(1, None).expect("Failed to start decoding");
    let mut count = 0;
    for frame in frames.by_ref() {
        let frame = frame.expect("Failed to decode");
        assert_eq!(frame.position(), count as u64);
        count += 1;
    }

    assert_eq!(count, 20);
    assert_eq!(frames.sampled_count(), 20);
    assert!(frames.next().is_none());
}

#[test]
fn stride_longer_than_clip_yields_first_frame() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let positions: Vec<u64> = source
        .frames(100, None)
        .expect("Failed to start decoding")
        .map(|frame| frame.expect("Failed to decode").position())
        .collect();
    assert_eq!(positions, vec![0]);
}

#[test]
fn resolution_rescales_frames() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let mut frames = source
        .frames(1, Some((32, 24)))
        .expect("Failed to start decoding");
    let frame = frames.next().expect("at least one frame").expect("decodable");
    assert_eq!(frame.dimensions(), (32, 24));
    assert_eq!(frames.sampled_count(), 1);
}

#[test]
fn zero_stride_is_rejected() {
    let (_directory, path) = ramp_clip();

    let source = VideoSource::open(&path).expect("Failed to open test video");
    assert!(matches!(
        source.frames(0, None),
        Err(VidsumError::InvalidStride)
    ));
}

#[test]
fn early_drop_releases_decoder() {
    let (_directory, path) = ramp_clip();

    for _ in 0..3 {
        let source = VideoSource::open(&path).expect("Failed to open test video");
        let mut frames = source.frames(1, None).expect("Failed to start decoding");
        assert!(matches!(frames.next(), Some(Ok(_))));
        assert_eq!(frames.sampled_count(), 1);
        drop(frames);
    }

    // A fresh source still decodes the whole clip.
    let source = VideoSource::open(&path).expect("Failed to reopen test video");
    assert_eq!(source.frames(1, None).unwrap().count(), 20);
}

// ── Corrupt input ──────────────────────────────────────────────────

#[test]
fn truncated_clip_is_unreadable() {
    let (directory, path) = ramp_clip();
    let truncated = directory.path().join("truncated.avi");
    write_headers_only(&path, &truncated);

    let error = match VideoSource::open(&truncated) {
        Err(error) => error,
        Ok(source) => {
            let mut frames = source.frames(1, None).expect("decoder from headers");
            match frames.next() {
                Some(Err(error)) => {
                    assert!(frames.next().is_none(), "iterator must fuse after an error");
                    error
                }
                Some(Ok(_)) => panic!("Expected no decodable frames"),
                None => panic!("Expected UnreadableMedia, got an empty stream"),
            }
        }
    };

    match error {
        VidsumError::UnreadableMedia { path, .. } => assert_eq!(path, truncated),
        other => panic!("Expected UnreadableMedia, got: {other}"),
    }
}

// ── Full runs ──────────────────────────────────────────────────────

#[test]
fn full_run_finds_both_scenes() {
    let (_directory, path) = two_scene_clip();

    let options = PipelineOptions::new().with_sample_stride(2);
    let pipeline = Pipeline::new(options, HeuristicAnalyzer::default()).unwrap();
    let output = pipeline.run(&path).expect("Pipeline run failed");

    let report = &output.report;
    assert_eq!(report.filename, "two_scenes.avi");
    assert_eq!(report.frames_processed, 10);
    assert_eq!(report.scenes_detected, 2);
    assert_eq!(output.scenes[0].frames, 0..5);
    assert_eq!(output.scenes[1].frames, 5..10);
    assert_eq!(output.metadata.as_ref().and_then(|m| m.frame_count), Some(20));

    let second = &report.scenes[1];
    assert!((second.start_time - 10.0 / CLIP_FPS as f64).abs() < 1e-9);
    assert!((second.end_time - 18.0 / CLIP_FPS as f64).abs() < 1e-9);
    assert!(report.frame_data[..5].iter().all(|signal| !signal.is_slide));
    assert!(report.frame_data[5..].iter().all(|signal| signal.is_slide));
}

#[test]
fn max_frames_limits_run() {
    let (_directory, path) = ramp_clip();

    let options = PipelineOptions::new().with_max_frames(3);
    let pipeline = Pipeline::new(options, HeuristicAnalyzer::default()).unwrap();
    let output = pipeline.run(&path).expect("Pipeline run failed");
    assert_eq!(output.report.frames_processed, 3);
}

#[test]
fn resized_run_reports_output_dimensions() {
    let (_directory, path) = ramp_clip();

    let options = PipelineOptions::new()
        .with_sample_stride(10)
        .with_resolution(16, 12);
    let pipeline = Pipeline::new(options, HeuristicAnalyzer::default()).unwrap();
    let output = pipeline.run(&path).expect("Pipeline run failed");

    assert_eq!(output.report.frames_processed, 2);
    assert!(
        output
            .report
            .frame_data
            .iter()
            .all(|signal| signal.dimensions == (16, 12))
    );
}
