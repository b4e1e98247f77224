//! Tesseract OCR backend tests.
//!
//! Tests that need the real executable return early when `tesseract` is
//! not on PATH. The script-backed tests stand in a tiny shell script for
//! the executable and only run on Unix.

use image::{GrayImage, Luma, Rgb, RgbImage};

use vidsum::{Frame, FrameAnalyzer, HeuristicAnalyzer, TesseractExtractor, TextExtractor};

fn white_frame() -> Frame {
    Frame::new(0, 0, 0.0, RgbImage::from_pixel(64, 32, Rgb([255, 255, 255])))
}

#[test]
fn defaults_and_builders() {
    let extractor = TesseractExtractor::new();
    assert_eq!(extractor.binary(), std::path::Path::new("tesseract"));
    assert_eq!(extractor.language(), "eng");

    let extractor = TesseractExtractor::default()
        .with_binary("/usr/local/bin/tesseract")
        .with_language("eng+deu")
        .with_page_segmentation_mode(11);
    assert_eq!(
        extractor.binary(),
        std::path::Path::new("/usr/local/bin/tesseract")
    );
    assert_eq!(extractor.language(), "eng+deu");
}

#[test]
fn missing_binary_is_unavailable() {
    let extractor = TesseractExtractor::new().with_binary("/nonexistent/tesseract");
    assert!(!extractor.is_available());
    assert!(extractor.extract(&GrayImage::new(8, 8)).is_err());
}

#[test]
fn missing_binary_degrades_to_empty_text() {
    let extractor = TesseractExtractor::new().with_binary("/nonexistent/tesseract");
    let analyzer = HeuristicAnalyzer::default().with_text_extractor(extractor);
    let signal = analyzer.analyze(&white_frame());
    assert!(signal.text.is_empty());
    assert!(signal.is_slide);
}

#[test]
fn blank_frame_has_no_text() {
    let extractor = TesseractExtractor::new();
    if !extractor.is_available() {
        return;
    }

    let blank = GrayImage::from_pixel(200, 80, Luma([255]));
    let text = extractor.extract(&blank).expect("tesseract should run");
    assert!(text.trim().is_empty(), "unexpected text: {text:?}");
}

#[cfg(unix)]
mod scripted {
    use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};

    use tempfile::TempDir;

    use super::*;

    /// Write an executable shell script standing in for tesseract.
    fn script(body: &str) -> (TempDir, PathBuf) {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let path = directory.path().join("tesseract");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark script executable");
        (directory, path)
    }

    const ECHOING: &str = r#"if [ "$1" = "--version" ]; then echo "tesseract 5.3.0"; exit 0; fi
test -s "$1" || exit 2
echo "The Borrow Checker, explained! $3 $4 $5 $6 $7 $8""#;

    #[test]
    fn script_reports_available() {
        let (_directory, path) = script(ECHOING);
        assert!(TesseractExtractor::new().with_binary(path).is_available());
    }

    #[test]
    fn recognised_text_is_normalised() {
        let (_directory, path) = script(ECHOING);
        let analyzer = HeuristicAnalyzer::default()
            .with_text_extractor(TesseractExtractor::new().with_binary(path));

        let signal = analyzer.analyze(&white_frame());
        assert_eq!(signal.text, "borrow checker explained oem 3 psm 6 l eng");
    }

    #[test]
    fn failing_run_degrades_to_empty_text() {
        let (_directory, path) = script("echo 'Error opening data file' >&2\nexit 1");
        let extractor = TesseractExtractor::new().with_binary(path);

        let error = extractor.extract(&GrayImage::new(8, 8)).unwrap_err();
        assert!(error.to_string().contains("Error opening data file"), "{error}");

        let signal = HeuristicAnalyzer::default()
            .with_text_extractor(extractor)
            .analyze(&white_frame());
        assert!(signal.text.is_empty());
    }
}
