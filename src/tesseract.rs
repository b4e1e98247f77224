//! Tesseract OCR backend.
//!
//! [`TesseractExtractor`] runs the `tesseract` command-line tool on each
//! binarised frame. The frame is written to a temporary PNG, recognised
//! with the LSTM engine (`--oem 3`) in single-block mode (`--psm 6`), and
//! the text is read from stdout.
//!
//! A missing or failing binary is an extraction error like any other: the
//! analyzer logs it and the frame gets empty text. Use
//! [`TesseractExtractor::is_available`] to decide up front whether OCR is
//! worth enabling.
//!
//! # Example
//!
//! ```no_run
//! use vidsum::{HeuristicAnalyzer, TesseractExtractor};
//!
//! let tesseract = TesseractExtractor::new().with_binary("/usr/local/bin/tesseract");
//! let analyzer = if tesseract.is_available() {
//!     HeuristicAnalyzer::default().with_text_extractor(tesseract)
//! } else {
//!     HeuristicAnalyzer::default()
//! };
//! ```

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use image::{GrayImage, ImageFormat};

use crate::text::{ExtractionError, TextExtractor};

/// OCR through the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    binary: PathBuf,
    language: String,
    engine_mode: u8,
    page_segmentation_mode: u8,
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractExtractor {
    /// Binary looked up on `PATH` when no explicit path is given.
    pub const DEFAULT_BINARY: &'static str = "tesseract";

    /// `tesseract` from `PATH`, English, `--oem 3 --psm 6`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(Self::DEFAULT_BINARY),
            language: "eng".to_string(),
            engine_mode: 3,
            page_segmentation_mode: 6,
        }
    }

    /// Run the executable at `binary` instead.
    #[must_use]
    pub fn with_binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = binary.into();
        self
    }

    /// Recognise `language` (a Tesseract language code such as `deu` or
    /// `eng+fra`).
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page segmentation mode passed as `--psm`.
    #[must_use]
    pub fn with_page_segmentation_mode(mut self, mode: u8) -> Self {
        self.page_segmentation_mode = mode;
        self
    }

    /// Path of the executable.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Language code passed as `-l`.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Whether the executable runs and answers `--version`.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image: &GrayImage) -> Result<String, ExtractionError> {
        let input = tempfile::Builder::new()
            .prefix("vidsum-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("--oem")
            .arg(self.engine_mode.to_string())
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|error| {
                format!(
                    "failed to run tesseract at {}: {error}",
                    self.binary.display()
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
