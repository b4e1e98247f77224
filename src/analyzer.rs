//! Per-frame analysis.
//!
//! A [`FrameAnalyzer`] turns one [`Frame`] into one [`FrameSignal`]. The
//! pipeline calls it once per sampled frame, possibly out of order and from
//! several threads, and relies on it never failing: a broken extraction
//! degrades to empty or neutral fields.
//!
//! [`HeuristicAnalyzer`] is the stock implementation: OCR through a
//! pluggable [`TextExtractor`], coarse regions through
//! [`detect_regions`], and a brightness-based slide heuristic.
//!
//! # Example
//!
//! ```
//! use image::RgbImage;
//! use vidsum::{Frame, FrameAnalyzer, HeuristicAnalyzer};
//!
//! let frame = Frame::new(0, 0, 0.0, RgbImage::from_pixel(64, 48, image::Rgb([250, 250, 250])));
//! let signal = HeuristicAnalyzer::default().analyze(&frame);
//! assert!(signal.is_slide);
//! assert!(signal.text.is_empty());
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use crate::{
    frame::Frame,
    regions::{DetectedRegion, RegionOptions, detect_regions},
    text::{NoTextExtractor, TextExtractor, binarize, normalize_text},
};

/// Structured signals extracted from one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSignal {
    /// 0-based index in the sampled-frame sequence.
    pub frame_index: usize,
    /// Timestamp in seconds.
    pub timestamp: f64,
    /// Normalised on-screen text. Empty when none was found.
    pub text: String,
    /// Coarse regions, in raster order.
    pub objects: Vec<DetectedRegion>,
    /// `"Detected N objects in frame"` when at least one region was found.
    pub object_summary: Option<String>,
    /// Mean of all channel values, 0.0 – 255.0.
    pub brightness: f64,
    /// Whether the frame is bright enough to be a presentation slide.
    pub is_slide: bool,
    /// `(width, height)` of the analyzed raster.
    pub dimensions: (u32, u32),
}

impl FrameSignal {
    /// A signal with no text, no regions and zero brightness.
    pub fn neutral(frame: &Frame) -> Self {
        Self {
            frame_index: frame.index(),
            timestamp: frame.timestamp(),
            text: String::new(),
            objects: Vec::new(),
            object_summary: None,
            brightness: 0.0,
            is_slide: false,
            dimensions: frame.dimensions(),
        }
    }
}

/// Turns a frame into a [`FrameSignal`].
///
/// Implementations must be pure with respect to the frame: no state shared
/// across calls that changes the result, safe to call concurrently, and
/// infallible.
pub trait FrameAnalyzer: Send + Sync {
    /// Analyze one frame.
    fn analyze(&self, frame: &Frame) -> FrameSignal;
}

impl<F> FrameAnalyzer for F
where
    F: Fn(&Frame) -> FrameSignal + Send + Sync,
{
    fn analyze(&self, frame: &Frame) -> FrameSignal {
        self(frame)
    }
}

/// Thresholds used by [`HeuristicAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Binarisation threshold applied before OCR.
    pub ocr_threshold: u8,
    /// Brightness above which a frame counts as a slide.
    pub slide_brightness: f64,
    /// Region detection tuning.
    pub regions: RegionOptions,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            ocr_threshold: 150,
            slide_brightness: 200.0,
            regions: RegionOptions::default(),
        }
    }
}

/// The stock [`FrameAnalyzer`].
pub struct HeuristicAnalyzer {
    options: AnalyzerOptions,
    extractor: Box<dyn TextExtractor>,
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerOptions::default())
    }
}

impl HeuristicAnalyzer {
    /// Create an analyzer with OCR disabled.
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            extractor: Box::new(NoTextExtractor),
        }
    }

    /// Use `extractor` as the OCR backend.
    #[must_use]
    pub fn with_text_extractor<E: TextExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    fn extract_text(&self, frame: &Frame, luma: &image::GrayImage) -> String {
        let binary = binarize(luma, self.options.ocr_threshold);
        match catch_unwind(AssertUnwindSafe(|| self.extractor.extract(&binary))) {
            Ok(Ok(raw)) => normalize_text(&raw),
            Ok(Err(error)) => {
                log::warn!("OCR failed on frame {}: {error}", frame.index());
                String::new()
            }
            Err(_) => {
                log::warn!("OCR backend panicked on frame {}", frame.index());
                String::new()
            }
        }
    }
}

impl FrameAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, frame: &Frame) -> FrameSignal {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return FrameSignal::neutral(frame);
        }

        let luma = frame.luma();
        let text = self.extract_text(frame, luma);
        let objects = detect_regions(luma, &self.options.regions);
        let object_summary =
            (!objects.is_empty()).then(|| format!("Detected {} objects in frame", objects.len()));

        let raw = frame.image().as_raw();
        let brightness = raw.iter().map(|&v| v as u64).sum::<u64>() as f64 / raw.len() as f64;

        FrameSignal {
            frame_index: frame.index(),
            timestamp: frame.timestamp(),
            text,
            objects,
            object_summary,
            brightness,
            is_slide: brightness > self.options.slide_brightness,
            dimensions: (width, height),
        }
    }
}
