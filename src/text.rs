//! On-screen text extraction.
//!
//! Recognition itself is delegated to a [`TextExtractor`] (an OCR backend).
//! This module binarises frames before recognition and normalises whatever
//! the backend returns so that scene text aggregates cleanly: lowercase,
//! punctuation stripped, English stop-words removed.

use std::{collections::HashSet, error::Error, sync::OnceLock};

use image::GrayImage;

/// Error type returned by OCR backends.
pub type ExtractionError = Box<dyn Error + Send + Sync>;

/// An OCR backend.
///
/// Receives a binarised grayscale frame (text pixels at 255 or 0) and
/// returns the raw recognised text. Implementations must be callable from
/// several threads at once.
pub trait TextExtractor: Send + Sync {
    /// Recognise text in `image`.
    fn extract(&self, image: &GrayImage) -> Result<String, ExtractionError>;
}

/// The extractor used when no OCR backend is configured. Always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextExtractor;

impl TextExtractor for NoTextExtractor {
    fn extract(&self, _image: &GrayImage) -> Result<String, ExtractionError> {
        Ok(String::new())
    }
}

impl<F> TextExtractor for F
where
    F: Fn(&GrayImage) -> Result<String, ExtractionError> + Send + Sync,
{
    fn extract(&self, image: &GrayImage) -> Result<String, ExtractionError> {
        self(image)
    }
}

/// Binary threshold: pixels strictly above `threshold` become 255, all others 0.
pub fn binarize(luma: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = luma.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    output
}

/// Normalise raw OCR output.
///
/// Lowercases, removes every character that is neither a word character
/// (alphanumeric or `_`) nor whitespace, splits on whitespace, drops English
/// stop-words and re-joins with single spaces.
///
/// ```
/// use vidsum::text::normalize_text;
///
/// assert_eq!(normalize_text("The Quick, brown fox!"), "quick brown fox");
/// assert_eq!(normalize_text("  \n "), "");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let stop_words = stop_words();
    cleaned
        .split_whitespace()
        .filter(|token| !stop_words.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP_WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];
