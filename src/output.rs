//! Writing summaries to disk.
//!
//! A summary for `videos/lecture 01.mp4` is written as
//! `<out_dir>/lecture 01_summary.md`. The directory is created on demand and
//! an existing file is overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VidsumError;

/// Suffix appended to the video's stem.
pub const SUMMARY_SUFFIX: &str = "_summary.md";

/// Where the summary of `video_path` goes inside `out_dir`.
///
/// ```
/// use std::path::Path;
///
/// let path = vidsum::output::summary_output_path("output/summaries", "talks/keynote.mp4");
/// assert_eq!(path, Path::new("output/summaries/keynote_summary.md"));
/// ```
pub fn summary_output_path<D, P>(out_dir: D, video_path: P) -> PathBuf
where
    D: AsRef<Path>,
    P: AsRef<Path>,
{
    let video_path = video_path.as_ref();
    let stem = video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    out_dir.as_ref().join(format!("{stem}{SUMMARY_SUFFIX}"))
}

/// Write `summary` as UTF-8 and return the file's path.
///
/// # Errors
///
/// [`VidsumError::IoError`] if the directory cannot be created or the file
/// cannot be written.
pub fn save_summary<D, P>(out_dir: D, video_path: P, summary: &str) -> Result<PathBuf, VidsumError>
where
    D: AsRef<Path>,
    P: AsRef<Path>,
{
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let path = summary_output_path(out_dir, video_path);
    fs::write(&path, summary)?;
    log::info!("Summary saved to {}", path.display());
    Ok(path)
}
