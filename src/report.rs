//! Report assembly and prompt rendering.
//!
//! [`VideoReport`] is the single value handed to a
//! [`SummarySink`](crate::SummarySink): video-level counts and duration,
//! the ordered scene summaries, and every per-frame signal. The
//! `render_*_prompt` functions turn a report into the text a language model
//! is asked to complete.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::{aggregator::SceneSummary, analyzer::FrameSignal, error::VidsumError};

/// Longest scene text quoted verbatim in the summary prompt.
const PROMPT_SCENE_TEXT_LIMIT: usize = 500;

/// Longest JSON excerpt embedded in the notes prompt.
const PROMPT_JSON_LIMIT: usize = 4000;

/// Which prompt a sink sends to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// [`render_summary_prompt`].
    #[default]
    Summary,
    /// [`render_notes_prompt`].
    Notes,
}

impl PromptStyle {
    /// Render the prompt for `report`.
    pub fn render(self, report: &VideoReport) -> Result<String, VidsumError> {
        match self {
            PromptStyle::Summary => Ok(render_summary_prompt(report)),
            PromptStyle::Notes => render_notes_prompt(report),
        }
    }
}

/// Everything known about one processed video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoReport {
    /// Video identifier, normally the input's file name.
    pub filename: String,
    /// Number of sampled frames analyzed.
    pub frames_processed: usize,
    /// Number of scenes.
    pub scenes_detected: usize,
    /// Timestamp of the last analyzed frame, in seconds. Zero without frames.
    pub total_duration: f64,
    /// Scene summaries in scene order.
    pub scenes: Vec<SceneSummary>,
    /// Per-frame signals in sampled order.
    pub frame_data: Vec<FrameSignal>,
}

impl VideoReport {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, VidsumError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Assemble a report. Pure structural assembly.
pub fn build_report(
    filename: impl Into<String>,
    scenes: Vec<SceneSummary>,
    frame_data: Vec<FrameSignal>,
) -> VideoReport {
    VideoReport {
        filename: filename.into(),
        frames_processed: frame_data.len(),
        scenes_detected: scenes.len(),
        total_duration: frame_data.last().map_or(0.0, |signal| signal.timestamp),
        scenes,
        frame_data,
    }
}

/// Video identifier for `path`: its final component, or the whole path
/// when it has none.
pub fn video_identifier(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prompt asking for a structured summary of the video.
///
/// Lists duration and scene count, then every scene with its time range
/// and detected text (cut to 500 characters), then the writing
/// instructions.
pub fn render_summary_prompt(report: &VideoReport) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "You are a video analysis expert. Create a comprehensive summary and notes for the following video:\n\n\
         Video: {}\nDuration: {:.2} seconds\nScenes detected: {}\n\n",
        report.filename, report.total_duration, report.scenes_detected,
    );

    if !report.scenes.is_empty() {
        prompt.push_str("\n## SCENE BREAKDOWN:\n");
        for scene in &report.scenes {
            let _ = write!(
                prompt,
                "\nScene {} ({:.2}s - {:.2}s):\n",
                scene.scene_index + 1,
                scene.start_time,
                scene.end_time,
            );
            if !scene.text_content.is_empty() {
                let _ = writeln!(
                    prompt,
                    "Text detected: {}",
                    truncate_chars(&scene.text_content, PROMPT_SCENE_TEXT_LIMIT)
                );
            }
        }
    }

    prompt.push_str(
        "\nBased on the above information, please provide:\n\
         1. A concise summary of the video content\n\
         2. Key points or important information extracted from the video\n\
         3. Any notable observations about the structure or content\n\
         4. Well-organized notes that could be used for reference\n\n\
         Format your response as a well-structured document with headings, bullet points and proper organization.\n",
    );
    prompt
}

/// Prompt asking for hierarchical reference notes.
///
/// Embeds the report as pretty JSON, cut to 4000 characters.
pub fn render_notes_prompt(report: &VideoReport) -> Result<String, VidsumError> {
    let json = report.to_json_pretty()?;
    let excerpt: String = json.chars().take(PROMPT_JSON_LIMIT).collect();

    Ok(format!(
        "As an expert note-taker, create detailed, organized notes from this video content.\n\
         Focus on creating a hierarchical structure that captures main ideas and supporting details.\n\n\
         Content information:\n{excerpt}\n\n\
         Format your notes as markdown with:\n\
         - Clear headings and subheadings\n\
         - Bullet points for key concepts\n\
         - Numbered lists for sequential information\n\
         - Code blocks or tables where appropriate\n\
         - Bold text for important terms or concepts\n\n\
         Your notes should be comprehensive yet concise, capturing the essence of the content.\n"
    ))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
