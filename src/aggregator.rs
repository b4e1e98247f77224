//! Frame-to-scene aggregation.
//!
//! Joins the per-frame [`FrameSignal`]s with the [`SceneRange`]s emitted by
//! the segmenter. The join is positional: scene *k* owns exactly the
//! signals whose sampled index falls in its range.

use serde::Serialize;

use crate::{analyzer::FrameSignal, error::VidsumError, segmenter::SceneRange};

/// Summary of one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    /// 0-based scene index, contiguous across the run.
    pub scene_index: usize,
    /// Timestamp of the first frame, in seconds.
    pub start_time: f64,
    /// Timestamp of the last frame, in seconds.
    pub end_time: f64,
    /// `end_time - start_time`; zero for single-frame scenes.
    pub duration: f64,
    /// Non-empty frame texts joined with single spaces, in frame order.
    pub text_content: String,
    /// Number of frames in the scene.
    pub frame_count: usize,
}

/// Build one [`SceneSummary`] per scene.
///
/// `signals` must be ordered by sampled index (position *i* holds the
/// signal of frame *i*), which is what the pipeline produces.
///
/// # Errors
///
/// [`VidsumError::EmptySceneData`] if a scene is empty or reaches past the
/// end of `signals`. Neither happens with ranges produced by
/// [`SceneSegmenter`](crate::SceneSegmenter) over the same frames.
pub fn aggregate_scenes(
    signals: &[FrameSignal],
    scenes: &[SceneRange],
) -> Result<Vec<SceneSummary>, VidsumError> {
    scenes
        .iter()
        .enumerate()
        .map(|(scene_index, scene)| {
            let members = signals
                .get(scene.frames.clone())
                .filter(|members| !members.is_empty())
                .ok_or(VidsumError::EmptySceneData { scene_index })?;
            Ok(summarize_scene(scene_index, members))
        })
        .collect()
}

fn summarize_scene(scene_index: usize, members: &[FrameSignal]) -> SceneSummary {
    let start_time = members.first().map_or(0.0, |signal| signal.timestamp);
    let end_time = members.last().map_or(start_time, |signal| signal.timestamp);

    let text_content = members
        .iter()
        .map(|signal| signal.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    SceneSummary {
        scene_index,
        start_time,
        end_time,
        duration: (end_time - start_time).max(0.0),
        text_content,
        frame_count: members.len(),
    }
}
