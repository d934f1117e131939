pub mod allocator;
pub mod mapper;

use serde::Serialize;

use crate::script::Scene;
use crate::synthesis::WordTimestamp;

/// A scene's resolved position within the narration audio. `estimated` is
/// true when the timing came from a speech-rate heuristic or proportional
/// allocation rather than measured word timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct SceneTiming {
    pub scene_index: usize,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub word_count: usize,
    pub estimated: bool,
}

/// Resolves one timing per scene, in scene order. Word timestamps, when
/// available, drive measured alignment; otherwise durations are allocated
/// from word-count share of the total audio duration.
pub fn resolve_timings(
    scenes: &[Scene],
    words: Option<&[WordTimestamp]>,
    total_audio_seconds: f64,
) -> Vec<SceneTiming> {
    match words {
        Some(words) => mapper::map_scene_timings(scenes, words),
        None => allocator::allocate_proportional(scenes, total_audio_seconds),
    }
}

pub fn estimated_count(timings: &[SceneTiming]) -> usize {
    timings.iter().filter(|t| t.estimated).count()
}
