use super::SceneTiming;
use crate::script::{Scene, total_word_count};

/// Derives per-scene durations purely from word-count share when no
/// timestamp data exists. The defining property: durations sum to the
/// total audio duration exactly, up to float rounding, so the rendered
/// video can never drift from the audio.
pub fn allocate_proportional(scenes: &[Scene], total_audio_seconds: f64) -> Vec<SceneTiming> {
    let total_words = total_word_count(scenes) as f64;
    let mut timings = Vec::with_capacity(scenes.len());
    let mut cursor = 0.0f64;

    for scene in scenes {
        let word_count = scene.word_count();
        let duration = total_audio_seconds * (word_count as f64 / total_words);
        timings.push(SceneTiming {
            scene_index: scene.index,
            start: cursor,
            end: cursor + duration,
            duration,
            word_count,
            estimated: true,
        });
        cursor += duration;
    }

    timings
}

/// Extends every non-final scene's duration by the transition overlap, so
/// that after adjacent clips overlap during compositing the collapsed
/// runtime still equals the audio duration. Must run before clips are
/// built, never after.
pub fn apply_transition_lead(timings: &mut [SceneTiming], lead_seconds: f64) {
    if lead_seconds <= 0.0 || timings.len() < 2 {
        return;
    }
    let last = timings.len() - 1;
    for timing in &mut timings[..last] {
        timing.duration += lead_seconds;
        timing.end = timing.start + timing.duration;
    }
}
