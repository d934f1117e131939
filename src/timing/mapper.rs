use super::SceneTiming;
use crate::script::Scene;
use crate::synthesis::WordTimestamp;

/// Assumed speech rate used when a scene matches no timestamps at all.
const ESTIMATED_WORDS_PER_SECOND: f64 = 2.5;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ':', ';', '"', '\'', '-'];

/// Canonical form used for scene-word vs. timestamp-word comparison:
/// trailing punctuation stripped, lowercased.
fn normalize_word(raw: &str) -> String {
    raw.trim_end_matches(TRAILING_PUNCTUATION).to_lowercase()
}

/// Two normalized words match on exact equality or either-direction
/// substring containment, which tolerates partial transcription mismatches
/// ("runnin" vs "running"). Empty tokens never match.
fn words_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

/// Maps every scene onto the word-timestamp sequence, in scene order.
///
/// Scenes consume the sequence through a shared cursor that only moves
/// forward: a timestamp scanned while processing one scene is never
/// revisited by a later scene, whether or not it matched. A mismatch after
/// a partial run of matches discards that run's accumulated start and keeps
/// scanning, so a single noise word cannot sink the whole scene. Scenes
/// that establish no bounds at all fall back to a speech-rate estimate
/// chained off the previous scene's end, so every scene always receives a
/// timing.
pub fn map_scene_timings(scenes: &[Scene], words: &[WordTimestamp]) -> Vec<SceneTiming> {
    let mut timings: Vec<SceneTiming> = Vec::with_capacity(scenes.len());
    let mut cursor = 0usize;
    let mut previous_end = 0.0f64;

    for scene in scenes {
        let targets: Vec<String> = scene
            .text
            .split_whitespace()
            .map(normalize_word)
            .filter(|w| !w.is_empty())
            .collect();

        let mut matched = 0usize;
        let mut start: Option<f64> = None;
        let mut end: Option<f64> = None;

        while cursor < words.len() && matched < targets.len() {
            let candidate = normalize_word(&words[cursor].word);
            if words_match(&candidate, &targets[matched]) {
                if matched == 0 {
                    start = Some(words[cursor].start);
                }
                end = Some(words[cursor].end);
                matched += 1;
            } else if matched > 0 {
                // Broken partial run: drop the accumulated bounds and keep
                // scanning for a fresh start of this scene.
                matched = 0;
                start = None;
                end = None;
            }
            // Scanned words stay consumed, matched or not.
            cursor += 1;
        }

        let timing = match (start, end) {
            (Some(start), Some(end)) => SceneTiming {
                scene_index: scene.index,
                start,
                end,
                duration: end - start,
                word_count: scene.word_count(),
                estimated: false,
            },
            _ => estimate_timing(scene, previous_end),
        };

        previous_end = timing.end;
        timings.push(timing);
    }

    timings
}

fn estimate_timing(scene: &Scene, previous_end: f64) -> SceneTiming {
    let word_count = scene.word_count();
    let duration = word_count as f64 / ESTIMATED_WORDS_PER_SECOND;
    SceneTiming {
        scene_index: scene.index,
        start: previous_end,
        end: previous_end + duration,
        duration,
        word_count,
        estimated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: usize, text: &str) -> Scene {
        Scene {
            index,
            text: text.to_string(),
            key_concept: None,
            image: None,
        }
    }

    fn word(text: &str, start: f64, end: f64) -> WordTimestamp {
        WordTimestamp {
            word: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn normalization_strips_trailing_punctuation_and_case() {
        assert_eq!(normalize_word("Hello,"), "hello");
        assert_eq!(normalize_word("world!?"), "world");
        assert_eq!(normalize_word("it's"), "it's");
        assert_eq!(normalize_word("end-"), "end");
    }

    #[test]
    fn matching_accepts_equality_and_substrings() {
        assert!(words_match("hello", "hello"));
        assert!(words_match("run", "running"));
        assert!(words_match("running", "run"));
        assert!(!words_match("alpha", "beta"));
        assert!(!words_match("", "anything"));
        assert!(!words_match("anything", ""));
    }

    #[test]
    fn maps_two_scenes_onto_measured_words() {
        let scenes = vec![scene(1, "Hello world"), scene(2, "Goodbye now")];
        let words = vec![
            word("Hello", 0.0, 0.5),
            word("world", 0.5, 1.0),
            word("Goodbye", 1.2, 1.8),
            word("now", 1.8, 2.1),
        ];

        let timings = map_scene_timings(&scenes, &words);

        assert_eq!(timings.len(), 2);
        assert!(!timings[0].estimated);
        assert!((timings[0].start - 0.0).abs() < 1e-9);
        assert!((timings[0].end - 1.0).abs() < 1e-9);
        assert!((timings[0].duration - 1.0).abs() < 1e-9);
        assert!(!timings[1].estimated);
        assert!((timings[1].start - 1.2).abs() < 1e-9);
        assert!((timings[1].end - 2.1).abs() < 1e-9);
    }

    #[test]
    fn scenes_never_reuse_consumed_timestamps() {
        // Both scenes share the same text; the second must match the later
        // occurrences, never the timestamps the first already consumed.
        let scenes = vec![scene(1, "alpha beta"), scene(2, "alpha beta")];
        let words = vec![
            word("alpha", 0.0, 1.0),
            word("beta", 1.0, 2.0),
            word("alpha", 3.0, 4.0),
            word("beta", 4.0, 5.0),
        ];

        let timings = map_scene_timings(&scenes, &words);

        assert!((timings[0].start - 0.0).abs() < 1e-9);
        assert!((timings[0].end - 2.0).abs() < 1e-9);
        assert!((timings[1].start - 3.0).abs() < 1e-9);
        assert!((timings[1].end - 5.0).abs() < 1e-9);
    }

    #[test]
    fn broken_partial_match_restarts_within_the_scene() {
        let scenes = vec![scene(1, "red blue green")];
        let words = vec![
            word("red", 0.0, 1.0),
            word("noise", 1.0, 2.0),
            word("red", 2.0, 3.0),
            word("blue", 3.0, 4.0),
            word("green", 4.0, 5.0),
        ];

        let timings = map_scene_timings(&scenes, &words);

        assert!(!timings[0].estimated);
        assert!((timings[0].start - 2.0).abs() < 1e-9);
        assert!((timings[0].end - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_word_sequence_estimates_every_scene() {
        let scenes = vec![scene(1, "one two three four five"), scene(2, "six seven")];
        let timings = map_scene_timings(&scenes, &[]);

        assert!(timings.iter().all(|t| t.estimated));
        assert!((timings[0].duration - 5.0 / 2.5).abs() < 1e-9);
        assert!((timings[0].start - 0.0).abs() < 1e-9);
        // Estimated scenes chain off the previous scene's end.
        assert!((timings[1].start - timings[0].end).abs() < 1e-9);
        assert!((timings[1].duration - 2.0 / 2.5).abs() < 1e-9);
    }

    #[test]
    fn estimated_scene_chains_off_measured_predecessor() {
        let scenes = vec![scene(1, "hello"), scene(2, "missing entirely")];
        let words = vec![word("hello", 0.0, 2.0)];

        let timings = map_scene_timings(&scenes, &words);

        assert!(!timings[0].estimated);
        assert!(timings[1].estimated);
        assert!((timings[1].start - 2.0).abs() < 1e-9);
        assert!((timings[1].end - (2.0 + 2.0 / 2.5)).abs() < 1e-9);
    }

    #[test]
    fn punctuation_and_case_differences_still_match() {
        let scenes = vec![scene(1, "Hello, world!")];
        let words = vec![word("hello", 0.0, 0.4), word("World", 0.4, 0.9)];

        let timings = map_scene_timings(&scenes, &words);

        assert!(!timings[0].estimated);
        assert!((timings[0].end - 0.9).abs() < 1e-9);
    }

    #[test]
    fn partial_trailing_match_counts_as_measured() {
        // Only the first word matches before the tape runs out; bounds were
        // established, so the scene is measured, not estimated.
        let scenes = vec![scene(1, "alpha omega")];
        let words = vec![word("alpha", 0.0, 1.0)];

        let timings = map_scene_timings(&scenes, &words);

        assert!(!timings[0].estimated);
        assert!((timings[0].start - 0.0).abs() < 1e-9);
        assert!((timings[0].end - 1.0).abs() < 1e-9);
    }
}
