use super::WordTimestamp;

/// Collapses character-level timing arrays into word-level timestamps.
///
/// Scans left to right: non-whitespace characters accumulate into the
/// current word, whose start is its first character's start and whose end
/// tracks the latest character's end. Whitespace closes the current word;
/// a trailing buffer is flushed after the scan. The arrays are expected to
/// be the same length (validated at payload decode); extra entries in a
/// longer array are ignored by the zip.
pub fn words_from_characters(
    characters: &[String],
    starts: &[f64],
    ends: &[f64],
) -> Vec<WordTimestamp> {
    let mut words = Vec::new();
    let mut buffer = String::new();
    let mut word_start = 0.0;
    let mut word_end = 0.0;

    for ((ch, &start), &end) in characters.iter().zip(starts).zip(ends) {
        let is_boundary = !ch.is_empty() && ch.chars().all(char::is_whitespace);
        if is_boundary {
            if !buffer.is_empty() {
                words.push(WordTimestamp {
                    word: std::mem::take(&mut buffer),
                    start: word_start,
                    end: word_end,
                });
            }
            continue;
        }

        if buffer.is_empty() {
            word_start = start;
        }
        buffer.push_str(ch);
        word_end = end;
    }

    if !buffer.is_empty() {
        words.push(WordTimestamp {
            word: buffer,
            start: word_start,
            end: word_end,
        });
    }

    words
}
