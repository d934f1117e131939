pub mod aligner;

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// A word's start/end within the full synthesized narration, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// The speech provider's character-level timing payload: three parallel
/// arrays covering the entire narration string. Decoded into plain records
/// at the boundary so nothing downstream touches provider SDK types.
#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentPayload {
    pub characters: Vec<String>,
    pub character_start_times_seconds: Vec<f64>,
    pub character_end_times_seconds: Vec<f64>,
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Failed to read alignment payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse alignment payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "Alignment arrays disagree in length: {characters} characters, {starts} start times, {ends} end times"
    )]
    MismatchedLengths {
        characters: usize,
        starts: usize,
        ends: usize,
    },
}

impl AlignmentPayload {
    pub fn from_json(contents: &str) -> Result<Self, PayloadError> {
        let payload: Self = serde_json::from_str(contents)?;
        payload.validate()?;
        Ok(payload)
    }

    pub fn from_file(path: &Path) -> Result<Self, PayloadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        let characters = self.characters.len();
        let starts = self.character_start_times_seconds.len();
        let ends = self.character_end_times_seconds.len();
        if characters != starts || characters != ends {
            return Err(PayloadError::MismatchedLengths {
                characters,
                starts,
                ends,
            });
        }
        Ok(())
    }

    pub fn into_words(self) -> Vec<WordTimestamp> {
        aligner::words_from_characters(
            &self.characters,
            &self.character_start_times_seconds,
            &self.character_end_times_seconds,
        )
    }
}
