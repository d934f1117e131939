use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One narration beat: the exact text spoken while a single image is on
/// screen. Produced by the upstream script generator; read-only here.
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub index: usize,
    pub text: String,
    /// Short label burned in as an on-screen overlay when present.
    #[serde(default)]
    pub key_concept: Option<String>,
    /// Explicit image path; takes precedence over directory discovery.
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl Scene {
    /// Whitespace-delimited word count, floored at 1 so downstream
    /// proportional math never divides by zero.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count().max(1)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Wrapped { scenes: Vec<Scene> },
    Bare(Vec<Scene>),
}

/// Loads the scene list from a script JSON file. Accepts either a bare
/// array of scenes or an object with a `scenes` field, since both shapes
/// exist in the wild among script generators.
pub fn load_script(path: &Path) -> Result<Vec<Scene>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file {}", path.display()))?;

    let parsed: ScriptFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse script file {}", path.display()))?;

    let scenes = match parsed {
        ScriptFile::Wrapped { scenes } => scenes,
        ScriptFile::Bare(scenes) => scenes,
    };

    if scenes.is_empty() {
        anyhow::bail!("Script file {} contains no scenes", path.display());
    }

    Ok(scenes)
}

pub fn total_word_count(scenes: &[Scene]) -> usize {
    scenes.iter().map(Scene::word_count).sum()
}
