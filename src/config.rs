use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Encoding and layout settings for a render run. Defaults target vertical
/// short-form output; a toml profile file can override any field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub overlay_font_size: u32,
    /// Candidate font files for key-concept overlays, probed in order.
    pub font_candidates: Vec<PathBuf>,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            overlay_font_size: 64,
            font_candidates: vec![
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSans-Bold.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
                PathBuf::from("/usr/share/fonts/noto/NotoSans-Bold.ttf"),
                PathBuf::from("/System/Library/Fonts/Helvetica.ttc"),
            ],
        }
    }
}

impl RenderProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read render profile {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse render profile {}", path.display()))
    }

    /// Encoder arguments appended after the filtergraph and stream maps.
    pub fn push_encoder_args(&self, args: &mut Vec<String>) {
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        args.push("-preset".to_string());
        args.push(self.preset.clone());
        args.push("-crf".to_string());
        args.push(self.crf.to_string());
        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());
        args.push("-c:a".to_string());
        args.push(self.audio_codec.clone());
        args.push("-b:a".to_string());
        args.push(self.audio_bitrate.clone());
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }
}
