use anyhow::{Result, bail};
use std::path::PathBuf;

/// FadeBlack dips through black, which reads slower on screen, so its
/// overlap runs at half the configured transition duration.
const FADE_BLACK_OVERLAP_RATIO: f64 = 0.5;

/// Overlap is capped at this share of the shortest clip so a transition can
/// never swallow a clip whole.
const MAX_OVERLAP_CLIP_RATIO: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Cut,
    Crossfade,
    FadeBlack,
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SlideDirection {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => bail!("Unknown slide direction '{other}' (expected left, right, up, down)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionSettings {
    pub kind: TransitionKind,
    pub duration: f64,
    pub direction: SlideDirection,
}

impl TransitionSettings {
    pub fn parse(kind: &str, duration: f64, direction: SlideDirection) -> Result<Self> {
        let kind = match kind.to_ascii_lowercase().as_str() {
            "none" | "cut" => TransitionKind::Cut,
            "crossfade" | "fade" => TransitionKind::Crossfade,
            "fade-black" | "fadeblack" => TransitionKind::FadeBlack,
            "slide" => TransitionKind::Slide,
            other => {
                bail!("Unknown transition '{other}' (expected none, crossfade, fade-black, slide)")
            }
        };
        if duration < 0.0 {
            bail!("Transition duration must not be negative");
        }
        Ok(Self {
            kind,
            duration,
            direction,
        })
    }

    pub fn cut() -> Self {
        Self {
            kind: TransitionKind::Cut,
            duration: 0.0,
            direction: SlideDirection::Left,
        }
    }

    /// Seconds during which adjacent clips are simultaneously visible.
    pub fn overlap(&self) -> f64 {
        match self.kind {
            TransitionKind::Cut => 0.0,
            TransitionKind::Crossfade | TransitionKind::Slide => self.duration,
            TransitionKind::FadeBlack => self.duration * FADE_BLACK_OVERLAP_RATIO,
        }
    }

    /// The ffmpeg xfade transition name, or None for hard cuts.
    pub fn xfade_name(&self) -> Option<&'static str> {
        match self.kind {
            TransitionKind::Cut => None,
            TransitionKind::Crossfade => Some("fade"),
            TransitionKind::FadeBlack => Some("fadeblack"),
            TransitionKind::Slide => Some(match self.direction {
                SlideDirection::Left => "slideleft",
                SlideDirection::Right => "slideright",
                SlideDirection::Up => "slideup",
                SlideDirection::Down => "slidedown",
            }),
        }
    }

    /// No transition is meaningful with fewer than two clips; fall back to
    /// a hard cut rather than erroring.
    pub fn effective_for(&self, clip_count: usize) -> Self {
        if clip_count < 2 {
            Self::cut()
        } else {
            *self
        }
    }
}

/// One scene's contribution to the timeline: a still image held for a
/// duration, with an optional key-concept overlay label.
#[derive(Debug, Clone)]
pub struct TimedClip {
    pub image: PathBuf,
    pub duration: f64,
    pub key_concept: Option<String>,
}

/// A clip with its resolved position on the composited timeline.
#[derive(Debug, Clone)]
pub struct PlacedClip {
    pub image: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub key_concept: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub clips: Vec<PlacedClip>,
    pub total_duration: f64,
}

/// Places clips on a single timeline. A running cursor starts at 0; each
/// clip starts at the cursor, which then advances by the clip's duration
/// minus the transition overlap, so adjacent clips overlap rather than
/// append. Total duration is the last clip's end.
pub fn place_clips(clips: &[TimedClip], overlap: f64) -> Placement {
    let mut placed = Vec::with_capacity(clips.len());
    let mut cursor = 0.0f64;

    for clip in clips {
        placed.push(PlacedClip {
            image: clip.image.clone(),
            start: cursor,
            duration: clip.duration,
            key_concept: clip.key_concept.clone(),
        });
        cursor += clip.duration - overlap;
    }

    let total_duration = placed
        .last()
        .map(|clip| clip.start + clip.duration)
        .unwrap_or(0.0);

    Placement {
        clips: placed,
        total_duration,
    }
}

/// Caps the overlap so it never exceeds a fixed share of the shortest clip
/// duration. Returns the clamped overlap; callers warn when the value
/// shrank.
pub fn clamp_overlap(durations: &[f64], overlap: f64) -> f64 {
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    if !shortest.is_finite() {
        return overlap;
    }
    overlap.min(shortest * MAX_OVERLAP_CLIP_RATIO)
}

/// How the composited video track must be adjusted to equal the audio
/// duration exactly. Audio is the master clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationFix {
    /// Composite runs long: trim to the audio duration.
    Trim { target: f64 },
    /// Composite runs short: hold the last frame for the shortfall.
    Hold { shortfall: f64 },
    /// Within tolerance already.
    Exact,
}

pub fn duration_fix(composite_seconds: f64, audio_seconds: f64) -> DurationFix {
    const EPSILON: f64 = 1e-3;
    let delta = composite_seconds - audio_seconds;
    if delta > EPSILON {
        DurationFix::Trim {
            target: audio_seconds,
        }
    } else if delta < -EPSILON {
        DurationFix::Hold { shortfall: -delta }
    } else {
        DurationFix::Exact
    }
}
