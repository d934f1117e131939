pub mod compiler;
pub mod fonts;
pub mod probe;
pub mod runner;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::RenderProfile;
use crate::script::Scene;
use crate::synthesis::AlignmentPayload;
use crate::timing::{self, SceneTiming, allocator};
use crate::timeline::{self, TimedClip, TransitionSettings};
use crate::ui::prelude::{Level, emit};

use compiler::{CompileOutput, FfmpegCompiler, XfadeSpec};
use fonts::FontCache;
use runner::{FfmpegRunner, RunOptions};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// The assembly pipeline's sequential stages, used for progress events and
/// failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    TimingResolved,
    ClipsBuilt,
    Composited,
    AudioAttached,
    DurationEnforced,
    Rendered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::TimingResolved => "timing-resolved",
            Stage::ClipsBuilt => "clips-built",
            Stage::Composited => "composited",
            Stage::AudioAttached => "audio-attached",
            Stage::DurationEnforced => "duration-enforced",
            Stage::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("Assembly failed at {stage}: {message}")]
pub struct AssemblyError {
    pub stage: Stage,
    pub message: String,
}

impl AssemblyError {
    fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

fn stage_event(stage: Stage, message: &str) {
    emit(Level::Debug, &format!("assemble.{stage}"), message, None);
}

#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub scenes: Vec<Scene>,
    pub audio: PathBuf,
    pub images_dir: Option<PathBuf>,
    pub alignment: Option<PathBuf>,
    pub output: PathBuf,
    pub transition: TransitionSettings,
    pub profile: RenderProfile,
    pub force: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct AssemblyResult {
    pub output_path: PathBuf,
    pub total_duration: f64,
    pub clip_count: usize,
    pub timings: Vec<SceneTiming>,
    pub estimated_scenes: usize,
    pub skipped_scenes: usize,
    pub rendered: bool,
}

#[derive(Serialize)]
struct TimingReport<'a> {
    created_at: DateTime<Utc>,
    audio_duration: f64,
    clip_count: usize,
    estimated_scenes: usize,
    skipped_scenes: usize,
    timings: &'a [SceneTiming],
}

/// Runs the full assembly pipeline: load inputs, resolve timings, build
/// clips, composite, attach audio, enforce the audio duration, render.
/// The output file is published atomically; a failed run leaves nothing
/// behind that could be mistaken for success.
pub fn assemble(request: &AssemblyRequest, runner: &dyn FfmpegRunner) -> Result<AssemblyResult> {
    // Loading
    if request.output.exists() && !request.force && !request.dry_run {
        anyhow::bail!(
            "Output file {} already exists. Use --force to overwrite.",
            request.output.display()
        );
    }

    stage_event(Stage::Loading, "Loading audio, images, and alignment payload");

    if !request.audio.is_file() {
        return Err(AssemblyError::new(
            Stage::Loading,
            format!("Audio file {} is missing", request.audio.display()),
        )
        .into());
    }

    let audio_duration = probe::probe_duration_seconds(&request.audio)
        .map_err(|err| AssemblyError::new(Stage::Loading, err.to_string()))?;

    let words = match &request.alignment {
        Some(path) => {
            let payload = AlignmentPayload::from_file(path)
                .map_err(|err| AssemblyError::new(Stage::Loading, err.to_string()))?;
            Some(payload.into_words())
        }
        None => None,
    };

    let image_map = match &request.images_dir {
        Some(dir) => discover_scene_images(dir)
            .map_err(|err| AssemblyError::new(Stage::Loading, err.to_string()))?,
        None => HashMap::new(),
    };

    // TimingResolved
    let timings = timing::resolve_timings(&request.scenes, words.as_deref(), audio_duration);
    let estimated_scenes = timing::estimated_count(&timings);
    stage_event(
        Stage::TimingResolved,
        &format!(
            "Resolved {} scene timing(s), {estimated_scenes} estimated",
            timings.len()
        ),
    );
    if estimated_scenes > 0 && words.is_some() {
        emit(
            Level::Warn,
            "assemble.timing.estimated",
            &format!(
                "{estimated_scenes} of {} scene(s) fell back to estimated timing",
                timings.len()
            ),
            None,
        );
    }

    // ClipsBuilt
    let (mut kept_timings, kept_assets, skipped_scenes) =
        resolve_clip_assets(&request.scenes, &timings, &image_map);

    if kept_timings.is_empty() {
        return Err(AssemblyError::new(
            Stage::ClipsBuilt,
            "No scene has a resolvable image; nothing to composite",
        )
        .into());
    }

    let effective = request.transition.effective_for(kept_timings.len());
    let durations: Vec<f64> = kept_timings.iter().map(|t| t.duration).collect();
    let overlap = timeline::clamp_overlap(&durations, effective.overlap());
    if overlap + 1e-9 < effective.overlap() {
        emit(
            Level::Warn,
            "assemble.transition.clamped",
            &format!(
                "Transition overlap reduced to {overlap:.2}s to fit the shortest clip"
            ),
            None,
        );
    }

    allocator::apply_transition_lead(&mut kept_timings, overlap);

    let clips: Vec<TimedClip> = kept_timings
        .iter()
        .zip(&kept_assets)
        .map(|(timing, (image, key_concept))| TimedClip {
            image: image.clone(),
            duration: timing.duration,
            key_concept: key_concept.clone(),
        })
        .collect();
    stage_event(
        Stage::ClipsBuilt,
        &format!("Built {} clip(s), {skipped_scenes} skipped", clips.len()),
    );

    // Composited
    let placement = timeline::place_clips(&clips, overlap);
    stage_event(
        Stage::Composited,
        &format!(
            "Composited {} clip(s), {:.2}s before duration enforcement",
            placement.clips.len(),
            placement.total_duration
        ),
    );

    // AudioAttached and DurationEnforced are realized inside the compiled
    // invocation; the compiler clamps the composite to the audio duration.
    stage_event(
        Stage::AudioAttached,
        &format!("Attaching narration track {}", request.audio.display()),
    );
    stage_event(
        Stage::DurationEnforced,
        &format!(
            "Enforcing {:?} toward {audio_duration:.2}s of audio",
            timeline::duration_fix(placement.total_duration, audio_duration)
        ),
    );

    // A degenerate overlap means there is nothing to blend; concat instead.
    let xfade = if overlap > 0.0 {
        effective.xfade_name().map(|transition| XfadeSpec {
            transition,
            overlap,
        })
    } else {
        None
    };

    let mut font_cache = FontCache::new(request.profile.font_candidates.clone());
    let wants_overlay = clips.iter().any(|clip| clip.key_concept.is_some());
    let overlay_font = if wants_overlay {
        let resolved = font_cache.resolve();
        if resolved.is_none() {
            emit(
                Level::Warn,
                "assemble.overlay.no_font",
                "No overlay font found among candidates; key-concept overlays skipped",
                None,
            );
        }
        resolved
    } else {
        None
    };

    let compiler = FfmpegCompiler::new(request.profile.clone());
    let compiled = compiler.compile(
        &placement,
        xfade,
        &request.audio,
        audio_duration,
        overlay_font,
        &request.output,
    );

    if request.dry_run {
        emit(
            Level::Info,
            "assemble.dry_run",
            &compiled.command_line(),
            None,
        );
        return Ok(AssemblyResult {
            output_path: request.output.clone(),
            total_duration: audio_duration,
            clip_count: clips.len(),
            timings,
            estimated_scenes,
            skipped_scenes,
            rendered: false,
        });
    }

    // Rendered
    render_atomically(&compiled, &request.output, audio_duration, request.verbose, runner)?;
    stage_event(
        Stage::Rendered,
        &format!("Encoder finished, publishing {}", request.output.display()),
    );

    let report = TimingReport {
        created_at: Utc::now(),
        audio_duration,
        clip_count: clips.len(),
        estimated_scenes,
        skipped_scenes,
        timings: &timings,
    };
    write_timing_report(&request.output, &report)?;

    emit(
        Level::Success,
        "assemble.success",
        &format!(
            "Rendered {} ({:.2}s, {} clip(s))",
            request.output.display(),
            audio_duration,
            clips.len()
        ),
        None,
    );

    Ok(AssemblyResult {
        output_path: request.output.clone(),
        total_duration: audio_duration,
        clip_count: clips.len(),
        timings,
        estimated_scenes,
        skipped_scenes,
        rendered: true,
    })
}

/// Pairs each scene's timing with its image and overlay label, skipping
/// scenes whose image cannot be found (with a warning). Skips are the
/// compositor's per-clip degradation policy; the assembler later enforces
/// that at least one clip survived.
fn resolve_clip_assets(
    scenes: &[Scene],
    timings: &[SceneTiming],
    image_map: &HashMap<usize, PathBuf>,
) -> (Vec<SceneTiming>, Vec<(PathBuf, Option<String>)>, usize) {
    let mut kept_timings = Vec::with_capacity(scenes.len());
    let mut kept_assets = Vec::with_capacity(scenes.len());
    let mut skipped = 0usize;

    for (scene, timing) in scenes.iter().zip(timings) {
        if timing.duration <= 0.0 {
            skipped += 1;
            emit(
                Level::Warn,
                "assemble.clip.skipped",
                &format!(
                    "Skipping scene {}: resolved duration is not positive",
                    scene.index
                ),
                None,
            );
            continue;
        }

        let image = scene
            .image
            .clone()
            .or_else(|| image_map.get(&scene.index).cloned());

        match image {
            Some(path) if path.is_file() => {
                kept_timings.push(timing.clone());
                kept_assets.push((path, scene.key_concept.clone()));
            }
            Some(path) => {
                skipped += 1;
                emit(
                    Level::Warn,
                    "assemble.clip.skipped",
                    &format!(
                        "Skipping scene {}: image {} does not exist",
                        scene.index,
                        path.display()
                    ),
                    None,
                );
            }
            None => {
                skipped += 1;
                emit(
                    Level::Warn,
                    "assemble.clip.skipped",
                    &format!("Skipping scene {}: no image found", scene.index),
                    None,
                );
            }
        }
    }

    (kept_timings, kept_assets, skipped)
}

/// Finds `scene_<index>.<ext>` files directly inside the images directory.
pub fn discover_scene_images(dir: &Path) -> Result<HashMap<usize, PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Images directory {} does not exist", dir.display());
    }

    let mut map = HashMap::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(index_str) = stem.strip_prefix("scene_") else {
            continue;
        };
        if let Ok(index) = index_str.parse::<usize>() {
            map.insert(index, path.to_path_buf());
        }
    }

    Ok(map)
}

/// Renders into a temp file next to the output and persists it only on
/// encoder success, so a failed run never publishes a partial file.
fn render_atomically(
    compiled: &CompileOutput,
    output: &Path,
    audio_duration: f64,
    verbose: bool,
    runner: &dyn FfmpegRunner,
) -> Result<()> {
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    let temp = tempfile::Builder::new()
        .prefix(".reelsmith-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(parent.unwrap_or_else(|| Path::new(".")))
        .context("Failed to create temporary render target")?;
    let temp_path = temp.into_temp_path();

    // Swap the output path for the temp path; it is always the last arg.
    let mut args = compiled.args.clone();
    let last = args.len() - 1;
    args[last] = temp_path.to_string_lossy().into_owned();

    runner
        .run(
            &args,
            RunOptions {
                total_duration: Some(audio_duration),
                verbose,
            },
        )
        .map_err(|err| AssemblyError::new(Stage::Rendered, err.to_string()))?;

    temp_path
        .persist(output)
        .with_context(|| format!("Failed to publish output file {}", output.display()))?;

    Ok(())
}

fn write_timing_report(output: &Path, report: &TimingReport<'_>) -> Result<()> {
    let report_path = output.with_extension("timing.json");
    let contents =
        serde_json::to_string_pretty(report).context("Failed to serialize timing report")?;
    fs::write(&report_path, contents)
        .with_context(|| format!("Failed to write timing report {}", report_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_indexed_scene_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scene_1.png"), b"x").unwrap();
        fs::write(dir.path().join("scene_2.jpg"), b"x").unwrap();
        fs::write(dir.path().join("scene_10.webp"), b"x").unwrap();
        fs::write(dir.path().join("cover.png"), b"x").unwrap();
        fs::write(dir.path().join("scene_bad.png"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let map = discover_scene_images(dir.path()).unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.contains_key(&1));
        assert!(map.contains_key(&2));
        assert!(map.contains_key(&10));
    }

    #[test]
    fn missing_images_directory_errors() {
        assert!(discover_scene_images(Path::new("/nonexistent/imgs")).is_err());
    }

    #[test]
    fn clip_assets_skip_scenes_without_images() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("scene_1.png");
        fs::write(&present, b"x").unwrap();

        let scenes = vec![
            Scene {
                index: 1,
                text: "first".to_string(),
                key_concept: Some("One".to_string()),
                image: None,
            },
            Scene {
                index: 2,
                text: "second".to_string(),
                key_concept: None,
                image: None,
            },
        ];
        let timings = timing::resolve_timings(&scenes, None, 4.0);
        let mut image_map = HashMap::new();
        image_map.insert(1, present.clone());

        let (kept, assets, skipped) = resolve_clip_assets(&scenes, &timings, &image_map);
        assert_eq!(kept.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(assets[0].0, present);
        assert_eq!(assets[0].1.as_deref(), Some("One"));
    }

    #[test]
    fn explicit_scene_image_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.png");
        let discovered = dir.path().join("scene_1.png");
        fs::write(&explicit, b"x").unwrap();
        fs::write(&discovered, b"x").unwrap();

        let scenes = vec![Scene {
            index: 1,
            text: "only".to_string(),
            key_concept: None,
            image: Some(explicit.clone()),
        }];
        let timings = timing::resolve_timings(&scenes, None, 2.0);
        let mut image_map = HashMap::new();
        image_map.insert(1, discovered);

        let (_, assets, skipped) = resolve_clip_assets(&scenes, &timings, &image_map);
        assert_eq!(skipped, 0);
        assert_eq!(assets[0].0, explicit);
    }

    #[test]
    fn zero_duration_timings_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("scene_1.png");
        fs::write(&present, b"x").unwrap();

        let scenes = vec![Scene {
            index: 1,
            text: "degenerate".to_string(),
            key_concept: None,
            image: Some(present),
        }];
        let timings = vec![SceneTiming {
            scene_index: 1,
            start: 2.0,
            end: 2.0,
            duration: 0.0,
            word_count: 1,
            estimated: false,
        }];

        let (kept, _, skipped) = resolve_clip_assets(&scenes, &timings, &HashMap::new());
        assert!(kept.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn assembly_error_names_the_stage() {
        let err = AssemblyError::new(Stage::ClipsBuilt, "no clips");
        assert_eq!(err.to_string(), "Assembly failed at clips-built: no clips");
    }
}
