use anyhow::Result;
use comfy_table::{Cell, Table};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::cli::CheckArgs;
use crate::render::{discover_scene_images, probe};
use crate::script::{self, Scene, total_word_count};
use crate::synthesis::AlignmentPayload;
use crate::ui::prelude::{Level, emit};

/// Validates the inputs of an assembly run without rendering anything and
/// prints a stats report. Fatal problems (missing audio, no resolvable
/// images, malformed alignment payload) exit nonzero.
pub fn handle_check(args: CheckArgs) -> Result<()> {
    let scenes = script::load_script(&args.script)?;

    let image_map = match &args.images {
        Some(dir) => discover_scene_images(dir)?,
        None => HashMap::new(),
    };
    let resolvable = resolvable_image_count(&scenes, &image_map);
    let image_dimensions = first_image_dimensions(&scenes, &image_map);

    let audio_duration = match &args.audio {
        Some(path) if path.is_file() => match probe::probe_duration_seconds(path) {
            Ok(duration) => Some(duration),
            Err(err) => {
                emit(
                    Level::Warn,
                    "check.audio.unprobed",
                    &format!("Audio duration could not be probed: {err}"),
                    None,
                );
                None
            }
        },
        _ => None,
    };

    let alignment_words = match &args.alignment {
        Some(path) => Some(AlignmentPayload::from_file(path)?.into_words().len()),
        None => None,
    };

    let mut problems: Vec<String> = Vec::new();
    if let Some(path) = &args.audio {
        if !path.is_file() {
            problems.push(format!("Audio file {} is missing", path.display()));
        }
    }
    if args.images.is_some() && resolvable == 0 {
        problems.push("No scene has a resolvable image".to_string());
    }

    print_report(
        &scenes,
        resolvable,
        image_dimensions,
        audio_duration,
        alignment_words,
        &problems,
    );

    if !problems.is_empty() {
        anyhow::bail!("Check failed: {}", problems.join("; "));
    }

    emit(Level::Success, "check.success", "All inputs look usable", None);
    Ok(())
}

fn resolvable_image_count(scenes: &[Scene], image_map: &HashMap<usize, PathBuf>) -> usize {
    scenes
        .iter()
        .filter(|scene| {
            scene
                .image
                .clone()
                .or_else(|| image_map.get(&scene.index).cloned())
                .map(|path| path.is_file())
                .unwrap_or(false)
        })
        .count()
}

/// Dimensions of the first resolvable scene image, when ffprobe can read
/// them; purely informational.
fn first_image_dimensions(
    scenes: &[Scene],
    image_map: &HashMap<usize, PathBuf>,
) -> Option<(u32, u32)> {
    scenes
        .iter()
        .find_map(|scene| {
            scene
                .image
                .clone()
                .or_else(|| image_map.get(&scene.index).cloned())
                .filter(|path| path.is_file())
        })
        .and_then(|path| probe::probe_dimensions(&path).ok())
}

fn print_report(
    scenes: &[Scene],
    resolvable: usize,
    image_dimensions: Option<(u32, u32)>,
    audio_duration: Option<f64>,
    alignment_words: Option<usize>,
    problems: &[String],
) {
    let word_counts: Vec<usize> = scenes.iter().map(Scene::word_count).collect();
    let min_words = word_counts.iter().min().copied().unwrap_or(0);
    let max_words = word_counts.iter().max().copied().unwrap_or(0);

    let mut table = Table::new();
    table.set_header(vec!["Input", "Value"]);
    table.add_row(vec![
        Cell::new("Scenes"),
        Cell::new(scenes.len().to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Total words"),
        Cell::new(total_word_count(scenes).to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Words per scene (min/max)"),
        Cell::new(format!("{min_words}/{max_words}")),
    ]);
    table.add_row(vec![
        Cell::new("Scenes with images"),
        Cell::new(format!("{resolvable}/{}", scenes.len())),
    ]);
    table.add_row(vec![
        Cell::new("First image dimensions"),
        Cell::new(match image_dimensions {
            Some((width, height)) => format!("{width}x{height}"),
            None => "unavailable".to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("Audio duration"),
        Cell::new(match audio_duration {
            Some(duration) => format!("{duration:.2}s"),
            None => "unavailable".to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("Alignment words"),
        Cell::new(match alignment_words {
            Some(count) => count.to_string(),
            None => "no payload".to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("ffmpeg"),
        Cell::new(tool_status("ffmpeg")),
    ]);
    table.add_row(vec![
        Cell::new("ffprobe"),
        Cell::new(tool_status("ffprobe")),
    ]);
    for problem in problems {
        table.add_row(vec![Cell::new("Problem"), Cell::new(problem)]);
    }

    println!("{table}");
}

fn tool_status(name: &str) -> String {
    match which::which(name) {
        Ok(path) => path.display().to_string(),
        Err(_) => "not found".to_string(),
    }
}
