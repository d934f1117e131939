use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;

use crate::cli::{AssembleArgs, Cli, TimingArgs};
use crate::config::RenderProfile;
use crate::render::runner::SystemFfmpegRunner;
use crate::render::{self, AssemblyRequest, probe};
use crate::script;
use crate::synthesis::AlignmentPayload;
use crate::timeline::{SlideDirection, TransitionSettings};
use crate::timing;
use crate::ui::prelude::{Level, emit};

pub fn handle_assemble(args: AssembleArgs) -> Result<()> {
    let scenes = script::load_script(&args.script)?;

    let profile = match &args.profile {
        Some(path) => RenderProfile::load(path)?,
        None => RenderProfile::default(),
    };

    let direction = SlideDirection::parse(&args.slide_direction)?;
    let transition = TransitionSettings::parse(&args.transition, args.transition_duration, direction)?;

    let request = AssemblyRequest {
        scenes,
        audio: args.audio,
        images_dir: args.images,
        alignment: args.alignment,
        output: args.out_file,
        transition,
        profile,
        force: args.force,
        dry_run: args.dry_run,
        verbose: args.verbose,
    };

    let result = render::assemble(&request, &SystemFfmpegRunner)?;
    if !result.rendered {
        return Ok(());
    }

    emit(
        Level::Debug,
        "assemble.summary",
        &format!(
            "{} clip(s) over {:.2}s, {}/{} timing(s) estimated, {} scene(s) skipped, output {}",
            result.clip_count,
            result.total_duration,
            result.estimated_scenes,
            result.timings.len(),
            result.skipped_scenes,
            result.output_path.display()
        ),
        None,
    );
    Ok(())
}

pub fn handle_timing(args: TimingArgs) -> Result<()> {
    let scenes = script::load_script(&args.script)?;

    let words = match &args.alignment {
        Some(path) => Some(AlignmentPayload::from_file(path)?.into_words()),
        None => None,
    };

    let audio_duration = match (args.audio_duration, &args.audio) {
        (Some(duration), _) => duration,
        (None, Some(path)) => probe::probe_duration_seconds(path)?,
        (None, None) if words.is_some() => 0.0, // unused by the mapper path
        (None, None) => {
            anyhow::bail!("timing needs --alignment, --audio, or --audio-duration")
        }
    };

    let timings = timing::resolve_timings(&scenes, words.as_deref(), audio_duration);

    let estimated = timing::estimated_count(&timings);
    if estimated > 0 {
        emit(
            Level::Warn,
            "timing.estimated",
            &format!("{estimated} of {} scene timing(s) are estimated", timings.len()),
            None,
        );
    }

    println!("{}", serde_json::to_string_pretty(&timings)?);
    Ok(())
}

pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "reelsmith", &mut io::stdout());
    Ok(())
}
