use clap::{Args, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(version, about = "Narration-synchronized slideshow video assembler", long_about = None)]
pub struct Cli {
    /// Activate debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Emit machine-readable JSON events
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble the narrated video from scenes, images, and audio
    Assemble(AssembleArgs),
    /// Resolve per-scene timings and print them as JSON, without rendering
    Timing(TimingArgs),
    /// Validate inputs and show statistics for an assembly run
    Check(CheckArgs),
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AssembleArgs {
    /// Scene script JSON file
    #[arg(value_hint = ValueHint::FilePath)]
    pub script: PathBuf,

    /// Narration audio file (the master clock for the final video)
    #[arg(short = 'a', long, value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Directory containing scene_<index>.<ext> images
    #[arg(short = 'i', long, value_hint = ValueHint::DirPath)]
    pub images: Option<PathBuf>,

    /// Synthesis alignment payload JSON (character-level timestamps)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub alignment: Option<PathBuf>,

    /// Output video path
    #[arg(short = 'o', long = "out-file", default_value = "output.mp4", value_hint = ValueHint::FilePath)]
    pub out_file: PathBuf,

    /// Transition between clips: none, crossfade, fade-black, slide
    #[arg(long, default_value = "crossfade")]
    pub transition: String,

    /// Transition duration in seconds
    #[arg(long, default_value_t = 0.5)]
    pub transition_duration: f64,

    /// Slide direction when --transition slide: left, right, up, down
    #[arg(long, default_value = "left")]
    pub slide_direction: String,

    /// Render profile toml overriding the vertical short-form defaults
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profile: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Print the compiled ffmpeg invocation without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Show raw ffmpeg output instead of the progress bar
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TimingArgs {
    /// Scene script JSON file
    #[arg(value_hint = ValueHint::FilePath)]
    pub script: PathBuf,

    /// Synthesis alignment payload JSON (character-level timestamps)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub alignment: Option<PathBuf>,

    /// Narration audio file, probed for its duration
    #[arg(short = 'a', long, value_hint = ValueHint::FilePath)]
    pub audio: Option<PathBuf>,

    /// Total audio duration in seconds, when the audio file is not at hand
    #[arg(long)]
    pub audio_duration: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Scene script JSON file
    #[arg(value_hint = ValueHint::FilePath)]
    pub script: PathBuf,

    /// Narration audio file
    #[arg(short = 'a', long, value_hint = ValueHint::FilePath)]
    pub audio: Option<PathBuf>,

    /// Directory containing scene_<index>.<ext> images
    #[arg(short = 'i', long, value_hint = ValueHint::DirPath)]
    pub images: Option<PathBuf>,

    /// Synthesis alignment payload JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub alignment: Option<PathBuf>,
}
