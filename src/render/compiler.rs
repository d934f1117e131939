use std::path::Path;

use crate::config::RenderProfile;
use crate::timeline::{DurationFix, Placement, duration_fix};

/// A fully compiled ffmpeg invocation, ready to hand to a runner.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub args: Vec<String>,
}

impl CompileOutput {
    pub fn command_line(&self) -> String {
        let mut parts = vec!["ffmpeg".to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default)]
struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// The crossfade/slide window applied between adjacent clips, already
/// clamped by the assembler.
#[derive(Debug, Clone, Copy)]
pub struct XfadeSpec {
    pub transition: &'static str,
    pub overlap: f64,
}

/// Compiles a clip placement into ffmpeg arguments: one looped still-image
/// input per clip, a normalization chain per input, an xfade chain (or
/// concat for hard cuts), the narration audio mapped in, and the composite
/// clamped to the audio duration. Pure argument building, no execution.
pub struct FfmpegCompiler {
    profile: RenderProfile,
}

impl FfmpegCompiler {
    pub fn new(profile: RenderProfile) -> Self {
        Self { profile }
    }

    pub fn compile(
        &self,
        placement: &Placement,
        xfade: Option<XfadeSpec>,
        audio: &Path,
        audio_duration: f64,
        overlay_font: Option<&Path>,
        output: &Path,
    ) -> CompileOutput {
        let mut args = vec!["-y".to_string()];

        for clip in &placement.clips {
            args.push("-loop".to_string());
            args.push("1".to_string());
            args.push("-t".to_string());
            args.push(format_time(clip.duration));
            args.push("-i".to_string());
            args.push(clip.image.to_string_lossy().into_owned());
        }

        let audio_index = placement.clips.len();
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().into_owned());

        args.push("-filter_complex".to_string());
        args.push(self.build_filter_complex(placement, xfade, audio_duration, overlay_font));

        args.push("-map".to_string());
        args.push("[outv]".to_string());
        args.push("-map".to_string());
        args.push(format!("{audio_index}:a"));

        // Audio is the master clock; never run past it.
        args.push("-t".to_string());
        args.push(format_time(audio_duration));

        self.profile.push_encoder_args(&mut args);
        args.push(output.to_string_lossy().into_owned());

        CompileOutput { args }
    }

    fn build_filter_complex(
        &self,
        placement: &Placement,
        xfade: Option<XfadeSpec>,
        audio_duration: f64,
        overlay_font: Option<&Path>,
    ) -> String {
        let mut filters = FilterChain::default();

        for (idx, clip) in placement.clips.iter().enumerate() {
            let mut chain = format!(
                "[{idx}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p",
                width = self.profile.width,
                height = self.profile.height,
                fps = self.profile.fps,
            );

            if let (Some(label), Some(font)) = (&clip.key_concept, overlay_font) {
                chain.push(',');
                chain.push_str(&self.build_drawtext(label, font));
            }

            chain.push_str(&format!("[s{idx}]"));
            filters.push(chain);
        }

        let clip_count = placement.clips.len();
        let combined = match xfade {
            Some(spec) if clip_count >= 2 => {
                let mut previous = "s0".to_string();
                for idx in 1..clip_count {
                    let label = format!("x{idx}");
                    filters.push(format!(
                        "[{previous}][s{idx}]xfade=transition={transition}:duration={duration}:offset={offset}[{label}]",
                        transition = spec.transition,
                        duration = format_time(spec.overlap),
                        offset = format_time(placement.clips[idx].start),
                    ));
                    previous = label;
                }
                previous
            }
            _ if clip_count == 1 => "s0".to_string(),
            _ => {
                let inputs: String = (0..clip_count).map(|idx| format!("[s{idx}]")).collect();
                filters.push(format!("{inputs}concat=n={clip_count}:v=1:a=0[cat]"));
                "cat".to_string()
            }
        };

        match duration_fix(placement.total_duration, audio_duration) {
            DurationFix::Trim { target } => filters.push(format!(
                "[{combined}]trim=end={end},setpts=PTS-STARTPTS[outv]",
                end = format_time(target),
            )),
            DurationFix::Hold { shortfall } => filters.push(format!(
                "[{combined}]tpad=stop_mode=clone:stop_duration={pad}[outv]",
                pad = format_time(shortfall),
            )),
            DurationFix::Exact => filters.push(format!("[{combined}]copy[outv]")),
        }

        filters.join()
    }

    fn build_drawtext(&self, label: &str, font: &Path) -> String {
        format!(
            "drawtext=text='{text}':fontfile='{font}':fontsize={size}:fontcolor=white:\
x=(w-text_w)/2:y=h-(h/6):box=1:boxcolor=black@0.5:boxborderw=16",
            text = escape_drawtext(label),
            font = escape_ffmpeg_path(font),
            size = self.profile.overlay_font_size,
        )
    }
}

fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace(',', "\\,")
        .replace('%', "\\%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{TimedClip, place_clips};
    use std::path::PathBuf;

    fn clip(image: &str, duration: f64) -> TimedClip {
        TimedClip {
            image: PathBuf::from(image),
            duration,
            key_concept: None,
        }
    }

    fn labeled_clip(image: &str, duration: f64, label: &str) -> TimedClip {
        TimedClip {
            image: PathBuf::from(image),
            duration,
            key_concept: Some(label.to_string()),
        }
    }

    fn compiler() -> FfmpegCompiler {
        FfmpegCompiler::new(crate::config::RenderProfile::default())
    }

    fn filter_complex_of(output: &CompileOutput) -> String {
        let idx = output
            .args
            .iter()
            .position(|arg| arg == "-filter_complex")
            .expect("filter_complex missing");
        output.args[idx + 1].clone()
    }

    #[test]
    fn crossfade_chain_uses_placement_offsets() {
        // Inflated 5.5s + 5.0s clips with a 0.5s crossfade: the second clip
        // starts at 5.0 and the composite collapses to the 10s audio.
        let clips = vec![clip("a.png", 5.5), clip("b.png", 5.0)];
        let placement = place_clips(&clips, 0.5);
        let output = compiler().compile(
            &placement,
            Some(XfadeSpec {
                transition: "fade",
                overlap: 0.5,
            }),
            Path::new("audio.mp3"),
            10.0,
            None,
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(
            fc.contains("xfade=transition=fade:duration=0.500000:offset=5.000000"),
            "unexpected filtergraph: {fc}"
        );
        // Composite already equals the audio duration
        assert!(fc.contains("copy[outv]"), "unexpected filtergraph: {fc}");
    }

    #[test]
    fn cut_mode_concatenates_video_only() {
        let clips = vec![clip("a.png", 2.0), clip("b.png", 3.0), clip("c.png", 1.0)];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            6.0,
            None,
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(fc.contains("concat=n=3:v=1:a=0[cat]"), "unexpected filtergraph: {fc}");
        assert!(!fc.contains("xfade"));
    }

    #[test]
    fn single_clip_skips_both_concat_and_xfade() {
        let clips = vec![clip("a.png", 4.0)];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            4.0,
            None,
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(!fc.contains("concat"));
        assert!(!fc.contains("xfade"));
        assert!(fc.contains("[s0]copy[outv]"), "unexpected filtergraph: {fc}");
    }

    #[test]
    fn long_composite_is_trimmed_to_audio() {
        let clips = vec![clip("a.png", 3.0), clip("b.png", 3.0)];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            5.2,
            None,
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(
            fc.contains("trim=end=5.200000,setpts=PTS-STARTPTS[outv]"),
            "unexpected filtergraph: {fc}"
        );
    }

    #[test]
    fn short_composite_holds_last_frame() {
        let clips = vec![clip("a.png", 3.0), clip("b.png", 3.0)];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            7.5,
            None,
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(
            fc.contains("tpad=stop_mode=clone:stop_duration=1.500000[outv]"),
            "unexpected filtergraph: {fc}"
        );
    }

    #[test]
    fn inputs_are_looped_stills_with_durations() {
        let clips = vec![clip("a.png", 2.5), clip("b.png", 3.5)];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("narration.mp3"),
            6.0,
            None,
            Path::new("out.mp4"),
        );

        let args = &output.args;
        assert_eq!(args[0], "-y");
        assert!(args.windows(2).any(|w| w == ["-t", "2.500000"]));
        assert!(args.windows(2).any(|w| w == ["-t", "3.500000"]));
        // Audio is the third input; output is cut at the audio duration.
        assert!(args.windows(2).any(|w| w == ["-map", "2:a"]));
        assert!(args.windows(2).any(|w| w == ["-t", "6.000000"]));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn key_concept_overlay_draws_text_with_resolved_font() {
        let clips = vec![
            labeled_clip("a.png", 2.0, "It's 50%, maybe"),
            clip("b.png", 2.0),
        ];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            4.0,
            Some(Path::new("/fonts/Sans.ttf")),
            Path::new("out.mp4"),
        );

        let fc = filter_complex_of(&output);
        assert!(
            fc.contains("drawtext=text='It'\\''s 50\\%\\, maybe'"),
            "unexpected filtergraph: {fc}"
        );
        assert!(fc.contains("fontfile='/fonts/Sans.ttf'"));
        // Only the labeled clip gets the overlay
        assert_eq!(fc.matches("drawtext").count(), 1);
    }

    #[test]
    fn overlay_is_skipped_without_a_font() {
        let clips = vec![labeled_clip("a.png", 2.0, "Label")];
        let placement = place_clips(&clips, 0.0);
        let output = compiler().compile(
            &placement,
            None,
            Path::new("audio.mp3"),
            2.0,
            None,
            Path::new("out.mp4"),
        );

        assert!(!filter_complex_of(&output).contains("drawtext"));
    }

    #[test]
    fn drawtext_escaping_covers_ffmpeg_specials() {
        assert_eq!(escape_drawtext("a:b"), "a\\:b");
        assert_eq!(escape_drawtext("a,b"), "a\\,b");
        assert_eq!(escape_drawtext("100%"), "100\\%");
        assert_eq!(escape_drawtext("it's"), "it'\\''s");
    }
}
