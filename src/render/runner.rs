use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::process::{Command, Stdio};

/// Abstracts ffmpeg execution so the assembler can be exercised in tests
/// without an encoder on the machine.
pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: RunOptions) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Expected output duration; drives the progress bar when set.
    pub total_duration: Option<f64>,
    /// Stream raw ffmpeg stderr instead of the progress bar.
    pub verbose: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: RunOptions) -> Result<()> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg")?;

        let stderr = child.stderr.take().expect("stderr was piped");

        let bar = options.total_duration.filter(|_| !options.verbose).map(|duration| {
            let bar = ProgressBar::new((duration * 1000.0) as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>8}/{len:8}ms ({eta}) {msg}")
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            bar.set_message("encoding");
            bar
        });

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let read_result = drain_stderr(
            stderr,
            options.verbose,
            bar.as_ref(),
            &mut last_line,
            &mut error_lines,
        );

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        read_result?;

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        if !status.success() {
            let detail = if error_lines.is_empty() {
                last_line
            } else {
                error_lines.join("\n")
            };
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                detail.trim()
            );
        }

        Ok(())
    }
}

fn drain_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    bar: Option<&ProgressBar>,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        // ffmpeg emits progress on '\r'-terminated lines
        while let Some(pos) = accumulated.find(|c| c == '\r' || c == '\n') {
            let line = accumulated[..pos].to_string();
            accumulated = accumulated[pos + 1..].to_string();

            if line.is_empty() {
                continue;
            }

            *last_line = line.clone();

            if verbose {
                eprintln!("{}", line);
            }

            if line.to_ascii_lowercase().contains("error") {
                error_lines.push(line.clone());
            }

            if let Some(bar) = bar {
                if let Some(progress) = parse_progress_seconds(&line) {
                    bar.set_position((progress * 1000.0) as u64);
                    if let Some(speed) = parse_speed(&line) {
                        bar.set_message(speed);
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_progress_seconds(line: &str) -> Option<f64> {
    let rest = &line[line.find("time=")? + 5..];
    let value = rest.split_whitespace().next()?;
    parse_clock(value)
}

fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_speed(line: &str) -> Option<String> {
    let rest = &line[line.find("speed=")? + 6..];
    let end = rest.find('x')?;
    Some(rest[..=end].trim_start().to_string())
}
