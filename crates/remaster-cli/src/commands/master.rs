//! Offline mastering and export.

use super::common::ParamSource;
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use remaster_analysis::{BufferLevels, LoudnessMeter, buffer_levels};
use remaster_core::AudioBuffer;
use remaster_io::{BitDepth, EXPORT_SAMPLE_RATE, RenderOptions, Session};
use std::path::PathBuf;

#[derive(Args)]
pub struct MasterArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory the export is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    params: ParamSource,

    /// Export bit depth (16 or 24)
    #[arg(long, default_value = "24")]
    bit_depth: u16,

    /// Export sample rate
    #[arg(long, default_value_t = EXPORT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(args: MasterArgs) -> anyhow::Result<()> {
    let params = args.params.resolve()?;
    let options = RenderOptions {
        sample_rate: args.sample_rate,
        bit_depth: BitDepth::try_from(args.bit_depth)?,
        ..RenderOptions::default()
    };

    let mut session = Session::with_options(params, options);
    session
        .open_file(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;

    let Some(source) = session.source() else {
        anyhow::bail!("no source loaded");
    };
    println!("Mastering {}...", args.input.display());
    println!(
        "  {} frames, {} Hz, {} channel(s), {:.2}s",
        source.frames(),
        source.sample_rate(),
        source.num_channels(),
        source.duration_secs()
    );
    let input_levels = buffer_levels(source);
    let input_lufs = integrated_lufs(source);

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let rendered = session.render_offline_with_progress(|done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    let path = session
        .write_export(&rendered, &args.output_dir)
        .context("export failed")?;

    let output_levels = buffer_levels(&rendered);
    println!("\nStats:");
    print_levels("Input: ", &input_levels, input_lufs);
    print_levels("Output:", &output_levels, integrated_lufs(&rendered));
    println!("\nWrote {}", path.display());
    Ok(())
}

fn print_levels(label: &str, levels: &BufferLevels, lufs: f32) {
    println!(
        "  {label} Peak {:.1} dB, RMS {:.1} dB, Crest {:.1} dB, Loudness {:.1} LUFS",
        levels.peak_db,
        levels.channel_rms_db.iter().copied().fold(f32::MIN, f32::max),
        levels.crest_db,
        lufs
    );
}

/// Whole-file loudness of the mono mix.
pub fn integrated_lufs(buffer: &AudioBuffer) -> f32 {
    let mut mono = Vec::new();
    buffer.mix_to_mono_into(&mut mono);
    let mut meter = LoudnessMeter::new(buffer.sample_rate() as f32);
    meter.push_signal(&mono);
    meter.metrics().integrated_lufs
}
