//! Live playback through the mastering chain with meters.

use super::common::ParamSource;
use anyhow::Context;
use clap::Args;
use remaster_io::{Session, StreamConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const METER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Args)]
pub struct PlayArgs {
    /// WAV file to play
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[command(flatten)]
    params: ParamSource,

    /// Output device (index, exact name, or partial name)
    #[arg(short, long)]
    output: Option<String>,

    /// Frames per audio callback
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Loop playback
    #[arg(short, long, alias = "repeat")]
    r#loop: bool,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let params = args.params.resolve()?;
    let mut session = Session::new(params);
    session
        .open_file(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    if let Some(source) = session.source() {
        println!(
            "Playing {} ({} Hz, {:.1}s){}... Press Ctrl+C to stop.\n",
            args.file.display(),
            source.sample_rate(),
            source.duration_secs(),
            if args.r#loop { " (looping)" } else { "" }
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let config = StreamConfig {
        device: args.output,
        buffer_size: args.buffer_size,
    };
    session
        .start_live(&config)
        .context("cannot start playback")?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(METER_INTERVAL);

        let finished = session.controller().is_some_and(|c| c.is_finished());
        if finished {
            if !args.r#loop {
                break;
            }
            // playing a finished transport starts it from the top
            if let Err(e) = session.resume() {
                tracing::warn!(error = %e, "cannot restart playback");
                break;
            }
        }

        if let Some(meter) = session.poll_meters() {
            let snap = meter.snapshot();
            let gr = snap.gain_reduction;
            print!(
                "\r  {:6.1}s  M {:6.1}  S {:6.1}  I {:6.1} LUFS  GR comp {:5.1} lim {:5.1} dB ",
                snap.position_secs,
                snap.loudness.momentary_lufs,
                snap.loudness.short_term_lufs,
                snap.loudness.integrated_lufs,
                gr.compressor,
                gr.limiter
            );
            std::io::stdout().flush().ok();
        }
    }

    session.close();
    println!("\nDone!");
    Ok(())
}
