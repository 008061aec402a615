//! File analysis: levels, loudness and spectrum peaks.

use anyhow::Context;
use clap::Args;
use remaster_analysis::spectrum::{FFT_SIZE, SMOOTHING};
use remaster_analysis::{LoudnessMeter, SpectrumAnalyser, buffer_levels};
use remaster_io::read_wav;
use std::path::PathBuf;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// FFT size (power of two)
    #[arg(long, default_value_t = FFT_SIZE)]
    fft_size: usize,

    /// Show top N spectral peaks
    #[arg(long, default_value = "5")]
    peaks: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    if !args.fft_size.is_power_of_two() || args.fft_size < 64 {
        anyhow::bail!("FFT size must be a power of two of at least 64");
    }
    let buffer =
        read_wav(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;
    let sample_rate = buffer.sample_rate() as f32;

    let levels = buffer_levels(&buffer);

    let mut mono = Vec::new();
    buffer.mix_to_mono_into(&mut mono);
    let mut meter = LoudnessMeter::new(sample_rate);
    meter.push_signal(&mono);
    let loudness = meter.metrics();

    // Run the display analyser over the whole file, one hop per FFT frame.
    let mut analyser = SpectrumAnalyser::with_size(sample_rate, args.fft_size, SMOOTHING);
    for chunk in mono.chunks(args.fft_size) {
        analyser.analyse(chunk);
    }
    let peaks = spectral_peaks(&analyser, args.peaks);

    if args.json {
        let report = serde_json::json!({
            "file": args.input.display().to_string(),
            "sample_rate": buffer.sample_rate(),
            "channels": buffer.num_channels(),
            "frames": buffer.frames(),
            "duration_secs": buffer.duration_secs(),
            "peak_db": finite(levels.peak_db),
            "crest_db": finite(levels.crest_db),
            "channel_peak_db": levels.channel_peak_db.iter().map(|&v| finite(v)).collect::<Vec<_>>(),
            "channel_rms_db": levels.channel_rms_db.iter().map(|&v| finite(v)).collect::<Vec<_>>(),
            "loudness": {
                "momentary_lufs": loudness.momentary_lufs,
                "short_term_lufs": loudness.short_term_lufs,
                "integrated_lufs": loudness.integrated_lufs,
                "peak_db": finite(loudness.peak_db),
            },
            "spectral_peaks": peaks
                .iter()
                .map(|(hz, db)| serde_json::json!({ "frequency_hz": hz, "level_db": db }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", args.input.display());
    println!(
        "  {} frames, {} Hz, {} channel(s), {:.2}s",
        buffer.frames(),
        buffer.sample_rate(),
        buffer.num_channels(),
        buffer.duration_secs()
    );
    println!("\nLevels:");
    for (c, (peak, rms)) in levels
        .channel_peak_db
        .iter()
        .zip(&levels.channel_rms_db)
        .enumerate()
    {
        println!("  Channel {c}: Peak {peak:.1} dB, RMS {rms:.1} dB");
    }
    println!("  Crest factor: {:.1} dB", levels.crest_db);
    println!("\nLoudness (approximate, unweighted):");
    println!("  Momentary:  {:.1} LUFS", loudness.momentary_lufs);
    println!("  Short-term: {:.1} LUFS", loudness.short_term_lufs);
    println!("  Integrated: {:.1} LUFS", loudness.integrated_lufs);
    println!("\nSpectral peaks:");
    println!("  {:>10}  {:>8}", "Freq (Hz)", "dB");
    for (hz, db) in &peaks {
        println!("  {hz:>10.1}  {db:>8.1}");
    }
    Ok(())
}

/// JSON has no infinities; report silence as null.
fn finite(value: f32) -> Option<f32> {
    value.is_finite().then_some(value)
}

/// The `count` loudest local maxima as `(frequency_hz, level_db)`.
fn spectral_peaks(analyser: &SpectrumAnalyser, count: usize) -> Vec<(f32, f32)> {
    let db = analyser.decibels();
    let mut peaks: Vec<(f32, f32)> = (1..db.len().saturating_sub(1))
        .filter(|&k| db[k].is_finite() && db[k] > db[k - 1] && db[k] >= db[k + 1])
        .map(|k| (analyser.bin_frequency(k), db[k]))
        .collect();
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    peaks.truncate(count);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_spectral_peaks_find_tones() {
        let sr = 48000.0;
        let mut analyser = SpectrumAnalyser::new(sr);
        let signal: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                let t = i as f32 / sr;
                (2.0 * PI * 1000.0 * t).sin() + 0.1 * (2.0 * PI * 5000.0 * t).sin()
            })
            .collect();
        analyser.analyse(&signal);

        let peaks = spectral_peaks(&analyser, 2);
        assert_eq!(peaks.len(), 2);
        let bin = sr / FFT_SIZE as f32;
        assert!((peaks[0].0 - 1000.0).abs() <= bin, "{peaks:?}");
        assert!((peaks[1].0 - 5000.0).abs() <= bin, "{peaks:?}");
        assert!(peaks[0].1 > peaks[1].1);
    }

    #[test]
    fn test_finite() {
        assert_eq!(finite(-3.0), Some(-3.0));
        assert_eq!(finite(f32::NEG_INFINITY), None);
    }
}
