//! Integration tests for remaster-cli.
//!
//! Every test runs the built binary; none needs an audio device.

use remaster_core::AudioBuffer;
use remaster_io::{BitDepth, read_wav_info, write_wav};
use std::f32::consts::PI;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

/// Helper to get the path to the `remaster` binary built by cargo.
fn remaster_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_remaster"))
}

fn run(args: &[&str]) -> Output {
    remaster_bin()
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run remaster")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_tone(path: &Path, sample_rate: u32, frames: usize) {
    let left: Vec<f32> = (0..frames)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    let right: Vec<f32> = left.iter().map(|s| s * 0.5).collect();
    let buffer = AudioBuffer::from_planar(vec![left, right], sample_rate).unwrap();
    write_wav(path, &buffer, BitDepth::TwentyFour).unwrap();
}

// ---------------------------------------------------------------------------
// remaster params
// ---------------------------------------------------------------------------

#[test]
fn cli_params_prints_defaults_as_toml() {
    let output = run(&["params"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("master_volume"));
    assert!(text.contains("[compressor]"));
    assert!(text.contains("Highs (6kHz)"));
}

#[test]
fn cli_params_applies_overrides() {
    let output = run(&[
        "params",
        "--json",
        "--set",
        "reverb.mix=0.25",
        "--set",
        "eq.highShelf=3",
        "--set",
        "saturator.enabled=true",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["reverb"]["mix"].as_f64(), Some(0.25));
    assert_eq!(json["eq"][4]["gain_db"].as_f64(), Some(3.0));
    assert_eq!(json["saturator"]["enabled"].as_bool(), Some(true));
}

#[test]
fn cli_params_rejects_out_of_range() {
    let output = run(&["params", "--set", "reverb.mix=2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("reverb.mix"), "stderr: {stderr}");
}

#[test]
fn cli_params_rejects_unknown_key() {
    let output = run(&["params", "--set", "reverb.size=2"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown parameter"));
}

#[test]
fn cli_params_save_and_reload() {
    let dir = tempdir().unwrap();
    let bare = dir.path().join("bare.toml");
    let named = dir.path().join("named.toml");

    let output = run(&[
        "params",
        "--set",
        "limiter.ceiling_db=-2",
        "--save",
        bare.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let output = run(&[
        "params",
        "--preset",
        bare.to_str().unwrap(),
        "--set",
        "master_volume=0.8",
        "--save",
        named.to_str().unwrap(),
        "--name",
        "Quiet",
    ]);
    assert!(output.status.success());
    assert!(std::fs::read_to_string(&named).unwrap().contains("name = \"Quiet\""));

    let output = run(&["params", "--json", "--preset", named.to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["limiter"]["ceiling_db"].as_f64(), Some(-2.0));
    assert!((json["master_volume"].as_f64().unwrap() - 0.8).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// remaster advise
// ---------------------------------------------------------------------------

#[test]
fn cli_advise_prints_prompt() {
    let output = run(&["advise", "too muddy", "--set", "eq.lowShelf=-2"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("User description: \"too muddy\".\n"));
    assert!(text.contains("Lows (80Hz): -2.0dB"));
    assert!(text.contains("Master Volume: 100%."));
}

// ---------------------------------------------------------------------------
// remaster master / analyze
// ---------------------------------------------------------------------------

#[test]
fn cli_master_exports_named_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("song.wav");
    write_tone(&input, 44100, 44100 / 2);
    let out_dir = dir.path().join("out");

    let output = run(&[
        "master",
        input.to_str().unwrap(),
        "--output-dir",
        out_dir.to_str().unwrap(),
        "--quiet",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let exported = out_dir.join("song_48kHz_24bit.wav");
    assert!(exported.exists());
    let info = read_wav_info(&exported).unwrap();
    assert_eq!(info.sample_rate, 48000);
    assert_eq!(info.bits_per_sample, 24);
    assert_eq!(info.channels, 2);
    assert_eq!(info.num_frames, 24000);
    assert!(stdout(&output).contains("Wrote"));
}

#[test]
fn cli_master_sixteen_bit() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.wav");
    write_tone(&input, 48000, 4800);

    let output = run(&[
        "master",
        input.to_str().unwrap(),
        "-o",
        dir.path().to_str().unwrap(),
        "--bit-depth",
        "16",
        "--quiet",
    ]);
    assert!(output.status.success());
    let info = read_wav_info(dir.path().join("clip_48kHz_16bit.wav")).unwrap();
    assert_eq!(info.bits_per_sample, 16);
}

#[test]
fn cli_master_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = run(&[
        "master",
        dir.path().join("nope.wav").to_str().unwrap(),
        "-o",
        dir.path().to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot open"));
}

#[test]
fn cli_analyze_json_report() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tone.wav");
    write_tone(&input, 48000, 48000);

    let output = run(&["analyze", input.to_str().unwrap(), "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["sample_rate"].as_u64(), Some(48000));
    assert_eq!(json["channels"].as_u64(), Some(2));

    let peak = json["peak_db"].as_f64().unwrap();
    assert!((peak - 20.0 * 0.5f64.log10()).abs() < 0.1, "peak {peak}");

    let top = json["spectral_peaks"][0]["frequency_hz"].as_f64().unwrap();
    assert!((top - 440.0).abs() < 48000.0 / 2048.0, "top peak {top}");
}

#[test]
fn cli_help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["master", "play", "analyze", "params", "advise", "devices"] {
        assert!(text.contains(command), "help should mention '{command}'");
    }
}
