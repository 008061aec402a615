//! Chain-level properties of the mastering graph.
//!
//! Bypass equivalence, stereo width, crossover reconstruction, rebuild
//! determinism, limiter ceiling and the end-to-end limiter scenario.

use remaster_config::{CompressorParams, MasteringParams};
use remaster_core::{AudioBuffer, linear_to_db};
use remaster_effects::{
    Compressor, CrossoverSplitter, DEFAULT_IR_SEED, Equalizer, GraphBuilder, Limiter, MasterGain,
    MultibandCompressor, ProcessingGraph, Reverb, Saturator, Stage, StereoExpander,
};
use std::f32::consts::PI;

const SR: u32 = 48000;
const BLOCK: usize = 512;

/// Deterministic pseudo-noise in [-amp, amp].
fn noise(len: usize, seed: u32, amp: f32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32 * 2.0 - 1.0) * amp
        })
        .collect()
}

fn sine(freq: f32, amp: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amp * (2.0 * PI * freq * i as f32 / SR as f32).sin())
        .collect()
}

fn stereo_program(len: usize) -> AudioBuffer {
    let left: Vec<f32> = sine(220.0, 0.4, len)
        .iter()
        .zip(noise(len, 1, 0.2))
        .map(|(s, n)| s + n)
        .collect();
    let right: Vec<f32> = sine(330.0, 0.4, len)
        .iter()
        .zip(noise(len, 2, 0.2))
        .map(|(s, n)| s + n)
        .collect();
    AudioBuffer::from_planar(vec![left, right], SR).unwrap()
}

fn render_blocks(graph: &mut ProcessingGraph, input: &AudioBuffer) -> AudioBuffer {
    let mut output = AudioBuffer::new(input.num_channels(), 0, SR).unwrap();
    let mut block = AudioBuffer::new(input.num_channels(), BLOCK, SR).unwrap();
    let mut offset = 0;
    while offset < input.frames() {
        block.copy_from(input, offset, BLOCK);
        graph.process(&mut block).unwrap();
        output.extend_from(&block);
        offset += BLOCK;
    }
    output
}

fn assert_close(a: &AudioBuffer, b: &AudioBuffer, tolerance: f32) {
    assert_eq!(a.num_channels(), b.num_channels());
    assert_eq!(a.frames(), b.frames());
    for c in 0..a.num_channels() {
        for (i, (x, y)) in a.channel(c).iter().zip(b.channel(c)).enumerate() {
            assert!(
                (x - y).abs() <= tolerance,
                "channel {c} sample {i}: {x} vs {y}"
            );
        }
    }
}

fn busy_params() -> MasteringParams {
    let mut params = MasteringParams::default();
    params.eq[0].gain_db = 3.0;
    params.eq[3].gain_db = -2.0;
    params.reverb.mix = 0.25;
    params.reverb.decay_sec = 0.6;
    params.stereo.width = 1.4;
    params.master_volume = 0.9;
    params
}

#[test]
fn disabled_multiband_equals_chain_without_it() {
    let mut params = busy_params();
    params.multiband.enabled = false;
    params.saturator.enabled = false;
    let sr = SR as f32;

    let input = stereo_program(SR as usize);
    let mut graph = GraphBuilder::new(SR, 2).build(&params).unwrap();
    let from_graph = render_blocks(&mut graph, &input);

    let mut expected = input.clone();
    Equalizer::new(sr, 2, &params.eq).unwrap().process(&mut expected);
    Compressor::new(sr, &params.compressor).process(&mut expected);
    StereoExpander::new(&params.stereo).process(&mut expected);
    Reverb::new(sr, 2, &params.reverb, DEFAULT_IR_SEED).process(&mut expected);
    Limiter::new(sr, &params.limiter).process(&mut expected);
    MasterGain::new(params.master_volume).process(&mut expected);

    assert_close(&from_graph, &expected, 1e-6);
}

#[test]
fn disabled_saturator_equals_chain_without_it() {
    let mut params = busy_params();
    params.saturator.enabled = false;
    params.saturator.drive = 0.9;
    let sr = SR as f32;

    let input = stereo_program(SR as usize);
    let mut graph = GraphBuilder::new(SR, 2).build(&params).unwrap();
    let from_graph = render_blocks(&mut graph, &input);

    let mut expected = input.clone();
    Equalizer::new(sr, 2, &params.eq).unwrap().process(&mut expected);
    MultibandCompressor::new(sr, 2, &params.multiband)
        .unwrap()
        .process(&mut expected);
    Compressor::new(sr, &params.compressor).process(&mut expected);
    StereoExpander::new(&params.stereo).process(&mut expected);
    Reverb::new(sr, 2, &params.reverb, DEFAULT_IR_SEED).process(&mut expected);
    Limiter::new(sr, &params.limiter).process(&mut expected);
    MasterGain::new(params.master_volume).process(&mut expected);

    assert_close(&from_graph, &expected, 1e-6);
}

#[test]
fn enabled_saturator_changes_output() {
    let mut params = busy_params();
    params.saturator.enabled = true;
    params.saturator.drive = 0.9;
    let input = stereo_program(SR as usize / 4);

    let with = render_blocks(&mut GraphBuilder::new(SR, 2).build(&params).unwrap(), &input);
    params.saturator.enabled = false;
    let without = render_blocks(&mut GraphBuilder::new(SR, 2).build(&params).unwrap(), &input);
    assert_ne!(with, without);
    assert!(Saturator::new(SR as f32, 2, &params.saturator).is_ok());
}

#[test]
fn width_zero_collapses_graph_output_to_mono() {
    let mut params = MasteringParams::default();
    params.stereo.width = 0.0;
    let input = stereo_program(SR as usize / 2);
    let mut graph = GraphBuilder::new(SR, 2).build(&params).unwrap();
    let output = render_blocks(&mut graph, &input);
    assert_eq!(output.channel(0), output.channel(1));
}

#[test]
fn width_one_leaves_stereo_untouched() {
    let input = stereo_program(4096);
    let mut buffer = input.clone();
    StereoExpander::new(&MasteringParams::default().stereo).process(&mut buffer);
    assert_eq!(buffer, input);
}

#[test]
fn crossover_bands_reconstruct_noise() {
    let params = MasteringParams::default().multiband;
    let mut splitter = CrossoverSplitter::new(
        params.crossover_low_mid_hz,
        params.crossover_mid_high_hz,
        SR as f32,
    );
    let input = noise(SR as usize, 9, 0.5);
    let (mut in_energy, mut out_energy) = (0.0f64, 0.0f64);
    for (i, &x) in input.iter().enumerate() {
        let [l, m, h] = splitter.split(x);
        if i >= 4800 {
            in_energy += f64::from(x * x);
            out_energy += f64::from((l + m + h) * (l + m + h));
        }
    }
    let deviation_db = 10.0 * (out_energy / in_energy).log10();
    assert!(deviation_db.abs() < 3.0, "deviation {deviation_db} dB");
    assert!(deviation_db.abs() < 0.2, "LR4 sum should be allpass, got {deviation_db} dB");
}

#[test]
fn crossover_bands_reconstruct_swept_tones() {
    let mut freq = 30.0f32;
    while freq < 20000.0 {
        let mut splitter = CrossoverSplitter::new(250.0, 3000.0, SR as f32);
        let tone = sine(freq, 0.5, 24000);
        let (mut in_energy, mut out_energy) = (0.0f32, 0.0f32);
        for (i, &x) in tone.iter().enumerate() {
            let [l, m, h] = splitter.split(x);
            if i >= 12000 {
                in_energy += x * x;
                out_energy += (l + m + h) * (l + m + h);
            }
        }
        let deviation_db = 10.0 * (out_energy / in_energy).log10();
        assert!(deviation_db.abs() < 3.0, "{freq} Hz: {deviation_db} dB");
        freq *= 1.5;
    }
}

#[test]
fn rebuild_from_same_params_is_identical() {
    let params = busy_params();
    let a = GraphBuilder::new(SR, 2).build(&params).unwrap();
    let b = GraphBuilder::new(SR, 2).build(&params).unwrap();
    assert_eq!(a.eq_coefficients(), b.eq_coefficients());
    assert_eq!(a.impulse_response(), b.impulse_response());
    assert_eq!(a.latency_samples(), b.latency_samples());

    let input = stereo_program(SR as usize / 2);
    let (mut a, mut b) = (a, b);
    assert_eq!(render_blocks(&mut a, &input), render_blocks(&mut b, &input));
}

#[test]
fn block_size_does_not_change_output() {
    let params = busy_params();
    let input = stereo_program(SR as usize / 2);
    let mut blocked = GraphBuilder::new(SR, 2).build(&params).unwrap();
    let mut whole = GraphBuilder::new(SR, 2).build(&params).unwrap();

    let from_blocks = render_blocks(&mut blocked, &input);
    let mut one_shot = input.clone();
    whole.process(&mut one_shot).unwrap();
    assert_eq!(from_blocks, one_shot);
}

fn neutral_compressor() -> CompressorParams {
    CompressorParams {
        ratio: 1.0,
        ..CompressorParams::default()
    }
}

#[test]
fn limiter_holds_ceiling_in_graph() {
    let mut params = MasteringParams::default();
    params.compressor = neutral_compressor();
    params.multiband.enabled = false;
    params.limiter.ceiling_db = -6.0;

    let input = AudioBuffer::from_planar(vec![sine(1000.0, 1.0, SR as usize)], SR).unwrap();
    let mut graph = GraphBuilder::new(SR, 1).build(&params).unwrap();
    let output = render_blocks(&mut graph, &input);

    let settled = &output.channel(0)[SR as usize / 10..];
    let peak = settled.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(linear_to_db(peak) <= -6.0 + 1.0, "peak {} dB", linear_to_db(peak));
    assert!(graph.gain_reduction().limiter < -4.0);
}

#[test]
fn full_scale_sine_end_to_end() {
    let mut params = MasteringParams::default();
    params.compressor = neutral_compressor();
    params.multiband.enabled = false;
    params.saturator.enabled = false;
    params.reverb.mix = 0.0;
    params.limiter.ceiling_db = -1.0;
    params.master_volume = 1.0;

    let input = AudioBuffer::from_planar(vec![sine(1000.0, 1.0, SR as usize)], SR).unwrap();
    let mut graph = GraphBuilder::new(SR, 1).build(&params).unwrap();
    let output = render_blocks(&mut graph, &input);

    let settled = &output.channel(0)[SR as usize / 10..];
    let peak_db = linear_to_db(settled.iter().fold(0.0f32, |m, s| m.max(s.abs())));
    assert!((peak_db + 1.0).abs() <= 0.75, "peak {peak_db} dB");

    let gr = graph.gain_reduction();
    assert!(gr.limiter < 0.0);
    assert_eq!(gr.compressor, 0.0);
    assert_eq!(gr.multiband, [0.0; 3]);
}
