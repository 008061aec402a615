//! Rational sample-rate conversion for offline export.
//!
//! Sources are converted to the export rate before rendering, so the chain
//! always runs at the rate the file is written at. A ratio `up / down` is
//! realised as zero-stuffing by `up`, a lowpass, then keeping every
//! `down`-th sample. Only the kept samples are computed: the lowpass is
//! split into `up` phases and each output draws on exactly one of them.
//!
//! The lowpass is a Blackman-windowed sinc whose group delay is subtracted,
//! so output sample `m` lines up with input position `m · down / up`.

use remaster_core::{AudioBuffer, BufferError};
use std::f32::consts::PI;

/// Filter length per unit of the larger ratio term.
const TAPS_PER_STEP: usize = 40;

/// Passband edge as a fraction of the narrower Nyquist.
const PASSBAND: f32 = 0.9;

/// Symmetric windowed-sinc lowpass, normalised to unity DC gain.
///
/// `cutoff` is relative to Nyquist.
fn windowed_sinc(len: usize, cutoff: f32) -> Vec<f32> {
    let centre = (len - 1) as f32 / 2.0;
    let span = (len - 1).max(1) as f32;
    let mut taps: Vec<f32> = (0..len)
        .map(|n| {
            let t = n as f32 - centre;
            let sinc = if t == 0.0 {
                cutoff
            } else {
                (PI * cutoff * t).sin() / (PI * t)
            };
            let phase = 2.0 * PI * n as f32 / span;
            sinc * (0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos())
        })
        .collect();
    let dc: f32 = taps.iter().sum();
    taps.iter_mut().for_each(|c| *c /= dc);
    taps
}

/// The lowpass split into `up` interleaved branches.
struct Polyphase {
    branches: Vec<Vec<f32>>,
    delay: usize,
}

impl Polyphase {
    fn new(up: usize, down: usize) -> Self {
        let len = TAPS_PER_STEP * up.max(down) + 1;
        let prototype = windowed_sinc(len, PASSBAND / up.max(down) as f32);
        let mut branches = vec![Vec::with_capacity(len.div_ceil(up)); up];
        for (k, &c) in prototype.iter().enumerate() {
            // zero stuffing loses a factor of `up` in level
            branches[k % up].push(c * up as f32);
        }
        Self {
            branches,
            delay: (len - 1) / 2,
        }
    }

    /// Output sample `m` of a conversion by `up / down`.
    fn sample(&self, signal: &[f32], m: usize, up: usize, down: usize) -> f32 {
        let t = m * down + self.delay;
        let newest = t / up;
        self.branches[t % up]
            .iter()
            .take(newest + 1)
            .enumerate()
            .filter_map(|(i, &c)| signal.get(newest - i).map(|&x| c * x))
            .sum()
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Convert `signal` by the ratio `up / down`, returning
/// `ceil(len · up / down)` samples.
///
/// # Panics
///
/// Panics if either term is zero.
pub fn resample(signal: &[f32], up: usize, down: usize) -> Vec<f32> {
    assert!(up > 0 && down > 0, "resampling ratio terms must be non-zero");
    let g = gcd(up, down);
    let (up, down) = (up / g, down / g);
    if up == down {
        return signal.to_vec();
    }
    let filter = Polyphase::new(up, down);
    (0..(signal.len() * up).div_ceil(down))
        .map(|m| filter.sample(signal, m, up, down))
        .collect()
}

/// Convert every channel of `buffer` to `to_rate`.
///
/// Returns a clone when the rates already match.
pub fn resample_buffer(buffer: &AudioBuffer, to_rate: u32) -> Result<AudioBuffer, BufferError> {
    if to_rate == 0 {
        return Err(BufferError::SampleRate);
    }
    let from_rate = buffer.sample_rate();
    if from_rate == to_rate {
        return Ok(buffer.clone());
    }
    let channels = buffer
        .channels()
        .iter()
        .map(|c| resample(c, to_rate as usize, from_rate as usize))
        .collect();
    AudioBuffer::from_planar(channels, to_rate)
}
