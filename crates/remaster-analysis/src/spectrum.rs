//! Smoothed magnitude spectrum for visualization taps.
//!
//! Each call to [`SpectrumAnalyser::analyse`] takes the newest block of
//! time-domain samples and folds it into a running spectrum:
//!
//! ```text
//! X[k]  = FFT(blackman · x)[k] / N
//! S[k]  = τ · S_prev[k] + (1 - τ) · |X[k]|
//! dB[k] = 20 · log10(S[k])
//! byte  = 255 · (dB - min_db) / (max_db - min_db), clamped to 0..=255
//! ```
//!
//! with `N = 2048`, `τ = 0.8` and the byte range spanning -100 to -30 dB.

use crate::fft::{Fft, blackman};

/// Default FFT size.
pub const FFT_SIZE: usize = 2048;

/// Default smoothing constant.
pub const SMOOTHING: f32 = 0.8;

/// Level mapped to byte 0.
pub const MIN_DECIBELS: f32 = -100.0;

/// Level mapped to byte 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// Where in the chain a spectrum is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TapPoint {
    /// The source, before the equalizer.
    PreEq,
    /// The output of the whole chain.
    #[default]
    PostChain,
}

/// Running smoothed spectrum.
#[derive(Debug)]
pub struct SpectrumAnalyser {
    sample_rate: f32,
    smoothing: f32,
    window: Vec<f32>,
    windowed: Vec<f32>,
    fft: Fft,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    /// Analyser with the default size and smoothing.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_size(sample_rate, FFT_SIZE, SMOOTHING)
    }

    /// Analyser with an explicit FFT size and smoothing constant in `[0, 1)`.
    pub fn with_size(sample_rate: f32, fft_size: usize, smoothing: f32) -> Self {
        Self {
            sample_rate,
            smoothing: smoothing.clamp(0.0, 0.999),
            window: blackman(fft_size),
            windowed: vec![0.0; fft_size],
            fft: Fft::new(fft_size),
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Number of frequency bins (`fft_size / 2`).
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Center frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate / self.fft.size() as f32
    }

    /// Fold the newest `fft_size` samples of `samples` into the spectrum.
    ///
    /// Shorter input is treated as zero-padded at the front.
    pub fn analyse(&mut self, samples: &[f32]) {
        let n = self.windowed.len();
        let take = samples.len().min(n);
        let pad = n - take;
        self.windowed[..pad].fill(0.0);
        self.windowed[pad..].copy_from_slice(&samples[samples.len() - take..]);
        for (s, w) in self.windowed.iter_mut().zip(&self.window) {
            *s *= w;
        }

        let scale = 1.0 / n as f32;
        let tau = self.smoothing;
        let spectrum = self.fft.forward(&self.windowed);
        for (s, x) in self.smoothed.iter_mut().zip(spectrum) {
            *s = tau * *s + (1.0 - tau) * x.norm() * scale;
        }
    }

    /// Smoothed spectrum in dB, one value per bin, written into `out`.
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        for (o, &s) in out.iter_mut().zip(&self.smoothed) {
            *o = if s > 0.0 { 20.0 * s.log10() } else { f32::NEG_INFINITY };
        }
    }

    /// Smoothed spectrum in dB.
    pub fn decibels(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.bin_count()];
        self.float_frequency_data(&mut out);
        out
    }

    /// Smoothed spectrum mapped to `0..=255` over the display range.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (o, &s) in out.iter_mut().zip(&self.smoothed) {
            let db = if s > 0.0 { 20.0 * s.log10() } else { MIN_DECIBELS };
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *o = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Forget the running spectrum.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}
