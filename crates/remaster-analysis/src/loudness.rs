//! Approximate loudness metering.
//!
//! The meter reads fixed-size frames of post-chain samples and reports four
//! running values. Each frame contributes
//!
//! ```text
//! L = 20 · log10(rms) + 0.691
//! ```
//!
//! which is the BS.1770 channel offset applied to an unweighted RMS level;
//! there is no K-weighting and no gating. Momentary and short-term loudness
//! are the arithmetic mean of `L` over the last 400 ms and 3 s of frames.
//! Integrated loudness is one cumulative mean square since the last reset.
//! Silent frames (where `L` is not finite) are skipped by every window.

use std::collections::VecDeque;

/// Samples per metering frame.
pub const FRAME_LEN: usize = 2048;

/// Value reported by an empty loudness window.
pub const LUFS_FLOOR: f32 = -70.0;

/// Offset from RMS dB to the loudness scale.
pub const LOUDNESS_OFFSET_DB: f32 = 0.691;

const MOMENTARY_MS: f32 = 400.0;
const SHORT_TERM_MS: f32 = 3000.0;

/// Snapshot of the meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessMetrics {
    /// Mean over the last 400 ms.
    pub momentary_lufs: f32,
    /// Mean over the last 3 s.
    pub short_term_lufs: f32,
    /// Cumulative since the last reset.
    pub integrated_lufs: f32,
    /// Highest frame peak since the last reset, in dBFS.
    pub peak_db: f32,
}

impl Default for LoudnessMetrics {
    fn default() -> Self {
        Self {
            momentary_lufs: LUFS_FLOOR,
            short_term_lufs: LUFS_FLOOR,
            integrated_lufs: LUFS_FLOOR,
            peak_db: f32::NEG_INFINITY,
        }
    }
}

/// Sliding mean over a bounded number of frames.
#[derive(Debug, Clone)]
struct Window {
    values: VecDeque<f32>,
    budget: f32,
}

impl Window {
    fn new(window_ms: f32, sample_rate: f32, frame_len: usize) -> Self {
        let budget = (window_ms / 1000.0 * sample_rate) / frame_len as f32;
        Self {
            values: VecDeque::with_capacity(budget.ceil() as usize + 1),
            budget,
        }
    }

    fn push(&mut self, value: f32) {
        self.values.push_back(value);
        while self.values.len() as f32 > self.budget {
            self.values.pop_front();
        }
    }

    fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return LUFS_FLOOR;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }
}

/// Running loudness estimator.
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    frame_len: usize,
    momentary: Window,
    short_term: Window,
    sum_squares: f64,
    sample_count: u64,
    peak_db: f32,
}

impl LoudnessMeter {
    /// Meter reading [`FRAME_LEN`]-sample frames at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_frame_len(sample_rate, FRAME_LEN)
    }

    /// Meter with an explicit frame length.
    pub fn with_frame_len(sample_rate: f32, frame_len: usize) -> Self {
        let frame_len = frame_len.max(1);
        Self {
            frame_len,
            momentary: Window::new(MOMENTARY_MS, sample_rate, frame_len),
            short_term: Window::new(SHORT_TERM_MS, sample_rate, frame_len),
            sum_squares: 0.0,
            sample_count: 0,
            peak_db: f32::NEG_INFINITY,
        }
    }

    /// Frame length the window budgets were sized for.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Fold one frame of samples into the meter.
    pub fn push_frame(&mut self, frame: &[f32]) {
        if frame.is_empty() {
            return;
        }
        let mut sum_sq = 0.0f64;
        let mut peak = 0.0f32;
        for &s in frame {
            sum_sq += f64::from(s) * f64::from(s);
            peak = peak.max(s.abs());
        }
        let rms = (sum_sq / frame.len() as f64).sqrt() as f32;
        let level = 20.0 * rms.log10() + LOUDNESS_OFFSET_DB;

        if level.is_finite() {
            self.momentary.push(level);
            self.short_term.push(level);
            self.sum_squares += sum_sq;
            self.sample_count += frame.len() as u64;
        }

        self.peak_db = self.peak_db.max(20.0 * peak.log10());
    }

    /// Meter a whole signal, frame by frame. A trailing partial frame is
    /// included.
    pub fn push_signal(&mut self, signal: &[f32]) {
        for frame in signal.chunks(self.frame_len) {
            self.push_frame(frame);
        }
    }

    /// Current readings.
    pub fn metrics(&self) -> LoudnessMetrics {
        LoudnessMetrics {
            momentary_lufs: self.momentary.mean(),
            short_term_lufs: self.short_term.mean(),
            integrated_lufs: self.integrated(),
            peak_db: self.peak_db,
        }
    }

    fn integrated(&self) -> f32 {
        let mean_square = self.sum_squares / self.sample_count as f64;
        let level = 10.0 * mean_square.log10() as f32 + LOUDNESS_OFFSET_DB;
        if level.is_finite() { level } else { LUFS_FLOOR }
    }

    /// Clear every window, the cumulative total and the peak.
    pub fn reset(&mut self) {
        self.momentary.values.clear();
        self.short_term.values.clear();
        self.sum_squares = 0.0;
        self.sample_count = 0;
        self.peak_db = f32::NEG_INFINITY;
    }
}
