//! One-pole lowpass used to darken the synthesized reverb tail.

use crate::flush_denormal;
use libm::expf;

/// 6 dB/oct lowpass, `y[n] = x[n] + a * (y[n-1] - x[n])` with
/// `a = exp(-2π fc / fs)`.
///
/// # Example
///
/// ```rust
/// use remaster_core::OnePole;
///
/// let mut lp = OnePole::new(48000.0, 6000.0);
/// assert!(lp.process(1.0) < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct OnePole {
    a: f32,
    y: f32,
}

impl OnePole {
    /// Lowpass with its corner at `cutoff_hz`.
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        Self {
            a: expf(-core::f32::consts::TAU * cutoff_hz / sample_rate),
            y: 0.0,
        }
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y = flush_denormal(x + self.a * (self.y - x));
        self.y
    }

    /// Clear the filter memory.
    pub fn reset(&mut self) {
        self.y = 0.0;
    }
}
