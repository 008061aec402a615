//! Oversampling around a nonlinear kernel.
//!
//! A waveshaper creates harmonics above the base Nyquist that would fold
//! back into the audible band. [`Oversampled`] runs its kernel `FACTOR`
//! times per input sample on a linearly interpolated signal, then lowpasses
//! the result with a Blackman-windowed sinc at the base Nyquist and keeps
//! every `FACTOR`-th output.

use core::f32::consts::PI;

use libm::{cosf, sinf};

use crate::Effect;

/// Length of the decimation filter.
pub const DECIMATION_TAPS: usize = 32;

/// Runs `E` at `FACTOR` times the base rate. `FACTOR` must be 2 or 4.
///
/// # Example
///
/// ```rust
/// use remaster_core::{Effect, Oversampled};
///
/// struct Clip;
/// impl Effect for Clip {
///     fn process(&mut self, x: f32) -> f32 { x.clamp(-0.5, 0.5) }
///     fn set_sample_rate(&mut self, _: f32) {}
///     fn reset(&mut self) {}
/// }
///
/// let mut clip = Oversampled::<4, _>::new(Clip, 48000.0);
/// assert!(clip.process(1.0).abs() <= 0.6);
/// ```
#[derive(Debug, Clone)]
pub struct Oversampled<const FACTOR: usize, E: Effect> {
    effect: E,
    taps: [f32; DECIMATION_TAPS],
    history: [f32; DECIMATION_TAPS],
    head: usize,
    last_input: f32,
}

impl<const FACTOR: usize, E: Effect> Oversampled<FACTOR, E> {
    /// Wrap `effect`, telling it it runs at `FACTOR × sample_rate`.
    pub fn new(mut effect: E, sample_rate: f32) -> Self {
        const { assert!(FACTOR == 2 || FACTOR == 4, "oversampling factor must be 2 or 4") };
        effect.set_sample_rate(sample_rate * FACTOR as f32);
        Self {
            effect,
            taps: decimation_filter(FACTOR),
            history: [0.0; DECIMATION_TAPS],
            head: 0,
            last_input: 0.0,
        }
    }

    /// The wrapped kernel.
    pub fn inner(&self) -> &E {
        &self.effect
    }

    /// The wrapped kernel, mutably.
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    #[inline]
    fn push(&mut self, y: f32) {
        self.head = (self.head + 1) % DECIMATION_TAPS;
        self.history[self.head] = y;
    }

    #[inline]
    fn filtered(&self) -> f32 {
        self.taps
            .iter()
            .enumerate()
            .map(|(k, t)| t * self.history[(self.head + DECIMATION_TAPS - k) % DECIMATION_TAPS])
            .sum()
    }
}

impl<const FACTOR: usize, E: Effect> Effect for Oversampled<FACTOR, E> {
    fn process(&mut self, x: f32) -> f32 {
        let step = (x - self.last_input) / FACTOR as f32;
        for i in 1..=FACTOR {
            let y = self.effect.process(self.last_input + step * i as f32);
            self.push(y);
        }
        self.last_input = x;
        self.filtered()
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.effect.set_sample_rate(sample_rate * FACTOR as f32);
    }

    fn reset(&mut self) {
        self.history = [0.0; DECIMATION_TAPS];
        self.head = 0;
        self.last_input = 0.0;
        self.effect.reset();
    }

    fn latency_samples(&self) -> usize {
        (DECIMATION_TAPS / 2).div_ceil(FACTOR) + self.effect.latency_samples().div_ceil(FACTOR)
    }
}

/// Unity-gain lowpass with its corner at `1 / (2 · factor)` cycles per
/// oversampled sample.
fn decimation_filter(factor: usize) -> [f32; DECIMATION_TAPS] {
    let cutoff = 0.5 / factor as f32;
    let mid = (DECIMATION_TAPS - 1) as f32 / 2.0;
    let span = (DECIMATION_TAPS - 1) as f32;
    let mut taps = [0.0; DECIMATION_TAPS];
    for (n, tap) in taps.iter_mut().enumerate() {
        let x = n as f32 - mid;
        let sinc = if x == 0.0 {
            2.0 * cutoff
        } else {
            sinf(2.0 * PI * cutoff * x) / (PI * x)
        };
        let phase = 2.0 * PI * n as f32 / span;
        let window = 0.42 - 0.5 * cosf(phase) + 0.08 * cosf(2.0 * phase);
        *tap = sinc * window;
    }
    let sum: f32 = taps.iter().sum();
    for tap in &mut taps {
        *tap /= sum;
    }
    taps
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    struct Scale(f32);

    impl Effect for Scale {
        fn process(&mut self, x: f32) -> f32 {
            x * self.0
        }
        fn set_sample_rate(&mut self, _: f32) {}
        fn reset(&mut self) {}
    }

    fn settle<const F: usize>(os: &mut Oversampled<F, Scale>, x: f32) -> f32 {
        let mut y = 0.0;
        for _ in 0..100 {
            y = os.process(x);
        }
        y
    }

    #[test]
    fn test_filter_is_symmetric_with_unity_dc() {
        for factor in [2, 4] {
            let taps = decimation_filter(factor);
            let sum: f32 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            for k in 0..DECIMATION_TAPS / 2 {
                assert!((taps[k] - taps[DECIMATION_TAPS - 1 - k]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_linear_kernel_keeps_gain() {
        let mut two = Oversampled::<2, _>::new(Scale(1.0), SR);
        assert!((settle(&mut two, 1.0) - 1.0).abs() < 1e-4);
        let mut four = Oversampled::<4, _>::new(Scale(0.5), SR);
        assert!((settle(&mut four, 1.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_passband_tone_survives() {
        let mut os = Oversampled::<4, _>::new(Scale(1.0), SR);
        let mut peak = 0.0f32;
        for i in 0..4800 {
            let y = os.process((2.0 * PI * 1000.0 * i as f32 / SR).sin());
            if i > 2400 {
                peak = peak.max(y.abs());
            }
        }
        assert!((peak - 1.0).abs() < 0.05, "peak {peak}");
    }

    #[test]
    fn test_reset_and_inner_access() {
        let mut os = Oversampled::<4, _>::new(Scale(1.0), SR);
        settle(&mut os, 1.0);
        os.reset();
        assert_eq!(os.process(0.0), 0.0);
        os.inner_mut().0 = 2.0;
        assert_eq!(os.inner().0, 2.0);
        assert_eq!(os.latency_samples(), 4);
    }
}
