//! Second-order IIR sections and their RBJ cookbook designs.
//!
//! The crossover uses the low/high-pass and allpass designs, the equalizer
//! uses the bell and the two shelves. Shelves are fixed at slope `S = 1`.

use core::f32::consts::{SQRT_2, TAU};
use libm::{cosf, powf, sinf, sqrtf};

/// Raw cookbook coefficients, before division by `a[0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feedforward `b0, b1, b2`.
    pub b: [f32; 3],
    /// Feedback `a0, a1, a2`.
    pub a: [f32; 3],
}

impl Coefficients {
    /// Coefficients that pass the input through unchanged.
    pub const IDENTITY: Self = Self {
        b: [1.0, 0.0, 0.0],
        a: [1.0, 0.0, 0.0],
    };
}

/// Direct Form I biquad.
///
/// ```text
/// y[n] = b0·x[n] + b1·x[n-1] + b2·x[n-2] - a1·y[n-1] - a2·y[n-2]
/// ```
///
/// The state survives [`set`](Self::set), so coefficients may change every
/// sample while a gain ramps.
#[derive(Debug, Clone)]
pub struct Biquad {
    b: [f32; 3],
    a: [f32; 2],
    x: [f32; 2],
    y: [f32; 2],
}

impl Biquad {
    /// Passthrough section.
    pub fn new() -> Self {
        Self::with_coefficients(Coefficients::IDENTITY)
    }

    /// Section running `coefficients`.
    pub fn with_coefficients(coefficients: Coefficients) -> Self {
        let mut biquad = Self {
            b: [1.0, 0.0, 0.0],
            a: [0.0; 2],
            x: [0.0; 2],
            y: [0.0; 2],
        };
        biquad.set(coefficients);
        biquad
    }

    /// Swap in new coefficients, normalized by `a0`.
    #[inline]
    pub fn set(&mut self, Coefficients { b, a }: Coefficients) {
        let inv = 1.0 / a[0];
        self.b = [b[0] * inv, b[1] * inv, b[2] * inv];
        self.a = [a[1] * inv, a[2] * inv];
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let out = b0 * input + b1 * self.x[0] + b2 * self.x[1] - a1 * self.y[0] - a2 * self.y[1];
        self.x = [input, self.x[0]];
        self.y = [out, self.y[0]];
        out
    }

    /// Zero the history; coefficients are kept.
    pub fn clear(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }

    /// `[b0, b1, b2, a1, a2]` after normalization.
    pub fn normalized(&self) -> [f32; 5] {
        [self.b[0], self.b[1], self.b[2], self.a[0], self.a[1]]
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// `cos ω`, `sin ω` for a frequency.
#[inline]
fn angular(frequency: f32, sample_rate: f32) -> (f32, f32) {
    let w = TAU * frequency / sample_rate;
    (cosf(w), sinf(w))
}

/// Shared feedback side of the Q-based designs.
#[inline]
fn q_feedback(cos_w: f32, alpha: f32) -> [f32; 3] {
    [1.0 + alpha, -2.0 * cos_w, 1.0 - alpha]
}

/// 12 dB/oct low-pass; `q = 0.7071` is Butterworth.
pub fn lowpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_w, sin_w) = angular(frequency, sample_rate);
    let alpha = sin_w / (2.0 * q);
    let side = (1.0 - cos_w) / 2.0;
    Coefficients {
        b: [side, 2.0 * side, side],
        a: q_feedback(cos_w, alpha),
    }
}

/// 12 dB/oct high-pass; `q = 0.7071` is Butterworth.
pub fn highpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_w, sin_w) = angular(frequency, sample_rate);
    let alpha = sin_w / (2.0 * q);
    let side = (1.0 + cos_w) / 2.0;
    Coefficients {
        b: [side, -2.0 * side, side],
        a: q_feedback(cos_w, alpha),
    }
}

/// Flat-magnitude allpass.
///
/// At `q = 0.7071` its phase matches a Linkwitz-Riley 4th-order low/high
/// pair crossing at the same frequency.
pub fn allpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_w, sin_w) = angular(frequency, sample_rate);
    let a = q_feedback(cos_w, sin_w / (2.0 * q));
    Coefficients {
        b: [a[2], a[1], a[0]],
        a,
    }
}

/// Bell boosting or cutting `gain_db` around `frequency`. Exact identity at
/// 0 dB.
pub fn peaking_eq_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> Coefficients {
    let amp = powf(10.0, gain_db / 40.0);
    let (cos_w, sin_w) = angular(frequency, sample_rate);
    let alpha = sin_w / (2.0 * q);
    Coefficients {
        b: [1.0 + alpha * amp, -2.0 * cos_w, 1.0 - alpha * amp],
        a: [1.0 + alpha / amp, -2.0 * cos_w, 1.0 - alpha / amp],
    }
}

/// Shelf designs differ only in the sign of the cosine terms.
fn shelf(frequency: f32, gain_db: f32, sample_rate: f32, high: bool) -> Coefficients {
    let amp = powf(10.0, gain_db / 40.0);
    let (cos_w, sin_w) = angular(frequency, sample_rate);
    let c = if high { -cos_w } else { cos_w };
    let s = if high { -1.0 } else { 1.0 };
    // S = 1 gives alpha = sin ω / √2
    let k = 2.0 * sqrtf(amp) * sin_w / SQRT_2;
    let (p, m) = (amp + 1.0, amp - 1.0);
    Coefficients {
        b: [
            amp * (p - m * c + k),
            s * 2.0 * amp * (m - p * c),
            amp * (p - m * c - k),
        ],
        a: [p + m * c + k, -s * 2.0 * (m + p * c), p + m * c - k],
    }
}

/// Shelf scaling everything below `frequency` by `gain_db`.
pub fn low_shelf_coefficients(frequency: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    shelf(frequency, gain_db, sample_rate, false)
}

/// Shelf scaling everything above `frequency` by `gain_db`.
pub fn high_shelf_coefficients(frequency: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    shelf(frequency, gain_db, sample_rate, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    /// Steady-state RMS gain of a filter for a sine at `freq`, in linear units.
    fn sine_gain(coefficients: Coefficients, freq: f32) -> f32 {
        let mut biquad = Biquad::with_coefficients(coefficients);
        let (mut in_sq, mut out_sq) = (0.0_f64, 0.0_f64);
        for i in 0..(SR as usize) {
            let x = sinf(TAU * freq * i as f32 / SR);
            let y = biquad.process(x);
            if i > SR as usize / 2 {
                in_sq += f64::from(x * x);
                out_sq += f64::from(y * y);
            }
        }
        (out_sq / in_sq).sqrt() as f32
    }

    #[test]
    fn new_is_passthrough() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            assert!((biquad.process(input) - input).abs() < 1e-6);
        }
    }

    #[test]
    fn clear_zeroes_history() {
        let mut biquad = Biquad::with_coefficients(lowpass_coefficients(1000.0, 0.707, SR));
        for _ in 0..10 {
            biquad.process(1.0);
        }
        biquad.clear();
        assert_eq!(biquad.x, [0.0; 2]);
        assert_eq!(biquad.y, [0.0; 2]);
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut biquad = Biquad::with_coefficients(lowpass_coefficients(1000.0, 0.707, SR));
        let mut output = 0.0;
        for _ in 0..2000 {
            output = biquad.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.01);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut biquad = Biquad::with_coefficients(highpass_coefficients(1000.0, 0.707, SR));
        let mut output = 1.0;
        for _ in 0..4000 {
            output = biquad.process(1.0);
        }
        assert!(output.abs() < 1e-3, "DC leaked through highpass: {output}");
    }

    #[test]
    fn allpass_is_flat() {
        for freq in [50.0, 1000.0, 12000.0] {
            let gain = sine_gain(allpass_coefficients(3000.0, 0.7071, SR), freq);
            assert!((gain - 1.0).abs() < 1e-3, "allpass gain {gain} at {freq} Hz");
        }
    }

    #[test]
    fn flat_bell_is_identity() {
        let Coefficients { b, a } = peaking_eq_coefficients(1000.0, 1.2, 0.0, SR);
        for (b, a) in b.iter().zip(&a) {
            assert!((b - a).abs() < 1e-7);
        }
    }

    #[test]
    fn bell_boosts_at_center() {
        let gain = sine_gain(peaking_eq_coefficients(1000.0, 1.2, 6.0, SR), 1000.0);
        let db = 20.0 * libm::log10f(gain);
        assert!((db - 6.0).abs() < 0.3, "expected +6 dB at center, got {db}");
    }

    #[test]
    fn low_shelf_boosts_lows_only() {
        let coefficients = low_shelf_coefficients(80.0, 6.0, SR);
        let low = 20.0 * libm::log10f(sine_gain(coefficients, 20.0));
        let high = 20.0 * libm::log10f(sine_gain(coefficients, 5000.0));
        assert!((low - 6.0).abs() < 0.5, "low shelf passband {low}");
        assert!(high.abs() < 0.2, "low shelf leaked into highs {high}");
    }

    #[test]
    fn high_shelf_cuts_highs_only() {
        let coefficients = high_shelf_coefficients(6000.0, -6.0, SR);
        let low = 20.0 * libm::log10f(sine_gain(coefficients, 100.0));
        let high = 20.0 * libm::log10f(sine_gain(coefficients, 18000.0));
        assert!(low.abs() < 0.2, "high shelf touched lows {low}");
        assert!((high + 6.0).abs() < 0.6, "high shelf stopband {high}");
    }

    #[test]
    fn flat_shelves_are_identity() {
        for coefficients in [
            low_shelf_coefficients(80.0, 0.0, SR),
            high_shelf_coefficients(6000.0, 0.0, SR),
        ] {
            let [b0, b1, b2, a1, a2] = Biquad::with_coefficients(coefficients).normalized();
            assert!((b0 - 1.0).abs() < 1e-6);
            assert!((b1 - a1).abs() < 1e-5);
            assert!((b2 - a2).abs() < 1e-5);
        }
    }
}
