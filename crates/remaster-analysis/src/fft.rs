//! Windowed real-input FFT used by the spectrum taps.

use std::f32::consts::TAU;
use std::fmt;
use std::sync::Arc;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Blackman taper (α = 0.16) of `len` points, periodic form.
pub fn blackman(len: usize) -> Vec<f32> {
    let n = len as f32;
    (0..len)
        .map(|i| {
            let phase = TAU * i as f32 / n;
            0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
        })
        .collect()
}

/// Planned forward transform of one size. Running it never allocates.
pub struct Fft {
    plan: Arc<dyn rustfft::Fft<f32>>,
    bins: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Fft {
    /// Plan a transform of `size` points.
    pub fn new(size: usize) -> Self {
        let plan = FftPlanner::new().plan_fft_forward(size);
        let zero = Complex::new(0.0, 0.0);
        Self {
            scratch: vec![zero; plan.get_inplace_scratch_len()],
            bins: vec![zero; size],
            plan,
        }
    }

    /// Transform length.
    pub fn size(&self) -> usize {
        self.bins.len()
    }

    /// Transform `input`, zero-filling past its end, and return the bins
    /// below Nyquist.
    pub fn forward(&mut self, input: &[f32]) -> &[Complex<f32>] {
        let mut samples = input.iter().copied();
        for bin in &mut self.bins {
            *bin = Complex::new(samples.next().unwrap_or(0.0), 0.0);
        }
        self.plan.process_with_scratch(&mut self.bins, &mut self.scratch);
        &self.bins[..self.bins.len() / 2]
    }
}

impl fmt::Debug for Fft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft").field("size", &self.size()).finish()
    }
}
