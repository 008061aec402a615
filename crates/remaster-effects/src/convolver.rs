//! Uniformly partitioned FFT convolution.
//!
//! Overlap-save with partitions of [`PARTITION`] samples and FFTs of twice
//! that. The impulse response is cut into partitions that are transformed
//! once, when the kernel is built. Each input block is transformed once and
//! kept in a frequency-domain delay line; the output block is
//!
//! ```text
//! Y_k = Σ_p X_{k-p} · H_p
//! ```
//!
//! inverse-transformed, keeping the last `PARTITION` samples. The result lags
//! the input by exactly one partition.
//!
//! For a zero-latency path the first partition runs in the time domain
//! through a [`DirectConvolver`] and the FFT convolver is given only the
//! remaining partitions, [`ConvolutionKernel::tail`]. Its one-partition lag
//! then lands each tail partition exactly where it belongs.
//!
//! The delay line is sized up front for the longest kernel the convolver will
//! ever see, so swapping kernels never allocates.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::impulse::ImpulseResponse;

/// Partition length in samples.
pub const PARTITION: usize = 512;

const FFT_SIZE: usize = PARTITION * 2;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };

/// Number of partitions needed for `samples` of impulse response.
pub fn partitions_for(samples: usize) -> usize {
    samples.div_ceil(PARTITION).max(1)
}

/// Pre-transformed impulse response partitions, two channels.
pub struct ConvolutionKernel {
    response: ImpulseResponse,
    spectra: [Vec<Vec<Complex<f32>>>; 2],
}

impl ConvolutionKernel {
    /// Transform a response into partition spectra.
    pub fn new(response: ImpulseResponse) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let mut scratch = vec![ZERO; fft.get_inplace_scratch_len()];

        let spectra = [0, 1].map(|c| {
            response
                .channel(c)
                .chunks(PARTITION)
                .map(|chunk| {
                    let mut bins = vec![ZERO; FFT_SIZE];
                    for (bin, &s) in bins.iter_mut().zip(chunk) {
                        *bin = Complex::new(s, 0.0);
                    }
                    fft.process_with_scratch(&mut bins, &mut scratch);
                    bins
                })
                .collect()
        });

        Self { response, spectra }
    }

    /// The time-domain response.
    pub fn response(&self) -> &ImpulseResponse {
        &self.response
    }

    /// Partition count.
    pub fn partitions(&self) -> usize {
        self.spectra[0].len()
    }

    /// Partition spectra for a channel (wrapping over the two IR channels).
    pub fn channel(&self, index: usize) -> &[Vec<Complex<f32>>] {
        &self.spectra[index % 2]
    }

    /// First partition of a channel's response as time-domain taps.
    pub fn head(&self, index: usize) -> &[f32] {
        let taps = self.response.channel(index % 2);
        &taps[..taps.len().min(PARTITION)]
    }

    /// Partition spectra after the head.
    pub fn tail(&self, index: usize) -> &[Vec<Complex<f32>>] {
        self.channel(index).get(1..).unwrap_or_default()
    }
}

impl fmt::Debug for ConvolutionKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvolutionKernel")
            .field("len", &self.response.len())
            .field("partitions", &self.partitions())
            .field("decay_sec", &self.response.decay_sec())
            .field("damping_hz", &self.response.damping_hz())
            .finish_non_exhaustive()
    }
}

/// Zero-latency time-domain convolver for up to [`PARTITION`] taps.
#[derive(Debug, Clone)]
pub struct DirectConvolver {
    /// Input history, written twice so the last `PARTITION` samples are
    /// always contiguous.
    history: Vec<f32>,
    pos: usize,
}

impl Default for DirectConvolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectConvolver {
    /// Silent convolver.
    pub fn new() -> Self {
        Self {
            history: vec![0.0; PARTITION * 2],
            pos: 0,
        }
    }

    /// Push one input sample through `taps` and return one output sample.
    ///
    /// Taps beyond [`PARTITION`] are ignored.
    #[inline]
    pub fn process(&mut self, input: f32, taps: &[f32]) -> f32 {
        self.history[self.pos] = input;
        self.history[self.pos + PARTITION] = input;
        let window = &self.history[self.pos + 1..=self.pos + PARTITION];
        let y: f32 = window.iter().rev().zip(taps).map(|(x, h)| x * h).sum();
        self.pos = (self.pos + 1) % PARTITION;
        y
    }

    /// Clear all signal history.
    pub fn clear(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
    }
}

/// Streaming single-channel convolver.
pub struct PartitionedConvolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// `[previous block | current block]`
    input: Vec<f32>,
    /// Ring of input block spectra, newest at `head`.
    fdl: Vec<Vec<Complex<f32>>>,
    head: usize,
    accumulator: Vec<Complex<f32>>,
    output: Vec<f32>,
    pos: usize,
}

impl PartitionedConvolver {
    /// Create a convolver able to run kernels of up to `max_partitions`.
    pub fn new(max_partitions: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let ifft = planner.plan_fft_inverse(FFT_SIZE);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        Self {
            fft,
            ifft,
            scratch: vec![ZERO; scratch_len],
            input: vec![0.0; FFT_SIZE],
            fdl: vec![vec![ZERO; FFT_SIZE]; max_partitions.max(1)],
            head: 0,
            accumulator: vec![ZERO; FFT_SIZE],
            output: vec![0.0; PARTITION],
            pos: 0,
        }
    }

    /// Longest kernel, in partitions, this convolver can run.
    pub fn capacity(&self) -> usize {
        self.fdl.len()
    }

    /// Push one input sample through `kernel` and return one output sample.
    ///
    /// Kernel partitions beyond [`capacity`](Self::capacity) are ignored.
    #[inline]
    pub fn process(&mut self, input: f32, kernel: &[Vec<Complex<f32>>]) -> f32 {
        self.input[PARTITION + self.pos] = input;
        let y = self.output[self.pos];
        self.pos += 1;
        if self.pos == PARTITION {
            self.pos = 0;
            self.run_block(kernel);
        }
        y
    }

    fn run_block(&mut self, kernel: &[Vec<Complex<f32>>]) {
        let ring = self.fdl.len();
        let slot = &mut self.fdl[self.head];
        for (bin, &s) in slot.iter_mut().zip(&self.input) {
            *bin = Complex::new(s, 0.0);
        }
        self.fft.process_with_scratch(slot, &mut self.scratch);

        self.accumulator.fill(ZERO);
        for (p, h) in kernel.iter().take(ring).enumerate() {
            let x = &self.fdl[(self.head + ring - p) % ring];
            for ((acc, xv), hv) in self.accumulator.iter_mut().zip(x).zip(h) {
                *acc += xv * hv;
            }
        }

        self.ifft
            .process_with_scratch(&mut self.accumulator, &mut self.scratch);
        let scale = 1.0 / FFT_SIZE as f32;
        for (out, acc) in self.output.iter_mut().zip(&self.accumulator[PARTITION..]) {
            *out = acc.re * scale;
        }

        self.input.copy_within(PARTITION.., 0);
        self.head = (self.head + 1) % ring;
    }

    /// Clear all signal history.
    pub fn clear(&mut self) {
        self.input.fill(0.0);
        for spectrum in &mut self.fdl {
            spectrum.fill(ZERO);
        }
        self.output.fill(0.0);
        self.head = 0;
        self.pos = 0;
    }

    /// Latency in samples.
    pub fn latency_samples(&self) -> usize {
        PARTITION
    }
}

impl fmt::Debug for PartitionedConvolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedConvolver")
            .field("capacity", &self.fdl.len())
            .field("head", &self.head)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}
