//! Convolution reverb.
//!
//! # Signal Flow
//!
//! ```text
//! Input ─┬────────────────────────────────────────────→ × (1 - mix) ─┐
//!        │              ┌→ Direct head ────────┐                     │
//!        └→ Pre-delay ──┤                      Σ → × mix ────────────┴→ Output
//!                       └→ Partitioned tail ───┘
//! ```
//!
//! The head of the response runs in the time domain, so the wet path has no
//! latency of its own and the pre-delay is exact down to zero. The impulse
//! response is re-synthesized only when decay moves by more than 10 ms or
//! damping by more than 10 Hz from the loaded response. While mix sits at
//! zero the wet path is skipped entirely and restarts from silence.

use std::sync::Arc;

use remaster_config::ReverbParams;
use remaster_config::validation::ranges;
use remaster_core::{AudioBuffer, DelayLine, LinearSmoothedParam};

use crate::convolver::{ConvolutionKernel, DirectConvolver, PartitionedConvolver, partitions_for};
use crate::impulse::{ImpulseResponse, synthesize};
use crate::{CONTROL_FRAME, Stage};

/// Decay change, in seconds, that triggers re-synthesis.
pub const DECAY_HYSTERESIS_SEC: f32 = 0.01;

/// Damping change, in Hz, that triggers re-synthesis.
pub const DAMPING_HYSTERESIS_HZ: f32 = 10.0;

/// Dry/wet convolution reverb.
#[derive(Debug)]
pub struct Reverb {
    sample_rate: f32,
    seed: u64,
    mix: LinearSmoothedParam,
    delay: LinearSmoothedParam,
    pre_delay: Vec<DelayLine>,
    heads: Vec<DirectConvolver>,
    convolvers: Vec<PartitionedConvolver>,
    kernel: Arc<ConvolutionKernel>,
    idle: bool,
}

impl Reverb {
    /// Build the stage and synthesize its first impulse response from `seed`.
    pub fn new(sample_rate: f32, num_channels: usize, params: &ReverbParams, seed: u64) -> Self {
        let kernel = Arc::new(build_kernel(sample_rate, params, seed));
        let capacity = partitions_for((sample_rate * ranges::DECAY_SEC.1) as usize)
            .max(kernel.partitions());
        let delay_line = DelayLine::from_time(sample_rate, ranges::PRE_DELAY_SEC.1);

        Self {
            sample_rate,
            seed,
            mix: LinearSmoothedParam::with_ramp(params.mix, CONTROL_FRAME as u32),
            delay: LinearSmoothedParam::with_ramp(
                delay_samples(params.pre_delay_sec, sample_rate),
                CONTROL_FRAME as u32,
            ),
            pre_delay: vec![delay_line; num_channels],
            heads: vec![DirectConvolver::new(); num_channels],
            convolvers: (0..num_channels)
                .map(|_| PartitionedConvolver::new(capacity))
                .collect(),
            kernel,
            idle: params.mix == 0.0,
        }
    }

    /// True when `params` are far enough from the loaded response to need a new one.
    pub fn needs_kernel(&self, params: &ReverbParams) -> bool {
        let loaded = self.kernel.response();
        kernel_outdated(loaded.decay_sec(), loaded.damping_hz(), params)
    }

    /// Synthesize the response `params` call for, if it differs from the loaded one.
    ///
    /// Allocates; run it away from the audio thread.
    pub fn prepare_kernel(&self, params: &ReverbParams) -> Option<Arc<ConvolutionKernel>> {
        self.needs_kernel(params)
            .then(|| Arc::new(build_kernel(self.sample_rate, params, self.seed)))
    }

    /// Swap in a prepared kernel and return the one it replaces.
    pub fn install_kernel(&mut self, kernel: Arc<ConvolutionKernel>) -> Arc<ConvolutionKernel> {
        std::mem::replace(&mut self.kernel, kernel)
    }

    /// Seed the impulse response noise is drawn from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The loaded kernel.
    pub fn kernel(&self) -> &Arc<ConvolutionKernel> {
        &self.kernel
    }

    /// The loaded impulse response.
    pub fn impulse_response(&self) -> &ImpulseResponse {
        self.kernel.response()
    }

    /// Target wet mix.
    pub fn mix(&self) -> f32 {
        self.mix.target()
    }

    /// Set mix and pre-delay targets without touching the kernel.
    pub fn set_targets(&mut self, params: &ReverbParams) {
        self.mix.set_target(params.mix);
        self.delay
            .set_target(delay_samples(params.pre_delay_sec, self.sample_rate));
    }

    fn clear_wet(&mut self) {
        for line in &mut self.pre_delay {
            line.clear();
        }
        for head in &mut self.heads {
            head.clear();
        }
        for conv in &mut self.convolvers {
            conv.clear();
        }
        self.delay.snap_to_target();
    }
}

pub(crate) fn kernel_outdated(decay_sec: f32, damping_hz: f32, params: &ReverbParams) -> bool {
    (params.decay_sec - decay_sec).abs() > DECAY_HYSTERESIS_SEC
        || (params.damping_hz - damping_hz).abs() > DAMPING_HYSTERESIS_HZ
}

pub(crate) fn build_kernel(sample_rate: f32, params: &ReverbParams, seed: u64) -> ConvolutionKernel {
    ConvolutionKernel::new(synthesize(
        sample_rate,
        params.decay_sec,
        params.damping_hz,
        seed,
    ))
}

fn delay_samples(pre_delay_sec: f32, sample_rate: f32) -> f32 {
    (pre_delay_sec * sample_rate).max(0.0)
}

impl Stage for Reverb {
    type Params = ReverbParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.mix.is_settled() && self.mix.get() == 0.0 {
            self.idle = true;
            return;
        }
        if self.idle {
            self.clear_wet();
            self.idle = false;
        }

        let frames = buffer.frames();
        let channels = buffer.channels_mut();
        let n = channels.len().min(self.convolvers.len());

        for i in 0..frames {
            let mix = self.mix.advance();
            let delay = self.delay.advance();
            for c in 0..n {
                let dry = channels[c][i];
                let delayed = self.pre_delay[c].write_read(dry, delay);
                let wet = self.heads[c].process(delayed, self.kernel.head(c))
                    + self.convolvers[c].process(delayed, self.kernel.tail(c));
                channels[c][i] = dry * (1.0 - mix) + wet * mix;
            }
        }
    }

    fn update(&mut self, params: &ReverbParams) {
        self.set_targets(params);
        if let Some(kernel) = self.prepare_kernel(params) {
            self.install_kernel(kernel);
        }
    }

    fn reset(&mut self) {
        self.mix.snap_to_target();
        self.clear_wet();
        self.idle = self.mix.get() == 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mix: f32) -> ReverbParams {
        ReverbParams {
            mix,
            decay_sec: 0.3,
            pre_delay_sec: 0.0,
            damping_hz: 20000.0,
        }
    }

    fn impulse(frames: usize) -> AudioBuffer {
        let mut samples = vec![0.0; frames];
        samples[0] = 1.0;
        AudioBuffer::from_planar(vec![samples.clone(), samples], 48000).unwrap()
    }

    #[test]
    fn test_zero_mix_is_dry() {
        let mut reverb = Reverb::new(48000.0, 2, &params(0.0), 1);
        let mut buffer = impulse(4096);
        let reference = buffer.clone();
        reverb.process(&mut buffer);
        assert_eq!(buffer, reference);
    }

    #[test]
    fn test_full_mix_is_the_response() {
        let mut reverb = Reverb::new(48000.0, 2, &params(1.0), 1);
        let mut buffer = impulse(4096);
        reverb.process(&mut buffer);
        let ir = reverb.impulse_response();
        for k in 0..2048 {
            assert!((buffer.channel(0)[k] - ir.channel(0)[k]).abs() < 1e-4, "sample {k}");
            assert!((buffer.channel(1)[k] - ir.channel(1)[k]).abs() < 1e-4, "sample {k}");
        }
    }

    fn render_impulse(pre_delay_sec: f32) -> (usize, Reverb, AudioBuffer) {
        let p = ReverbParams {
            pre_delay_sec,
            ..params(1.0)
        };
        let mut reverb = Reverb::new(48000.0, 1, &p, 1);
        let mut buffer = AudioBuffer::from_planar(vec![impulse(4096).channel(0).to_vec()], 48000)
            .unwrap();
        reverb.process(&mut buffer);
        ((pre_delay_sec * 48000.0).round() as usize, reverb, buffer)
    }

    #[test]
    fn test_pre_delay_is_exact() {
        // 5 ms sits inside the first partition, 20 ms beyond it
        for pre_delay_sec in [0.005, 0.02] {
            let (onset, reverb, buffer) = render_impulse(pre_delay_sec);
            assert!(buffer.channel(0)[..onset].iter().all(|s| s.abs() < 1e-6));
            let first = reverb.impulse_response().channel(0)[0];
            assert!((buffer.channel(0)[onset] - first).abs() < 1e-4, "{pre_delay_sec} s");
        }
    }

    #[test]
    fn test_hysteresis() {
        let mut reverb = Reverb::new(48000.0, 2, &params(0.5), 1);
        let mut p = params(0.5);
        p.decay_sec += 0.005;
        p.damping_hz -= 5.0;
        assert!(!reverb.needs_kernel(&p));
        p.decay_sec += 0.01;
        assert!(reverb.needs_kernel(&p));

        let before = Arc::clone(reverb.kernel());
        reverb.update(&p);
        assert!(!Arc::ptr_eq(&before, reverb.kernel()));
        assert_eq!(reverb.impulse_response().decay_sec(), p.decay_sec);
    }

    #[test]
    fn test_reenabled_wet_path_starts_silent() {
        let mut reverb = Reverb::new(48000.0, 1, &params(1.0), 1);
        let mut loud = AudioBuffer::from_planar(vec![vec![0.5; 2048]], 48000).unwrap();
        reverb.process(&mut loud);

        reverb.update(&params(0.0));
        let mut silence = AudioBuffer::new(1, 1024, 48000).unwrap();
        reverb.process(&mut silence);
        reverb.process(&mut silence);

        reverb.update(&params(1.0));
        let mut silence = AudioBuffer::new(1, 2048, 48000).unwrap();
        reverb.process(&mut silence);
        assert!(silence.channel(0).iter().all(|&s| s == 0.0));
    }
}
