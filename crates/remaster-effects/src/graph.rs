//! Signal graph builder and the processing graph it produces.
//!
//! ```text
//! Source → Equalizer → [Multiband] → Compressor → [Saturator]
//!        → StereoExpander (2 ch only) → Reverb → Limiter → MasterGain
//! ```
//!
//! Bracketed stages are [`Routed`]: toggling them re-routes around the stage
//! without touching the topology. One [`GraphBuilder`] serves every driver, so
//! a live preview and an offline export of the same parameters and source are
//! sample-for-sample identical.
//!
//! Parameter changes go through [`ProcessingGraph::prepare_update`] (may
//! allocate, run it on a control thread) and [`ProcessingGraph::apply_update`]
//! (never allocates, safe on the audio thread). Everything the apply step
//! displaces comes back in a [`GraphUpdate`] so it can be dropped elsewhere.

use std::sync::Arc;

use remaster_config::MasteringParams;
use remaster_core::{AudioBuffer, MAX_CHANNELS};

use crate::convolver::ConvolutionKernel;
use crate::impulse::ImpulseResponse;
use crate::multiband::check_crossovers;
use crate::reverb::{build_kernel, kernel_outdated};
use crate::stage::Route;
use crate::{
    Compressor, Equalizer, GraphError, Limiter, MasterGain, MultibandCompressor, Reverb, Routed,
    Saturator, Stage, StageError, StereoExpander,
};

/// Seed for impulse response noise unless the builder is given another.
pub const DEFAULT_IR_SEED: u64 = 0x5EED_F00D;

/// Gain reduction of every dynamics stage, in dB (≤ 0).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GainReduction {
    /// Single-band compressor.
    pub compressor: f32,
    /// Multiband sub-bands `[low, mid, high]`; zeros while bypassed.
    pub multiband: [f32; 3],
    /// Output limiter.
    pub limiter: f32,
}

/// Builds [`ProcessingGraph`]s for a fixed sample rate and channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBuilder {
    sample_rate: u32,
    num_channels: usize,
    ir_seed: u64,
}

impl GraphBuilder {
    /// Builder for a source of the given format.
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        Self {
            sample_rate,
            num_channels,
            ir_seed: DEFAULT_IR_SEED,
        }
    }

    /// Builder matching a buffer's format.
    pub fn for_buffer(buffer: &AudioBuffer) -> Self {
        Self::new(buffer.sample_rate(), buffer.num_channels())
    }

    /// Use a different impulse response seed.
    pub fn with_ir_seed(mut self, seed: u64) -> Self {
        self.ir_seed = seed;
        self
    }

    /// Validate `params` and wire the full chain.
    ///
    /// Fails on a bad format, invalid parameters or a required stage that
    /// cannot be built. Multiband and saturator failures fall back to their
    /// bypass route and are logged.
    pub fn build(&self, params: &MasteringParams) -> Result<ProcessingGraph, GraphError> {
        if self.sample_rate == 0 {
            return Err(GraphError::InvalidSampleRate(self.sample_rate));
        }
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(GraphError::UnsupportedChannels(self.num_channels));
        }
        params.validate()?;

        let sr = self.sample_rate as f32;
        let ch = self.num_channels;

        let equalizer = Equalizer::new(sr, ch, &params.eq)?;
        let multiband = optional(
            "multiband",
            MultibandCompressor::new(sr, ch, &params.multiband),
            params.multiband.enabled,
        );
        let saturator = optional(
            "saturator",
            Saturator::new(sr, ch, &params.saturator),
            params.saturator.enabled,
        );
        let reverb = Reverb::new(sr, ch, &params.reverb, self.ir_seed);

        tracing::debug!(
            sample_rate = self.sample_rate,
            channels = ch,
            ir_len = reverb.impulse_response().len(),
            "built processing graph"
        );

        Ok(ProcessingGraph {
            sample_rate: self.sample_rate,
            num_channels: ch,
            params: params.clone(),
            equalizer,
            multiband,
            compressor: Compressor::new(sr, &params.compressor),
            saturator,
            stereo: (ch == 2).then(|| StereoExpander::new(&params.stereo)),
            reverb,
            limiter: Limiter::new(sr, &params.limiter),
            master: MasterGain::new(params.master_volume),
        })
    }
}

fn optional<S: Stage>(name: &'static str, built: Result<S, StageError>, enabled: bool) -> Routed<S> {
    match built {
        Ok(stage) => Routed::new(stage, enabled),
        Err(e) => {
            tracing::warn!(stage = name, error = %e, "stage unavailable, routing around it");
            Routed::unavailable()
        }
    }
}

/// Work prepared off the audio thread, or the leftovers of applying it.
#[derive(Debug, Default)]
pub struct GraphUpdate {
    params: Option<MasteringParams>,
    kernel: Option<Arc<ConvolutionKernel>>,
    multiband: Option<MultibandCompressor>,
    saturator: Option<Saturator>,
    retire_multiband: bool,
}

impl GraphUpdate {
    /// Parameters carried by this update.
    pub fn params(&self) -> Option<&MasteringParams> {
        self.params.as_ref()
    }

    /// Whether a new impulse response is carried.
    pub fn has_kernel(&self) -> bool {
        self.kernel.is_some()
    }

    /// True when there is nothing in it.
    pub fn is_empty(&self) -> bool {
        self.params.is_none()
            && self.kernel.is_none()
            && self.multiband.is_none()
            && self.saturator.is_none()
            && !self.retire_multiband
    }
}

/// Prepares [`GraphUpdate`]s for a graph that lives on another thread.
///
/// It tracks what the graph will have loaded once every update it prepared
/// has been applied, in order. Obtain one from [`ProcessingGraph::planner`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlanner {
    sample_rate: u32,
    num_channels: usize,
    ir_seed: u64,
    decay_sec: f32,
    damping_hz: f32,
    multiband_available: bool,
    saturator_available: bool,
}

impl UpdatePlanner {
    /// Validate `params` and allocate whatever applying them needs.
    pub fn prepare(&mut self, params: &MasteringParams) -> Result<GraphUpdate, GraphError> {
        params.validate()?;
        let sr = self.sample_rate as f32;

        // crossovers the builder would refuse leave the slot empty, as a fresh build would
        let crossovers = check_crossovers(&params.multiband, sr);
        let mut retire_multiband = false;
        if let (true, Err(e)) = (self.multiband_available, &crossovers) {
            tracing::warn!(stage = "multiband", error = %e, "stage unavailable, routing around it");
            self.multiband_available = false;
            retire_multiband = true;
        }
        let rebuild_multiband =
            params.multiband.enabled && !self.multiband_available && crossovers.is_ok();
        let multiband = if rebuild_multiband {
            rebuild("multiband", MultibandCompressor::new(sr, self.num_channels, &params.multiband))
        } else {
            None
        };
        let saturator = if params.saturator.enabled && !self.saturator_available {
            rebuild("saturator", Saturator::new(sr, self.num_channels, &params.saturator))
        } else {
            None
        };
        self.multiband_available |= multiband.is_some();
        self.saturator_available |= saturator.is_some();

        let kernel = if kernel_outdated(self.decay_sec, self.damping_hz, &params.reverb) {
            let kernel = build_kernel(sr, &params.reverb, self.ir_seed);
            tracing::debug!(ir_len = kernel.response().len(), "prepared new impulse response");
            self.decay_sec = params.reverb.decay_sec;
            self.damping_hz = params.reverb.damping_hz;
            Some(Arc::new(kernel))
        } else {
            None
        };

        Ok(GraphUpdate {
            params: Some(params.clone()),
            kernel,
            multiband,
            saturator,
            retire_multiband,
        })
    }
}

/// The wired chain for one source.
#[derive(Debug)]
pub struct ProcessingGraph {
    sample_rate: u32,
    num_channels: usize,
    params: MasteringParams,
    equalizer: Equalizer,
    multiband: Routed<MultibandCompressor>,
    compressor: Compressor,
    saturator: Routed<Saturator>,
    stereo: Option<StereoExpander>,
    reverb: Reverb,
    limiter: Limiter,
    master: MasterGain,
}

impl ProcessingGraph {
    /// Run `buffer` through the chain in place.
    pub fn process(&mut self, buffer: &mut AudioBuffer) -> Result<(), GraphError> {
        if buffer.num_channels() != self.num_channels {
            return Err(GraphError::ChannelMismatch {
                expected: self.num_channels,
                actual: buffer.num_channels(),
            });
        }
        self.equalizer.process(buffer);
        self.multiband.process(buffer);
        self.compressor.process(buffer);
        self.saturator.process(buffer);
        if let Some(stereo) = self.stereo.as_mut() {
            stereo.process(buffer);
        }
        self.reverb.process(buffer);
        self.limiter.process(buffer);
        self.master.process(buffer);
        Ok(())
    }

    /// Validate and apply `params` in one step.
    pub fn update(&mut self, params: &MasteringParams) -> Result<(), GraphError> {
        let update = self.prepare_update(params)?;
        drop(self.apply_update(update));
        Ok(())
    }

    /// Validate `params` and do every allocation applying them needs.
    pub fn prepare_update(&self, params: &MasteringParams) -> Result<GraphUpdate, GraphError> {
        self.planner().prepare(params)
    }

    /// A control-side mirror of this graph for preparing updates elsewhere.
    pub fn planner(&self) -> UpdatePlanner {
        let loaded = self.reverb.impulse_response();
        UpdatePlanner {
            sample_rate: self.sample_rate,
            num_channels: self.num_channels,
            ir_seed: self.reverb.seed(),
            decay_sec: loaded.decay_sec(),
            damping_hz: loaded.damping_hz(),
            multiband_available: self.multiband.is_available(),
            saturator_available: self.saturator.is_available(),
        }
    }

    /// Apply a prepared update. Returns what it displaced.
    pub fn apply_update(&mut self, mut update: GraphUpdate) -> GraphUpdate {
        let mut retired = GraphUpdate::default();

        if let Some(kernel) = update.kernel.take() {
            retired.kernel = Some(self.reverb.install_kernel(kernel));
        }
        if update.retire_multiband {
            retired.multiband = self.multiband.take();
        }
        if let Some(stage) = update.multiband.take() {
            retired.multiband = self.multiband.replace(stage);
        }
        if let Some(stage) = update.saturator.take() {
            retired.saturator = self.saturator.replace(stage);
        }
        if let Some(params) = update.params.take() {
            self.apply_params(&params);
            retired.params = Some(std::mem::replace(&mut self.params, params));
        }
        retired
    }

    fn apply_params(&mut self, params: &MasteringParams) {
        self.equalizer.update(&params.eq);
        self.multiband.update(&params.multiband);
        self.multiband.set_enabled(params.multiband.enabled);
        self.compressor.update(&params.compressor);
        self.saturator.update(&params.saturator);
        self.saturator.set_enabled(params.saturator.enabled);
        if let Some(stereo) = self.stereo.as_mut() {
            stereo.update(&params.stereo);
        }
        self.reverb.set_targets(&params.reverb);
        self.limiter.update(&params.limiter);
        self.master.update(&params.master_volume);
    }

    /// Current gain reduction of every dynamics stage.
    pub fn gain_reduction(&self) -> GainReduction {
        GainReduction {
            compressor: self.compressor.gain_reduction_db(),
            multiband: self
                .multiband
                .active()
                .map_or([0.0; 3], MultibandCompressor::gain_reduction_db),
            limiter: self.limiter.gain_reduction_db(),
        }
    }

    /// Clear all signal state, as on a transport restart.
    pub fn reset(&mut self) {
        self.equalizer.reset();
        self.multiband.reset();
        self.compressor.reset();
        self.saturator.reset();
        if let Some(stereo) = self.stereo.as_mut() {
            stereo.reset();
        }
        self.reverb.reset();
        self.limiter.reset();
        self.master.reset();
    }

    /// Dry-path latency in samples.
    pub fn latency_samples(&self) -> usize {
        self.multiband.latency_samples()
            + self.compressor.latency_samples()
            + self.saturator.latency_samples()
            + self.reverb.latency_samples()
            + self.limiter.latency_samples()
    }

    /// Parameters the graph is running.
    pub fn params(&self) -> &MasteringParams {
        &self.params
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Loaded reverb impulse response.
    pub fn impulse_response(&self) -> &ImpulseResponse {
        self.reverb.impulse_response()
    }

    /// Equalizer coefficients, one `[b0, b1, b2, a1, a2]` per band.
    pub fn eq_coefficients(&self) -> Vec<[f32; 5]> {
        self.equalizer.coefficients()
    }

    /// Route of the multiband stage.
    pub fn multiband_route(&self) -> Route {
        self.multiband.route()
    }

    /// Route of the saturator.
    pub fn saturator_route(&self) -> Route {
        self.saturator.route()
    }

    /// Whether the multiband stage could be built.
    pub fn multiband_available(&self) -> bool {
        self.multiband.is_available()
    }

    /// Whether the saturator could be built.
    pub fn saturator_available(&self) -> bool {
        self.saturator.is_available()
    }
}

fn rebuild<S>(name: &'static str, built: Result<S, StageError>) -> Option<S> {
    built
        .map_err(|e| tracing::warn!(stage = name, error = %e, "stage still unavailable"))
        .ok()
}
