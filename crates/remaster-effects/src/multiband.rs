//! Three-band compressor.
//!
//! # Signal Flow
//!
//! ```text
//!        ┌→ LP(f1)² → AP(f2) ───────────→ Dynamics → makeup ─┐
//! Input ─┤                                                   ├→ Σ → Output
//!        └→ HP(f1)² ─┬→ LP(f2)² ─────────→ Dynamics → makeup ─┤
//!                    └→ HP(f2)² ─────────→ Dynamics → makeup ─┘
//! ```
//!
//! Each split is a Linkwitz-Riley 4th-order pair: two cascaded Butterworth
//! biquads (Q = 0.7071) per side. An LR4 low/high pair sums to a 2nd-order
//! allpass, so the upper split alone is magnitude-flat. The low band goes
//! through the matching allpass at `f2` so all three bands share the same
//! phase and the sum stays flat at both crossovers.
//!
//! Makeup gains ramp over one [`CONTROL_FRAME`] when they change.
//!
//! # References
//!
//! - Linkwitz, "Active Crossover Networks for Noncoincident Drivers", JAES 1976.
//! - Lipshitz & Vanderkooy, "In-Phase Crossover Network Design", JAES 1986.

use remaster_config::{BandParams, MultibandParams};
use remaster_core::{
    AudioBuffer, Biquad, LinearSmoothedParam, MAX_CHANNELS, allpass_coefficients, db_to_linear,
    highpass_coefficients, lowpass_coefficients,
};

use crate::{CONTROL_FRAME, Stage};
use crate::dynamics::Dynamics;
use crate::error::{StageError, check_nyquist};

const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Per-channel three-way Linkwitz-Riley splitter.
#[derive(Debug, Clone)]
pub struct CrossoverSplitter {
    low: [Biquad; 2],
    low_phase: Biquad,
    upper: [Biquad; 2],
    mid: [Biquad; 2],
    high: [Biquad; 2],
}

impl CrossoverSplitter {
    /// Create a splitter at the two crossover frequencies.
    pub fn new(low_mid_hz: f32, mid_high_hz: f32, sample_rate: f32) -> Self {
        let mut splitter = Self {
            low: [Biquad::new(), Biquad::new()],
            low_phase: Biquad::new(),
            upper: [Biquad::new(), Biquad::new()],
            mid: [Biquad::new(), Biquad::new()],
            high: [Biquad::new(), Biquad::new()],
        };
        splitter.set_crossovers(low_mid_hz, mid_high_hz, sample_rate);
        splitter
    }

    /// Move the crossovers. Filter state is kept.
    pub fn set_crossovers(&mut self, low_mid_hz: f32, mid_high_hz: f32, sample_rate: f32) {
        let lp1 = lowpass_coefficients(low_mid_hz, BUTTERWORTH_Q, sample_rate);
        let hp1 = highpass_coefficients(low_mid_hz, BUTTERWORTH_Q, sample_rate);
        let lp2 = lowpass_coefficients(mid_high_hz, BUTTERWORTH_Q, sample_rate);
        let hp2 = highpass_coefficients(mid_high_hz, BUTTERWORTH_Q, sample_rate);
        for f in &mut self.low {
            f.set(lp1);
        }
        for f in &mut self.upper {
            f.set(hp1);
        }
        for f in &mut self.mid {
            f.set(lp2);
        }
        for f in &mut self.high {
            f.set(hp2);
        }
        self.low_phase
            .set(allpass_coefficients(mid_high_hz, BUTTERWORTH_Q, sample_rate));
    }

    /// Split one sample into `[low, mid, high]`.
    #[inline]
    pub fn split(&mut self, x: f32) -> [f32; 3] {
        let low = self.low_phase.process(lr4(&mut self.low, x));
        let upper = lr4(&mut self.upper, x);
        let mid = lr4(&mut self.mid, upper);
        let high = lr4(&mut self.high, upper);
        [low, mid, high]
    }

    /// Clear filter state.
    pub fn reset(&mut self) {
        for f in self
            .low
            .iter_mut()
            .chain(self.upper.iter_mut())
            .chain(self.mid.iter_mut())
            .chain(self.high.iter_mut())
        {
            f.clear();
        }
        self.low_phase.clear();
    }
}

#[inline]
fn lr4(pair: &mut [Biquad; 2], x: f32) -> f32 {
    let y = pair[0].process(x);
    pair[1].process(y)
}

pub(crate) fn check_crossovers(
    params: &MultibandParams,
    sample_rate: f32,
) -> Result<(), StageError> {
    check_nyquist("multiband", params.crossover_low_mid_hz, sample_rate)?;
    check_nyquist("multiband", params.crossover_mid_high_hz, sample_rate)
}

/// Three-band linked compressor with per-band makeup gain.
#[derive(Debug, Clone)]
pub struct MultibandCompressor {
    sample_rate: f32,
    crossovers: (f32, f32),
    splitters: Vec<CrossoverSplitter>,
    bands: [Dynamics; 3],
    makeup: [LinearSmoothedParam; 3],
}

impl MultibandCompressor {
    /// Build the stage.
    ///
    /// Fails if either crossover is at or above Nyquist.
    pub fn new(
        sample_rate: f32,
        num_channels: usize,
        params: &MultibandParams,
    ) -> Result<Self, StageError> {
        check_crossovers(params, sample_rate)?;
        let [low, mid, high] = params.bands();
        let splitter = CrossoverSplitter::new(
            params.crossover_low_mid_hz,
            params.crossover_mid_high_hz,
            sample_rate,
        );
        Ok(Self {
            sample_rate,
            crossovers: (params.crossover_low_mid_hz, params.crossover_mid_high_hz),
            splitters: vec![splitter; num_channels.min(MAX_CHANNELS)],
            bands: [
                Dynamics::new(sample_rate, &low.compressor()),
                Dynamics::new(sample_rate, &mid.compressor()),
                Dynamics::new(sample_rate, &high.compressor()),
            ],
            makeup: [low, mid, high].map(|band| {
                LinearSmoothedParam::with_ramp(makeup(band), CONTROL_FRAME as u32)
            }),
        })
    }

    /// Gain reduction per band `[low, mid, high]` in dB.
    pub fn gain_reduction_db(&self) -> [f32; 3] {
        [
            self.bands[0].gain_reduction_db(),
            self.bands[1].gain_reduction_db(),
            self.bands[2].gain_reduction_db(),
        ]
    }

    /// Crossover frequencies in use.
    pub fn crossovers(&self) -> (f32, f32) {
        self.crossovers
    }
}

fn makeup(band: &BandParams) -> f32 {
    db_to_linear(band.makeup_gain_db)
}

impl Stage for MultibandCompressor {
    type Params = MultibandParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let frames = buffer.frames();
        let channels = buffer.channels_mut();
        let n = channels.len().min(self.splitters.len());
        let mut split = [[0.0f32; 3]; MAX_CHANNELS];

        for i in 0..frames {
            let mut level = [0.0f32; 3];
            for c in 0..n {
                split[c] = self.splitters[c].split(channels[c][i]);
                for b in 0..3 {
                    level[b] = level[b].max(split[c][b].abs());
                }
            }

            let mut gain = [0.0f32; 3];
            for b in 0..3 {
                gain[b] = self.bands[b].gain(level[b]) * self.makeup[b].advance();
            }

            for c in 0..n {
                channels[c][i] =
                    split[c][0] * gain[0] + split[c][1] * gain[1] + split[c][2] * gain[2];
            }
        }
    }

    fn update(&mut self, params: &MultibandParams) {
        let crossovers = (params.crossover_low_mid_hz, params.crossover_mid_high_hz);
        if crossovers != self.crossovers {
            match check_crossovers(params, self.sample_rate) {
                Ok(()) => {
                    for splitter in &mut self.splitters {
                        splitter.set_crossovers(crossovers.0, crossovers.1, self.sample_rate);
                    }
                    self.crossovers = crossovers;
                }
                Err(e) => {
                    tracing::warn!(stage = "multiband", error = %e, "keeping previous crossovers");
                }
            }
        }
        for (b, band) in params.bands().into_iter().enumerate() {
            self.bands[b].set_params(&band.compressor());
            self.makeup[b].set_target(makeup(band));
        }
    }

    fn reset(&mut self) {
        for splitter in &mut self.splitters {
            splitter.reset();
        }
        for band in &mut self.bands {
            band.reset();
        }
        for gain in &mut self.makeup {
            gain.snap_to_target();
        }
    }
}
