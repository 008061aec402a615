//! Output limiter.
//!
//! A compressor with its curve pinned: hard knee, 20:1, 1 ms attack. Only the
//! ceiling (the threshold) and the release are user controls. The limiter is
//! always in the chain and cannot be bypassed.

use remaster_config::{CompressorParams, LimiterParams};
use remaster_core::AudioBuffer;

use crate::Stage;
use crate::dynamics::Dynamics;

/// Fixed limiter ratio.
pub const LIMITER_RATIO: f32 = 20.0;

/// Fixed limiter attack in seconds.
pub const LIMITER_ATTACK_SEC: f32 = 0.001;

fn curve(params: &LimiterParams) -> CompressorParams {
    CompressorParams {
        threshold_db: params.ceiling_db,
        knee_db: 0.0,
        ratio: LIMITER_RATIO,
        attack_sec: LIMITER_ATTACK_SEC,
        release_sec: params.release_sec,
    }
}

/// High-ratio peak limiter.
#[derive(Debug, Clone)]
pub struct Limiter {
    dynamics: Dynamics,
}

impl Limiter {
    /// Create a limiter.
    pub fn new(sample_rate: f32, params: &LimiterParams) -> Self {
        Self {
            dynamics: Dynamics::new(sample_rate, &curve(params)),
        }
    }

    /// Current gain reduction in dB (≤ 0).
    pub fn gain_reduction_db(&self) -> f32 {
        self.dynamics.gain_reduction_db()
    }

    /// Ceiling in dB.
    pub fn ceiling_db(&self) -> f32 {
        self.dynamics.computer().threshold_db()
    }
}

impl Stage for Limiter {
    type Params = LimiterParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        self.dynamics.process_linked(buffer.channels_mut());
    }

    fn update(&mut self, params: &LimiterParams) {
        self.dynamics.set_params(&curve(params));
    }

    fn reset(&mut self) {
        self.dynamics.reset();
    }
}
