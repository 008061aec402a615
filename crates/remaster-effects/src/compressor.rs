//! Single-band feed-forward compressor.
//!
//! # Parameters
//!
//! | Parameter | Range | Default |
//! |-----------|-------|---------|
//! | Threshold | -60 to 0 dB | -24 |
//! | Knee | 0 to 40 dB | 30 |
//! | Ratio | 1:1 to 20:1 | 4 |
//! | Attack | 1–200 ms | 3 |
//! | Release | 10–1000 ms | 250 |
//!
//! Detection is linked across channels so the stereo image does not shift.

use remaster_config::CompressorParams;
use remaster_core::AudioBuffer;

use crate::Stage;
use crate::dynamics::Dynamics;

/// Linked broadband compressor.
///
/// # Example
///
/// ```rust
/// use remaster_config::CompressorParams;
/// use remaster_core::AudioBuffer;
/// use remaster_effects::{Compressor, Stage};
///
/// let mut comp = Compressor::new(48000.0, &CompressorParams::default());
/// let mut buffer = AudioBuffer::from_planar(vec![vec![0.5; 512]], 48000).unwrap();
/// comp.process(&mut buffer);
/// assert!(comp.gain_reduction_db() <= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    dynamics: Dynamics,
}

impl Compressor {
    /// Create a compressor.
    pub fn new(sample_rate: f32, params: &CompressorParams) -> Self {
        Self {
            dynamics: Dynamics::new(sample_rate, params),
        }
    }

    /// Current gain reduction in dB (≤ 0).
    pub fn gain_reduction_db(&self) -> f32 {
        self.dynamics.gain_reduction_db()
    }
}

impl Stage for Compressor {
    type Params = CompressorParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        self.dynamics.process_linked(buffer.channels_mut());
    }

    fn update(&mut self, params: &CompressorParams) {
        self.dynamics.set_params(params);
    }

    fn reset(&mut self) {
        self.dynamics.reset();
    }
}
