//! Tape-style saturator.
//!
//! # Transfer Curve
//!
//! ```text
//! xc = clamp(x · (1 + drive·0.25), -1, 1)
//! k  = drive · 10
//! y  = (π + k) · xc / (π + k·|xc|) · 1 / (1 + drive·0.05)
//! ```
//!
//! The curve is odd-symmetric, passes through ±1, and runs 4× oversampled.
//! At `drive = 0` it reduces to the identity on `[-1, 1]`, but the disabled
//! stage never evaluates it: bypass is a separate unity path.

use core::f32::consts::PI;

use remaster_config::SaturatorParams;
use remaster_core::{AudioBuffer, Effect, LinearSmoothedParam, Oversampled};

use crate::error::StageError;
use crate::{CONTROL_FRAME, Stage};

/// Oversampling factor of the shaper.
pub const OVERSAMPLE: usize = 4;

/// Highest oversampled rate the anti-aliasing filters are designed for.
pub const MAX_OVERSAMPLED_RATE: u32 = 768_000;

/// The memoryless tape curve, with a ramped drive.
#[derive(Debug, Clone)]
pub struct TapeCurve {
    drive: LinearSmoothedParam,
}

impl TapeCurve {
    /// Create the curve at `drive` in `[0, 1]`.
    pub fn new(drive: f32) -> Self {
        Self {
            drive: LinearSmoothedParam::with_ramp(drive, (CONTROL_FRAME * OVERSAMPLE) as u32),
        }
    }

    /// Ramp to a new drive.
    pub fn set_drive(&mut self, drive: f32) {
        self.drive.set_target(drive.clamp(0.0, 1.0));
    }

    /// Target drive.
    pub fn drive(&self) -> f32 {
        self.drive.target()
    }

    /// Evaluate the curve at a fixed drive.
    #[inline]
    pub fn shape(x: f32, drive: f32) -> f32 {
        let xc = (x * (1.0 + drive * 0.25)).clamp(-1.0, 1.0);
        let k = drive * 10.0;
        let post = 1.0 / (1.0 + drive * 0.05);
        post * (PI + k) * xc / (PI + k * xc.abs())
    }
}

impl Effect for TapeCurve {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let drive = self.drive.advance();
        Self::shape(input, drive)
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {
        self.drive.snap_to_target();
    }
}

/// Oversampled saturator stage, one shaper per channel.
#[derive(Debug, Clone)]
pub struct Saturator {
    shapers: Vec<Oversampled<OVERSAMPLE, TapeCurve>>,
}

impl Saturator {
    /// Build the stage.
    ///
    /// Fails when the oversampled rate would exceed [`MAX_OVERSAMPLED_RATE`].
    pub fn new(
        sample_rate: f32,
        num_channels: usize,
        params: &SaturatorParams,
    ) -> Result<Self, StageError> {
        let max = MAX_OVERSAMPLED_RATE / OVERSAMPLE as u32;
        if sample_rate > max as f32 {
            return Err(StageError::SampleRateTooHigh {
                stage: "saturator",
                sample_rate: sample_rate as u32,
                max,
            });
        }
        let shaper = Oversampled::new(TapeCurve::new(params.drive), sample_rate);
        Ok(Self {
            shapers: vec![shaper; num_channels],
        })
    }

    /// Target drive.
    pub fn drive(&self) -> f32 {
        self.shapers.first().map_or(0.0, |s| s.inner().drive())
    }
}

impl Stage for Saturator {
    type Params = SaturatorParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        for (channel, shaper) in buffer.channels_mut().iter_mut().zip(&mut self.shapers) {
            shaper.process_slice(channel);
        }
    }

    fn update(&mut self, params: &SaturatorParams) {
        for shaper in &mut self.shapers {
            shaper.inner_mut().set_drive(params.drive);
        }
    }

    fn reset(&mut self) {
        for shaper in &mut self.shapers {
            shaper.reset();
        }
    }

    fn latency_samples(&self) -> usize {
        self.shapers.first().map_or(0, Effect::latency_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_is_identity_at_zero_drive() {
        for x in [-1.0, -0.5, 0.0, 0.3, 1.0] {
            assert!((TapeCurve::shape(x, 0.0) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_curve_is_odd_and_bounded() {
        for drive in [0.1, 0.5, 1.0] {
            for x in [0.05, 0.2, 0.7, 2.0, 10.0] {
                let y = TapeCurve::shape(x, drive);
                assert!((y + TapeCurve::shape(-x, drive)).abs() < 1e-6);
                assert!(y.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_drive_adds_gain_at_low_level() {
        // Soft curve lifts small signals more than it compresses them.
        assert!(TapeCurve::shape(0.1, 1.0) > 0.1);
    }

    #[test]
    fn test_rate_limit() {
        assert!(Saturator::new(192_000.0, 2, &SaturatorParams::default()).is_ok());
        let err = Saturator::new(384_000.0, 2, &SaturatorParams::default()).unwrap_err();
        assert!(matches!(err, StageError::SampleRateTooHigh { .. }));
    }

    #[test]
    fn test_update_reaches_every_channel() {
        let mut sat = Saturator::new(48000.0, 2, &SaturatorParams::default()).unwrap();
        sat.update(&SaturatorParams {
            enabled: true,
            drive: 0.8,
        });
        assert!(sat.shapers.iter().all(|s| s.inner().drive() == 0.8));
    }

    #[test]
    fn test_output_is_finite() {
        let mut sat = Saturator::new(
            48000.0,
            1,
            &SaturatorParams {
                enabled: true,
                drive: 1.0,
            },
        )
        .unwrap();
        let samples = (0..1024).map(|i| ((i as f32) * 0.05).sin() * 1.5).collect();
        let mut buffer = AudioBuffer::from_planar(vec![samples], 48000).unwrap();
        sat.process(&mut buffer);
        assert!(buffer.channel(0).iter().all(|s| s.is_finite() && s.abs() < 1.5));
    }
}
