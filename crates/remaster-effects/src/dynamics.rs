//! Shared feed-forward dynamics core.
//!
//! The compressor, each multiband sub-band and the limiter all run the same
//! gain computer behind the same detector; they differ only in parameters.
//!
//! # Signal Flow
//!
//! ```text
//! max|x| across channels → Peak Detector (release) → Attack Smoother
//!     → dB → Gain Computer → gain reduction (dB, ≤ 0) → linear gain
//! ```
//!
//! # Detector
//!
//! A decoupled detector: the first follower has an effectively instant attack
//! and the user release, so it holds the signal peak between cycles; the
//! second follower smooths that level with the user attack. A steady sine
//! therefore settles at its true peak instead of an attack/release average,
//! which is what lets a 20:1 limiter hold its ceiling.
//!
//! # Curve Changes
//!
//! A new threshold, ratio or knee does not take effect in one sample. The
//! gain reduction of the old and new curves is cross-faded over one
//! [`CONTROL_FRAME`], the same ramp the other stages use for their controls.
//!
//! # References
//!
//! - Giannoulis, Massberg & Reiss, "Digital Dynamic Range Compressor Design — A
//!   Tutorial and Analysis", JAES vol. 60 no. 6, 2012. Section IV, smooth
//!   decoupled peak detector.

use remaster_config::CompressorParams;
use remaster_core::{EnvelopeFollower, LinearSmoothedParam, db_to_linear, linear_to_db};

use crate::CONTROL_FRAME;

/// Attack of the peak-holding stage, in milliseconds.
const PEAK_ATTACK_MS: f32 = 0.01;

/// Release of the smoothing stage, in milliseconds.
const SMOOTHER_RELEASE_MS: f32 = 0.1;

/// Static compression curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

impl GainComputer {
    /// Create a curve. `knee_db` of zero gives a hard knee.
    pub fn new(threshold_db: f32, ratio: f32, knee_db: f32) -> Self {
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
            knee_db: knee_db.max(0.0),
        }
    }

    /// Gain change in dB (≤ 0) for a detector level in dB.
    ///
    /// Quadratic interpolation across the knee, centered on the threshold.
    #[inline]
    pub fn gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 - 1.0 / self.ratio;

        if overshoot <= -half_knee {
            0.0
        } else if overshoot > half_knee {
            -(overshoot * slope)
        } else {
            let into_knee = overshoot + half_knee;
            -(slope * into_knee * into_knee / (2.0 * self.knee_db))
        }
    }

    /// Threshold in dB.
    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Ratio, at least 1.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Knee width in dB.
    pub fn knee_db(&self) -> f32 {
        self.knee_db
    }
}

/// One linked dynamics processor: detector plus gain computer.
#[derive(Debug, Clone)]
pub struct Dynamics {
    computer: GainComputer,
    previous: GainComputer,
    /// Weight of `computer` against `previous`, 0 to 1.
    blend: LinearSmoothedParam,
    peak: EnvelopeFollower,
    smoother: EnvelopeFollower,
    gain_reduction_db: f32,
}

impl Dynamics {
    /// Create a processor from compressor parameters.
    pub fn new(sample_rate: f32, params: &CompressorParams) -> Self {
        let computer = GainComputer::new(params.threshold_db, params.ratio, params.knee_db);
        let mut dynamics = Self {
            computer,
            previous: computer,
            blend: LinearSmoothedParam::with_ramp(1.0, CONTROL_FRAME as u32),
            peak: EnvelopeFollower::with_times(sample_rate, PEAK_ATTACK_MS, 100.0),
            smoother: EnvelopeFollower::with_times(sample_rate, 10.0, SMOOTHER_RELEASE_MS),
            gain_reduction_db: 0.0,
        };
        dynamics.set_params(params);
        dynamics
    }

    /// Apply new curve and ballistics. Detector state is kept.
    ///
    /// A changed curve is faded in over [`CONTROL_FRAME`] samples.
    pub fn set_params(&mut self, params: &CompressorParams) {
        let computer = GainComputer::new(params.threshold_db, params.ratio, params.knee_db);
        if computer != self.computer {
            self.previous = self.computer;
            self.computer = computer;
            self.blend = LinearSmoothedParam::with_ramp(0.0, CONTROL_FRAME as u32);
            self.blend.set_target(1.0);
        }
        self.peak.set_release_ms(params.release_sec * 1000.0);
        self.smoother.set_attack_ms(params.attack_sec * 1000.0);
    }

    /// Feed one detector sample and return the linear gain to apply.
    #[inline]
    pub fn gain(&mut self, level: f32) -> f32 {
        let held = self.peak.process(level);
        let smoothed = self.smoother.process(held);
        let level_db = linear_to_db(smoothed);
        let mut gr = self.computer.gain_db(level_db);
        if !self.blend.is_settled() {
            let w = self.blend.advance();
            gr = self.previous.gain_db(level_db) * (1.0 - w) + gr * w;
        }
        self.gain_reduction_db = gr;
        if gr == 0.0 { 1.0 } else { db_to_linear(gr) }
    }

    /// Process planar channels in place with linked detection.
    pub fn process_linked(&mut self, channels: &mut [Vec<f32>]) {
        let frames = channels.first().map_or(0, Vec::len);
        for i in 0..frames {
            let level = channels.iter().fold(0.0f32, |acc, ch| acc.max(ch[i].abs()));
            let g = self.gain(level);
            for ch in channels.iter_mut() {
                ch[i] *= g;
            }
        }
    }

    /// Most recent gain reduction in dB (≤ 0).
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// The static curve in use.
    pub fn computer(&self) -> &GainComputer {
        &self.computer
    }

    /// Clear detector state and the gain reduction reading.
    pub fn reset(&mut self) {
        self.blend.snap_to_target();
        self.peak.reset();
        self.smoother.reset();
        self.gain_reduction_db = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(threshold_db: f32, ratio: f32, knee_db: f32) -> CompressorParams {
        CompressorParams {
            threshold_db,
            knee_db,
            ratio,
            attack_sec: 0.001,
            release_sec: 0.05,
        }
    }

    #[test]
    fn test_hard_knee_curve() {
        let gc = GainComputer::new(-10.0, 4.0, 0.0);
        assert_eq!(gc.gain_db(-20.0), 0.0);
        assert_eq!(gc.gain_db(-10.0), 0.0);
        assert!((gc.gain_db(-2.0) + 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_soft_knee_is_continuous() {
        let gc = GainComputer::new(-20.0, 4.0, 10.0);
        let below = gc.gain_db(-25.0 - 1e-4);
        let above = gc.gain_db(-25.0 + 1e-4);
        assert!((below - above).abs() < 1e-3);
        let inside = gc.gain_db(-15.0 - 1e-4);
        let outside = gc.gain_db(-15.0 + 1e-4);
        assert!((inside - outside).abs() < 1e-3);
        assert!(gc.gain_db(-20.0) < 0.0);
    }

    #[test]
    fn test_knee_never_boosts() {
        let gc = GainComputer::new(-18.0, 3.0, 30.0);
        let mut prev = 0.0;
        for step in 0..=600 {
            let level = -40.0 + step as f32 * 0.1;
            let gr = gc.gain_db(level);
            assert!(gr <= 0.0, "{level} dB: {gr}");
            assert!(gr <= prev + 1e-6, "gain reduction shrank at {level} dB");
            prev = gr;
        }
    }

    #[test]
    fn test_unity_ratio_is_exact_passthrough() {
        let mut dynamics = Dynamics::new(48000.0, &params(-40.0, 1.0, 0.0));
        for _ in 0..1000 {
            assert_eq!(dynamics.gain(1.0), 1.0);
        }
        assert_eq!(dynamics.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_sine_settles_at_peak() {
        let mut dynamics = Dynamics::new(48000.0, &params(-6.0, 20.0, 0.0));
        let mut gr = 0.0;
        for i in 0..48000 {
            let x = (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48000.0).sin();
            dynamics.gain(x.abs());
            gr = dynamics.gain_reduction_db();
        }
        // 0 dB peak, 6 dB over, 19/20 of it removed
        assert!((gr + 5.7).abs() < 0.3, "gr = {gr}");
    }

    #[test]
    fn test_curve_change_fades_over_control_frame() {
        let mut dynamics = Dynamics::new(48000.0, &params(-20.0, 4.0, 0.0));
        for _ in 0..4800 {
            dynamics.gain(1.0);
        }
        let before = dynamics.gain_reduction_db();
        assert!((before + 15.0).abs() < 0.1, "gr = {before}");

        dynamics.set_params(&params(-40.0, 4.0, 0.0));
        let mut last = before;
        for _ in 0..CONTROL_FRAME {
            dynamics.gain(1.0);
            let gr = dynamics.gain_reduction_db();
            // 15 dB more reduction spread over the frame
            assert!((gr - last).abs() <= 15.0 / CONTROL_FRAME as f32 + 1e-3);
            last = gr;
        }
        assert!((last + 30.0).abs() < 0.1, "gr = {last}");
    }

    #[test]
    fn test_unchanged_curve_does_not_fade() {
        let mut dynamics = Dynamics::new(48000.0, &params(-20.0, 4.0, 0.0));
        let mut slower = params(-20.0, 4.0, 0.0);
        slower.release_sec = 0.5;
        dynamics.set_params(&slower);
        assert!(dynamics.blend.is_settled());
    }

    #[test]
    fn test_reset_clears_reading() {
        let mut dynamics = Dynamics::new(48000.0, &params(-20.0, 4.0, 0.0));
        for _ in 0..4800 {
            dynamics.gain(1.0);
        }
        assert!(dynamics.gain_reduction_db() < -10.0);
        dynamics.reset();
        assert_eq!(dynamics.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_linked_detection_applies_same_gain() {
        let mut dynamics = Dynamics::new(48000.0, &params(-20.0, 4.0, 0.0));
        let mut channels = vec![vec![0.9; 256], vec![0.1; 256]];
        dynamics.process_linked(&mut channels);
        for i in 0..256 {
            let gl = channels[0][i] / 0.9;
            let gr = channels[1][i] / 0.1;
            assert!((gl - gr).abs() < 1e-5);
        }
    }
}
