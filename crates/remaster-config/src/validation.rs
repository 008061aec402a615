//! Parameter ranges and validation.
//!
//! Out-of-range values are rejected, never clamped. [`MasteringParams::validate`]
//! is the single check both the live and the offline render paths go through,
//! and it reports every violation at once.
//!
//! # Example
//!
//! ```rust
//! use remaster_config::{MasteringParams, ValidationError};
//!
//! let mut params = MasteringParams::default();
//! params.multiband.crossover_low_mid_hz = 4000.0;
//! params.master_volume = 3.0;
//!
//! match params.validate() {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use thiserror::Error;

use crate::params::{
    BandParams, CompressorParams, EqBand, LimiterParams, MasteringParams, MultibandParams,
    ReverbParams, SaturatorParams, StereoExpanderParams,
};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// NaN or infinite parameter value.
    #[error("parameter '{param}' is not a finite number")]
    NonFinite {
        /// Name of the parameter.
        param: String,
    },

    /// Multiband crossovers not strictly increasing.
    #[error("crossover low/mid ({low_mid} Hz) must be below crossover mid/high ({mid_high} Hz)")]
    CrossoverOrder {
        /// Low/mid crossover in Hz.
        low_mid: f32,
        /// Mid/high crossover in Hz.
        mid_high: f32,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Documented `(min, max)` ranges, inclusive.
pub mod ranges {
    /// EQ band gain, dB.
    pub const EQ_GAIN_DB: (f32, f32) = (-15.0, 15.0);
    /// EQ band frequency, Hz.
    pub const EQ_FREQUENCY_HZ: (f32, f32) = (20.0, 20000.0);
    /// Peaking band Q.
    pub const EQ_Q: (f32, f32) = (0.1, 18.0);
    /// Compressor threshold, dB.
    pub const THRESHOLD_DB: (f32, f32) = (-60.0, 0.0);
    /// Compressor knee, dB.
    pub const KNEE_DB: (f32, f32) = (0.0, 40.0);
    /// Compressor ratio.
    pub const RATIO: (f32, f32) = (1.0, 20.0);
    /// Compressor attack, seconds.
    pub const ATTACK_SEC: (f32, f32) = (0.001, 0.2);
    /// Compressor release, seconds.
    pub const RELEASE_SEC: (f32, f32) = (0.01, 1.0);
    /// Multiband makeup gain, dB.
    pub const MAKEUP_DB: (f32, f32) = (-12.0, 12.0);
    /// Multiband crossover, Hz.
    pub const CROSSOVER_HZ: (f32, f32) = (20.0, 20000.0);
    /// Saturator drive.
    pub const DRIVE: (f32, f32) = (0.0, 1.0);
    /// Limiter ceiling, dB.
    pub const CEILING_DB: (f32, f32) = (-12.0, 0.0);
    /// Limiter release, seconds.
    pub const LIMITER_RELEASE_SEC: (f32, f32) = (0.01, 0.5);
    /// Reverb wet mix.
    pub const MIX: (f32, f32) = (0.0, 1.0);
    /// Reverb decay, seconds.
    pub const DECAY_SEC: (f32, f32) = (0.1, 5.0);
    /// Reverb pre-delay, seconds.
    pub const PRE_DELAY_SEC: (f32, f32) = (0.0, 0.5);
    /// Reverb damping, Hz.
    pub const DAMPING_HZ: (f32, f32) = (500.0, 20000.0);
    /// Stereo width.
    pub const WIDTH: (f32, f32) = (0.0, 2.0);
    /// Master volume, linear.
    pub const MASTER_VOLUME: (f32, f32) = (0.0, 1.5);
}

/// Accumulates violations so a single pass reports all of them.
#[derive(Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn range(&mut self, param: impl Into<String>, value: f32, (min, max): (f32, f32)) {
        let param = param.into();
        if !value.is_finite() {
            self.errors.push(ValidationError::NonFinite { param });
        } else if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                param,
                value,
                min,
                max,
            });
        }
    }

    fn compressor(&mut self, prefix: &str, p: &CompressorParams) {
        self.range(format!("{prefix}.threshold_db"), p.threshold_db, ranges::THRESHOLD_DB);
        self.range(format!("{prefix}.knee_db"), p.knee_db, ranges::KNEE_DB);
        self.range(format!("{prefix}.ratio"), p.ratio, ranges::RATIO);
        self.range(format!("{prefix}.attack_sec"), p.attack_sec, ranges::ATTACK_SEC);
        self.range(format!("{prefix}.release_sec"), p.release_sec, ranges::RELEASE_SEC);
    }

    fn band(&mut self, prefix: &str, p: &BandParams) {
        self.compressor(prefix, &p.compressor());
        self.range(format!("{prefix}.makeup_gain_db"), p.makeup_gain_db, ranges::MAKEUP_DB);
    }

    fn eq(&mut self, bands: &[EqBand]) {
        for band in bands {
            let prefix = format!("eq.{}", band.id);
            self.range(format!("{prefix}.gain_db"), band.gain_db, ranges::EQ_GAIN_DB);
            self.range(
                format!("{prefix}.frequency_hz"),
                band.frequency_hz,
                ranges::EQ_FREQUENCY_HZ,
            );
            if let Some(q) = band.q_factor {
                self.range(format!("{prefix}.q_factor"), q, ranges::EQ_Q);
            }
        }
    }

    fn multiband(&mut self, p: &MultibandParams) {
        self.range(
            "multiband.crossover_low_mid_hz",
            p.crossover_low_mid_hz,
            ranges::CROSSOVER_HZ,
        );
        self.range(
            "multiband.crossover_mid_high_hz",
            p.crossover_mid_high_hz,
            ranges::CROSSOVER_HZ,
        );
        if p.crossover_low_mid_hz >= p.crossover_mid_high_hz {
            self.errors.push(ValidationError::CrossoverOrder {
                low_mid: p.crossover_low_mid_hz,
                mid_high: p.crossover_mid_high_hz,
            });
        }
        self.band("multiband.low_band", &p.low_band);
        self.band("multiband.mid_band", &p.mid_band);
        self.band("multiband.high_band", &p.high_band);
    }

    fn saturator(&mut self, p: &SaturatorParams) {
        self.range("saturator.drive", p.drive, ranges::DRIVE);
    }

    fn limiter(&mut self, p: &LimiterParams) {
        self.range("limiter.ceiling_db", p.ceiling_db, ranges::CEILING_DB);
        self.range("limiter.release_sec", p.release_sec, ranges::LIMITER_RELEASE_SEC);
    }

    fn reverb(&mut self, p: &ReverbParams) {
        self.range("reverb.mix", p.mix, ranges::MIX);
        self.range("reverb.decay_sec", p.decay_sec, ranges::DECAY_SEC);
        self.range("reverb.pre_delay_sec", p.pre_delay_sec, ranges::PRE_DELAY_SEC);
        self.range("reverb.damping_hz", p.damping_hz, ranges::DAMPING_HZ);
    }

    fn stereo(&mut self, p: &StereoExpanderParams) {
        self.range("stereo.width", p.width, ranges::WIDTH);
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

impl MasteringParams {
    /// Check every field against its documented range.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut checker = Checker::default();
        checker.eq(&self.eq);
        checker.compressor("compressor", &self.compressor);
        checker.multiband(&self.multiband);
        checker.saturator(&self.saturator);
        checker.limiter(&self.limiter);
        checker.reverb(&self.reverb);
        checker.stereo(&self.stereo);
        checker.range("master_volume", self.master_volume, ranges::MASTER_VOLUME);
        checker.finish()
    }
}
