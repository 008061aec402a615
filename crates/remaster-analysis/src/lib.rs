//! Remaster Analysis - metering and offline signal analysis
//!
//! - [`loudness`] - Approximate momentary, short-term and integrated loudness
//! - [`spectrum`] - Smoothed display spectrum for the pre-EQ and post-chain taps
//! - [`dynamics`] - Peak, RMS and crest factor of complete signals
//! - [`resample`] - Rational sample-rate conversion for export
//! - [`fft`] - planned FFT and the Blackman window
//!
//! ## Example
//!
//! ```rust
//! use remaster_analysis::{LoudnessMeter, FRAME_LEN};
//!
//! let mut meter = LoudnessMeter::new(48000.0);
//! let tone: Vec<f32> = (0..FRAME_LEN * 8)
//!     .map(|i| 0.5 * (i as f32 * 0.05).sin())
//!     .collect();
//! meter.push_signal(&tone);
//!
//! let metrics = meter.metrics();
//! assert!(metrics.integrated_lufs < 0.0);
//! assert!(metrics.peak_db <= 0.0);
//! ```

pub mod dynamics;
pub mod fft;
pub mod loudness;
pub mod resample;
pub mod spectrum;

pub use dynamics::{BufferLevels, buffer_levels, crest_factor_db, peak_db, rms_db};
pub use fft::{Fft, blackman};
pub use loudness::{FRAME_LEN, LUFS_FLOOR, LoudnessMeter, LoudnessMetrics};
pub use resample::{resample, resample_buffer};
pub use spectrum::{SpectrumAnalyser, TapPoint};
