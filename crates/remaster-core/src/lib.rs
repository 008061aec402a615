//! Remaster Core - DSP primitives for the mastering chain
//!
//! Everything here is allocation-free once constructed, so stages can run
//! on the audio callback thread.
//!
//! # Contents
//!
//! - [`AudioBuffer`] - planar PCM, one `Vec<f32>` per channel
//! - [`Effect`] - a mono sample processor the stages build on
//! - [`LinearSmoothedParam`] - gains and mixes that ramp instead of jumping
//! - [`Biquad`] with RBJ coefficient helpers, and [`OnePole`] for damping
//! - [`DelayLine`] - fractional pre-delay
//! - [`EnvelopeFollower`] - attack/release level detection for dynamics
//! - [`Oversampled`] - runs a nonlinear [`Effect`] at 2× or 4× the rate
//!
//! # no_std Support
//!
//! Disable the default `std` feature to use the primitives on targets
//! without an operating system:
//!
//! ```toml
//! [dependencies]
//! remaster-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod buffer;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod math;
pub mod one_pole;
pub mod oversample;
pub mod param;

pub use biquad::{
    Biquad, Coefficients, allpass_coefficients, high_shelf_coefficients, highpass_coefficients,
    low_shelf_coefficients, lowpass_coefficients, peaking_eq_coefficients,
};
pub use buffer::{AudioBuffer, BufferError, MAX_CHANNELS};
pub use delay::DelayLine;
pub use effect::Effect;
pub use envelope::EnvelopeFollower;
pub use math::{DB_FLOOR_LINEAR, db_to_linear, flush_denormal, linear_to_db};
pub use one_pole::OnePole;
pub use oversample::Oversampled;
pub use param::LinearSmoothedParam;
