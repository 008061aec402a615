//! Procedural reverb impulse response.
//!
//! A stereo burst of uniform noise under a decaying envelope:
//!
//! ```text
//! t    = i / length
//! h[i] = noise[i] · (1 - t)^2.5 · e^(-3t)
//! ```
//!
//! `length = sample_rate · decay_sec`. Below `min(nyquist, 19.9 kHz)` the
//! damping frequency runs the noise through a one-pole lowpass, which darkens
//! the whole tail evenly. At or above that ceiling damping does nothing.
//!
//! Noise comes from a seeded generator, so the same inputs always give the
//! same response.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use remaster_core::OnePole;

/// Damping at or above this frequency is a no-op.
pub const DAMPING_CEILING_HZ: f32 = 19_900.0;

/// A synthesized stereo impulse response and the settings that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    channels: [Vec<f32>; 2],
    decay_sec: f32,
    damping_hz: f32,
}

impl ImpulseResponse {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Always false; a response has at least one sample.
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    /// One channel, `0` or `1`.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index % 2]
    }

    /// Decay time the response was made for.
    pub fn decay_sec(&self) -> f32 {
        self.decay_sec
    }

    /// Damping frequency the response was made for.
    pub fn damping_hz(&self) -> f32 {
        self.damping_hz
    }
}

/// Envelope value at normalized time `t` in `[0, 1)`.
#[inline]
pub fn envelope(t: f32) -> f32 {
    (1.0 - t).powf(2.5) * (-3.0 * t).exp()
}

/// Synthesize a response.
pub fn synthesize(sample_rate: f32, decay_sec: f32, damping_hz: f32, seed: u64) -> ImpulseResponse {
    let length = ((sample_rate * decay_sec) as usize).max(1);
    let damped = damping_hz < (sample_rate / 2.0).min(DAMPING_CEILING_HZ);
    let mut rng = StdRng::seed_from_u64(seed);

    let channels = [0, 1].map(|_| {
        let mut lowpass = damped.then(|| OnePole::new(sample_rate, damping_hz));
        (0..length)
            .map(|i| {
                let noise: f32 = rng.gen_range(-1.0..=1.0);
                let noise = match lowpass.as_mut() {
                    Some(filter) => filter.process(noise),
                    None => noise,
                };
                noise * envelope(i as f32 / length as f32)
            })
            .collect()
    });

    tracing::debug!(length, decay_sec, damping_hz, damped, "synthesized impulse response");

    ImpulseResponse {
        channels,
        decay_sec,
        damping_hz,
    }
}
