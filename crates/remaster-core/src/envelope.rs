//! Attack/release envelope follower.
//!
//! The dynamics stages chain two of these into a decoupled peak detector:
//! a near-instant attack stage that holds peaks with the user's release,
//! followed by a stage that applies the user's attack. Each stage is the
//! branching one-pole
//!
//! ```text
//! y[n] = c * y[n-1] + (1 - c) * |x[n]|,   c = attack if |x[n]| > y[n-1] else release
//! ```
//!
//! where a time constant of `t` ms gives `c = exp(-1000 / (t * fs))`.

use libm::expf;

/// Shortest accepted attack, in ms.
pub const MIN_ATTACK_MS: f32 = 0.01;

/// Shortest accepted release, in ms.
pub const MIN_RELEASE_MS: f32 = 0.1;

/// Smoothing coefficient for a time constant of `time_ms` at `sample_rate`.
#[inline]
pub fn time_coefficient(sample_rate: f32, time_ms: f32) -> f32 {
    expf(-1000.0 / (time_ms * sample_rate))
}

/// Rectifying envelope follower with separate attack and release.
///
/// # Example
///
/// ```rust
/// use remaster_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::with_times(48000.0, 3.0, 250.0);
/// let level = env.process(-0.5);
/// assert!(level > 0.0 && level < 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
    attack: f32,
    release: f32,
    level: f32,
}

impl EnvelopeFollower {
    /// Follower with the given times, floored at [`MIN_ATTACK_MS`] and
    /// [`MIN_RELEASE_MS`].
    pub fn with_times(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let attack_ms = attack_ms.max(MIN_ATTACK_MS);
        let release_ms = release_ms.max(MIN_RELEASE_MS);
        Self {
            sample_rate,
            attack_ms,
            release_ms,
            attack: time_coefficient(sample_rate, attack_ms),
            release: time_coefficient(sample_rate, release_ms),
            level: 0.0,
        }
    }

    /// Change the attack time. The current level is kept.
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(MIN_ATTACK_MS);
        self.attack = time_coefficient(self.sample_rate, self.attack_ms);
    }

    /// Change the release time. The current level is kept.
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(MIN_RELEASE_MS);
        self.release = time_coefficient(self.sample_rate, self.release_ms);
    }

    /// Attack time in ms.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Release time in ms.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Track one sample; returns the new level.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input.abs();
        let c = if x > self.level { self.attack } else { self.release };
        self.level = c * self.level + (1.0 - c) * x;
        self.level
    }

    /// Level after the last sample.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Drop back to silence.
    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
