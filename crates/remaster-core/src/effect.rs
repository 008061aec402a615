//! Mono, sample-at-a-time processing contract.
//!
//! Whole-buffer stages live in the effects crate; this trait is for the
//! small per-sample kernels they are made of, so wrappers such as
//! [`Oversampled`](crate::Oversampled) can be generic over the kernel.

/// A per-sample processor that never allocates.
///
/// # Example
///
/// ```rust
/// use remaster_core::Effect;
///
/// struct HalfWave;
///
/// impl Effect for HalfWave {
///     fn process(&mut self, x: f32) -> f32 {
///         x.max(0.0)
///     }
///     fn set_sample_rate(&mut self, _: f32) {}
///     fn reset(&mut self) {}
/// }
///
/// let mut samples = [0.5, -0.5];
/// HalfWave.process_slice(&mut samples);
/// assert_eq!(samples, [0.5, 0.0]);
/// ```
pub trait Effect {
    /// Process one sample.
    fn process(&mut self, x: f32) -> f32;

    /// Process `samples` in place, one after another.
    fn process_slice(&mut self, samples: &mut [f32]) {
        for s in samples {
            *s = self.process(*s);
        }
    }

    /// Rate the kernel now runs at.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Forget all history; parameters stay.
    fn reset(&mut self);

    /// Delay the kernel adds, in samples at its own rate.
    fn latency_samples(&self) -> usize {
        0
    }
}
