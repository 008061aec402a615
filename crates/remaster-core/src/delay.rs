//! Fractional delay line backing the reverb pre-delay.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Ring buffer read at a fractional offset behind the write head.
///
/// Storage is fixed at construction; changing the delay time never
/// reallocates.
///
/// ```rust
/// use remaster_core::DelayLine;
///
/// let mut line = DelayLine::from_time(48000.0, 0.5);
/// assert_eq!(line.write_read(0.25, 0.0), 0.25);
/// assert_eq!(line.write_read(1.0, 1.0), 0.25);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    ring: Vec<f32>,
    head: usize,
}

impl DelayLine {
    /// Line able to delay by up to `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: vec![0.0; capacity + 1],
            head: 0,
        }
    }

    /// Line able to delay by up to `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::with_capacity(libm::ceilf(sample_rate * max_seconds).max(0.0) as usize)
    }

    /// Longest delay in samples.
    pub fn capacity(&self) -> usize {
        self.ring.len() - 1
    }

    /// Store `sample`, then return the signal `delay` samples behind it.
    ///
    /// A delay of zero returns `sample` itself. The delay is clamped to
    /// [`capacity`](Self::capacity); the fraction interpolates linearly
    /// toward the older neighbour.
    #[inline]
    pub fn write_read(&mut self, sample: f32, delay: f32) -> f32 {
        let len = self.ring.len();
        self.ring[self.head] = sample;
        let newest = self.head;
        self.head = (self.head + 1) % len;

        let delay = delay.clamp(0.0, (len - 1) as f32);
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let at = (newest + len - whole) % len;
        let near = self.ring[at];
        if frac == 0.0 {
            return near;
        }
        let far = self.ring[(at + len - 1) % len];
        near + (far - near) * frac
    }

    /// Zero the stored history.
    pub fn clear(&mut self) {
        self.ring.fill(0.0);
        self.head = 0;
    }
}
