//! Click-free parameter ramps.
//!
//! ```rust
//! use remaster_core::LinearSmoothedParam;
//!
//! let mut gain = LinearSmoothedParam::with_ramp(1.0, 128);
//! gain.set_target(0.5);
//! for _ in 0..128 {
//!     gain.advance();
//! }
//! assert_eq!(gain.get(), 0.5);
//! ```

/// Value that walks to a new target in equal steps over a fixed number of
/// samples, then holds it exactly.
#[derive(Debug, Clone, Default)]
pub struct LinearSmoothedParam {
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
    ramp: u32,
}

impl LinearSmoothedParam {
    /// Ramp of `ramp` samples starting at `initial`. A ramp of zero jumps.
    pub fn with_ramp(initial: f32, ramp: u32) -> Self {
        Self {
            value: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp,
        }
    }

    /// Begin ramping from the present value toward `target`.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp == 0 {
            self.snap_to_target();
            return;
        }
        self.step = (target - self.value) / self.ramp as f32;
        self.remaining = self.ramp;
    }

    /// Step one sample forward and return the value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.remaining {
            0 => {}
            1 => {
                self.value = self.target;
                self.remaining = 0;
            }
            _ => {
                self.value += self.step;
                self.remaining -= 1;
            }
        }
        self.value
    }

    /// Present value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.value
    }

    /// Value being ramped toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// No ramp in progress.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }

    /// Abandon the ramp and hold the target.
    pub fn snap_to_target(&mut self) {
        self.value = self.target;
        self.step = 0.0;
        self.remaining = 0;
    }
}
