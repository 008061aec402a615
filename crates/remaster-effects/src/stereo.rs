//! Mid/side stereo width.
//!
//! ```text
//! mid  = (L + R) * 0.5
//! side = (L - R) * 0.5
//! L'   = mid + width · side
//! R'   = mid - width · side
//! ```
//!
//! Width 1 leaves the buffer untouched, 0 collapses to mono, 2 doubles the
//! side signal. Anything other than two channels passes through.

use remaster_config::StereoExpanderParams;
use remaster_core::{AudioBuffer, LinearSmoothedParam};

use crate::{CONTROL_FRAME, Stage};

/// Stereo width stage.
#[derive(Debug, Clone)]
pub struct StereoExpander {
    width: LinearSmoothedParam,
}

impl StereoExpander {
    /// Create the stage.
    pub fn new(params: &StereoExpanderParams) -> Self {
        Self {
            width: LinearSmoothedParam::with_ramp(params.width, CONTROL_FRAME as u32),
        }
    }

    /// Target width.
    pub fn width(&self) -> f32 {
        self.width.target()
    }
}

impl Stage for StereoExpander {
    type Params = StereoExpanderParams;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.width.is_settled() && self.width.get() == 1.0 {
            return;
        }
        let Some((left, right)) = buffer.stereo_mut() else {
            return;
        };
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let width = self.width.advance();
            let mid = (*l + *r) * 0.5;
            let side = (*l - *r) * 0.5 * width;
            *l = mid + side;
            *r = mid - side;
        }
    }

    fn update(&mut self, params: &StereoExpanderParams) {
        self.width.set_target(params.width);
    }

    fn reset(&mut self) {
        self.width.snap_to_target();
    }
}
