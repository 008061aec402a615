//! Final output gain.

use remaster_core::{AudioBuffer, LinearSmoothedParam};

use crate::{CONTROL_FRAME, Stage};

/// Linear master volume, ramped over one control frame.
#[derive(Debug, Clone)]
pub struct MasterGain {
    gain: LinearSmoothedParam,
}

impl MasterGain {
    /// Create the stage at `volume` (linear).
    pub fn new(volume: f32) -> Self {
        Self {
            gain: LinearSmoothedParam::with_ramp(volume, CONTROL_FRAME as u32),
        }
    }

    /// Target volume.
    pub fn volume(&self) -> f32 {
        self.gain.target()
    }
}

impl Stage for MasterGain {
    type Params = f32;

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.gain.is_settled() {
            let g = self.gain.get();
            if g != 1.0 {
                for channel in buffer.channels_mut() {
                    for s in channel.iter_mut() {
                        *s *= g;
                    }
                }
            }
            return;
        }
        let frames = buffer.frames();
        let channels = buffer.channels_mut();
        for i in 0..frames {
            let g = self.gain.advance();
            for channel in channels.iter_mut() {
                channel[i] *= g;
            }
        }
    }

    fn update(&mut self, volume: &f32) {
        self.gain.set_target(*volume);
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_scales() {
        let mut gain = MasterGain::new(0.5);
        let mut buffer = AudioBuffer::from_planar(vec![vec![1.0; 8]; 2], 48000).unwrap();
        gain.process(&mut buffer);
        assert!(buffer.channels().iter().flatten().all(|&s| s == 0.5));
    }

    #[test]
    fn test_volume_change_ramps() {
        let mut gain = MasterGain::new(1.0);
        gain.update(&0.0);
        let mut buffer = AudioBuffer::from_planar(vec![vec![1.0; CONTROL_FRAME]], 48000).unwrap();
        gain.process(&mut buffer);
        let ch = buffer.channel(0);
        assert!(ch[0] > 0.99);
        assert!(ch.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(ch[CONTROL_FRAME - 1], 0.0);
    }
}
