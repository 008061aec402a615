//! Owned planar multichannel PCM buffer.
//!
//! Every stage of the mastering chain works on an [`AudioBuffer`]: one
//! `Vec<f32>` per channel, all of equal length, tagged with the sample rate.
//! Buffers are allocated once (at graph build or render start) and reused;
//! [`AudioBuffer::set_frames`] resizes within the existing capacity so the
//! live path never reallocates.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Largest channel count the chain accepts.
pub const MAX_CHANNELS: usize = 8;

/// Errors produced when constructing an [`AudioBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Zero channels, or more than [`MAX_CHANNELS`].
    ChannelCount(usize),
    /// Channels of a planar buffer differ in length.
    RaggedChannels {
        /// Length of channel 0.
        expected: usize,
        /// Length of the offending channel.
        actual: usize,
    },
    /// Interleaved data length is not a multiple of the channel count.
    PartialFrame {
        /// Total interleaved samples.
        samples: usize,
        /// Declared channel count.
        channels: usize,
    },
    /// Sample rate of zero.
    SampleRate,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelCount(n) => {
                write!(f, "unsupported channel count {n} (expected 1..={MAX_CHANNELS})")
            }
            Self::RaggedChannels { expected, actual } => write!(
                f,
                "channel length mismatch: expected {expected} frames, got {actual}"
            ),
            Self::PartialFrame { samples, channels } => write!(
                f,
                "{samples} interleaved samples do not divide into {channels} channels"
            ),
            Self::SampleRate => write!(f, "sample rate must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BufferError {}

/// Planar multichannel audio with an explicit sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a silent buffer of `frames` samples per channel.
    pub fn new(num_channels: usize, frames: usize, sample_rate: u32) -> Result<Self, BufferError> {
        check_layout(num_channels, sample_rate)?;
        Ok(Self {
            channels: vec![vec![0.0; frames]; num_channels],
            sample_rate,
        })
    }

    /// Wraps already planar channel data.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        check_layout(channels.len(), sample_rate)?;
        let expected = channels[0].len();
        if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
            return Err(BufferError::RaggedChannels {
                expected,
                actual: bad.len(),
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// De-interleaves `samples` (frame-major) into a planar buffer.
    pub fn from_interleaved(
        samples: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        check_layout(num_channels, sample_rate)?;
        if samples.len() % num_channels != 0 {
            return Err(BufferError::PartialFrame {
                samples: samples.len(),
                channels: num_channels,
            });
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &s) in channels.iter_mut().zip(frame) {
                channel.push(s);
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Interleaves the buffer into frame-major order.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.num_channels());
        for i in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Samples of one channel.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Mutable samples of one channel.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// All channels.
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// All channels, mutably.
    #[inline]
    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// Left and right channels of a stereo buffer, mutably.
    ///
    /// Returns `None` unless the buffer has exactly two channels.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match self.channels.as_mut_slice() {
            [left, right] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    /// Resizes every channel to `frames`, zero-filling new samples.
    ///
    /// Does not allocate while `frames` stays within the capacity the buffer
    /// was created with.
    pub fn set_frames(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.resize(frames, 0.0);
        }
    }

    /// Copies `frames` samples of every channel starting at `offset` in `src`.
    ///
    /// The destination is resized to the number of frames actually copied,
    /// which is shorter than `frames` at the end of `src`.
    pub fn copy_from(&mut self, src: &AudioBuffer, offset: usize, frames: usize) {
        let offset = offset.min(src.frames());
        let count = frames.min(src.frames() - offset);
        self.set_frames(count);
        for (dst, s) in self.channels.iter_mut().zip(&src.channels) {
            dst.copy_from_slice(&s[offset..offset + count]);
        }
    }

    /// Appends all frames of `other`, which must have the same channel count.
    pub fn extend_from(&mut self, other: &AudioBuffer) {
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst.extend_from_slice(src);
        }
    }

    /// Averages all channels into `out`, which is resized to `frames()`.
    pub fn mix_to_mono_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.resize(self.frames(), 0.0);
        let scale = 1.0 / self.num_channels() as f32;
        for channel in &self.channels {
            for (o, &s) in out.iter_mut().zip(channel) {
                *o += s * scale;
            }
        }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()))
    }
}

fn check_layout(num_channels: usize, sample_rate: u32) -> Result<(), BufferError> {
    if num_channels == 0 || num_channels > MAX_CHANNELS {
        return Err(BufferError::ChannelCount(num_channels));
    }
    if sample_rate == 0 {
        return Err(BufferError::SampleRate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_round_trip_layout() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, -1.0, 2.0, -2.0], 2, 48000).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), &[1.0, 2.0]);
        assert_eq!(buffer.channel(1), &[-1.0, -2.0]);
        assert_eq!(buffer.to_interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert_eq!(
            AudioBuffer::new(0, 10, 48000),
            Err(BufferError::ChannelCount(0))
        );
        assert_eq!(AudioBuffer::new(2, 10, 0), Err(BufferError::SampleRate));
        assert!(matches!(
            AudioBuffer::from_planar(vec![vec![0.0; 3], vec![0.0; 2]], 44100),
            Err(BufferError::RaggedChannels {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            AudioBuffer::from_interleaved(&[0.0; 3], 2, 44100),
            Err(BufferError::PartialFrame { .. })
        ));
    }

    #[test]
    fn test_mix_to_mono() {
        let buffer = AudioBuffer::from_planar(vec![vec![1.0, 0.5], vec![0.0, -0.5]], 48000).unwrap();
        let mut mono = Vec::new();
        buffer.mix_to_mono_into(&mut mono);
        assert_eq!(mono, vec![0.5, 0.0]);
    }

    #[test]
    fn test_copy_from_clips_at_end() {
        let src = AudioBuffer::from_planar(vec![vec![1.0, 2.0, 3.0]], 48000).unwrap();
        let mut dst = AudioBuffer::new(1, 4, 48000).unwrap();
        dst.copy_from(&src, 1, 4);
        assert_eq!(dst.channel(0), &[2.0, 3.0]);
    }

    #[test]
    fn test_stereo_mut_only_for_two_channels() {
        let mut mono = AudioBuffer::new(1, 4, 48000).unwrap();
        assert!(mono.stereo_mut().is_none());
        let mut stereo = AudioBuffer::new(2, 4, 48000).unwrap();
        assert!(stereo.stereo_mut().is_some());
    }
}
