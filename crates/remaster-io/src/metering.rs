//! Hand-off of post-chain state from the audio thread to the meters.
//!
//! The live renderer fills [`TapFrame`]s taken from a recycling pool and
//! sends them over a bounded channel; [`MeterReader`] drains them at its own
//! pace, feeds the loudness meter and both spectrum analysers, and returns
//! each frame to the pool. When the reader falls behind the pool runs dry
//! and the renderer skips ticks instead of blocking or allocating.

use crossbeam_channel::{Receiver, Sender, bounded};
use remaster_analysis::spectrum::FFT_SIZE;
use remaster_analysis::{LoudnessMeter, LoudnessMetrics, SpectrumAnalyser, TapPoint};
use remaster_effects::GainReduction;

/// Frames in flight between renderer and reader.
pub const TAP_POOL_SIZE: usize = 4;

/// Ticks per second the renderer publishes at.
pub const TAP_RATE_HZ: u32 = 60;

/// One metering tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TapFrame {
    /// Source position at the end of the tick, in frames.
    pub position: usize,
    /// Set on the first tick after a transport restart.
    pub restarted: bool,
    /// Gain reduction of every dynamics stage.
    pub gain_reduction: GainReduction,
    /// Latest [`FFT_SIZE`] source samples, mixed to mono, oldest first.
    pub pre_eq: Vec<f32>,
    /// Latest [`FFT_SIZE`] output samples, mixed to mono, oldest first.
    pub post_chain: Vec<f32>,
}

impl TapFrame {
    fn empty() -> Self {
        Self {
            position: 0,
            restarted: false,
            gain_reduction: GainReduction::default(),
            pre_eq: Vec::with_capacity(FFT_SIZE),
            post_chain: Vec::with_capacity(FFT_SIZE),
        }
    }
}

/// Audio-thread end of the tap channel.
#[derive(Debug)]
pub(crate) struct TapSender {
    frames: Sender<TapFrame>,
    pool: Receiver<TapFrame>,
}

impl TapSender {
    /// Take a recycled frame, if the reader has returned one.
    pub(crate) fn acquire(&self) -> Option<TapFrame> {
        self.pool.try_recv().ok()
    }

    /// Publish a filled frame.
    pub(crate) fn publish(&self, frame: TapFrame) {
        // capacity equals the pool size, so this only fails once the reader is gone
        let _ = self.frames.try_send(frame);
    }
}

/// Create a connected renderer/reader pair of tap endpoints.
pub(crate) fn tap_channel(sample_rate: f32) -> (TapSender, MeterReader) {
    let (frame_tx, frame_rx) = bounded(TAP_POOL_SIZE);
    let (pool_tx, pool_rx) = bounded(TAP_POOL_SIZE);
    for _ in 0..TAP_POOL_SIZE {
        let _ = pool_tx.try_send(TapFrame::empty());
    }
    (
        TapSender {
            frames: frame_tx,
            pool: pool_rx,
        },
        MeterReader::new(sample_rate, frame_rx, pool_tx),
    )
}

/// Latest meter readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    /// Loudness estimate.
    pub loudness: LoudnessMetrics,
    /// Gain reduction at the last tick.
    pub gain_reduction: GainReduction,
    /// Playback position in seconds.
    pub position_secs: f32,
}

/// Lower-priority consumer of tap frames.
#[derive(Debug)]
pub struct MeterReader {
    sample_rate: f32,
    frames: Receiver<TapFrame>,
    pool: Sender<TapFrame>,
    loudness: LoudnessMeter,
    pre_eq: SpectrumAnalyser,
    post_chain: SpectrumAnalyser,
    gain_reduction: GainReduction,
    position: usize,
}

impl MeterReader {
    fn new(sample_rate: f32, frames: Receiver<TapFrame>, pool: Sender<TapFrame>) -> Self {
        Self {
            sample_rate,
            frames,
            pool,
            loudness: LoudnessMeter::new(sample_rate),
            pre_eq: SpectrumAnalyser::new(sample_rate),
            post_chain: SpectrumAnalyser::new(sample_rate),
            gain_reduction: GainReduction::default(),
            position: 0,
        }
    }

    /// Consume every pending frame. Returns how many were read.
    pub fn poll(&mut self) -> usize {
        let mut count = 0;
        while let Ok(frame) = self.frames.try_recv() {
            self.consume(&frame);
            let _ = self.pool.try_send(frame);
            count += 1;
        }
        count
    }

    fn consume(&mut self, frame: &TapFrame) {
        if frame.restarted {
            self.reset();
        }
        self.pre_eq.analyse(&frame.pre_eq);
        self.post_chain.analyse(&frame.post_chain);
        self.loudness.push_frame(&frame.post_chain);
        self.gain_reduction = frame.gain_reduction;
        self.position = frame.position;
    }

    /// Current readings.
    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            loudness: self.loudness.metrics(),
            gain_reduction: self.gain_reduction,
            position_secs: self.position as f32 / self.sample_rate,
        }
    }

    /// Spectrum at the chosen tap.
    pub fn spectrum(&self, tap: TapPoint) -> &SpectrumAnalyser {
        match tap {
            TapPoint::PreEq => &self.pre_eq,
            TapPoint::PostChain => &self.post_chain,
        }
    }

    /// Clear loudness, spectra and gain reduction.
    pub fn reset(&mut self) {
        self.loudness.reset();
        self.pre_eq.reset();
        self.post_chain.reset();
        self.gain_reduction = GainReduction::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: f32, restarted: bool) -> TapFrame {
        TapFrame {
            position: 4800,
            restarted,
            gain_reduction: GainReduction {
                compressor: -2.0,
                multiband: [0.0; 3],
                limiter: -1.0,
            },
            pre_eq: vec![value; FFT_SIZE],
            post_chain: vec![value; FFT_SIZE],
        }
    }

    #[test]
    fn test_pool_recycles_frames() {
        let (sender, mut reader) = tap_channel(48000.0);
        for _ in 0..3 {
            let frames: Vec<_> = std::iter::from_fn(|| sender.acquire()).collect();
            assert_eq!(frames.len(), TAP_POOL_SIZE);
            for _ in frames {
                sender.publish(filled(0.5, false));
            }
            assert_eq!(reader.poll(), TAP_POOL_SIZE);
        }
    }

    #[test]
    fn test_dry_pool_skips_ticks() {
        let (sender, _reader) = tap_channel(48000.0);
        let held: Vec<_> = std::iter::from_fn(|| sender.acquire()).collect();
        assert_eq!(held.len(), TAP_POOL_SIZE);
        assert!(sender.acquire().is_none());
    }

    #[test]
    fn test_reader_feeds_meters() {
        let (sender, mut reader) = tap_channel(48000.0);
        let _ = sender.acquire();
        sender.publish(filled(0.5, false));
        reader.poll();

        let snap = reader.snapshot();
        assert!((snap.loudness.integrated_lufs - (20.0 * 0.5f32.log10() + 0.691)).abs() < 1e-3);
        assert_eq!(snap.gain_reduction.compressor, -2.0);
        assert!((snap.position_secs - 0.1).abs() < 1e-6);
        // DC lands in bin 0 of both taps
        assert!(reader.spectrum(TapPoint::PreEq).decibels()[0].is_finite());
    }

    #[test]
    fn test_restart_flag_resets_meter() {
        let (sender, mut reader) = tap_channel(48000.0);
        let _ = sender.acquire();
        sender.publish(filled(1.0, false));
        reader.poll();

        let _ = sender.acquire();
        sender.publish(filled(0.1, true));
        reader.poll();
        let snap = reader.snapshot();
        assert!((snap.loudness.peak_db - 20.0 * 0.1f32.log10()).abs() < 1e-4);
    }
}
