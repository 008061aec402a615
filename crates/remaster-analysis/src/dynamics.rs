//! Level statistics for whole signals and buffers.
//!
//! These are the offline counterparts of the live meter: plain peak and RMS
//! figures over a complete render, used by the `analyze` command and the
//! export tests.

use remaster_core::AudioBuffer;

/// Level reported for digital silence.
pub const SILENCE_DB: f32 = -200.0;

fn to_db(linear: f32) -> f32 {
    if linear > 1e-10 {
        20.0 * linear.log10()
    } else {
        SILENCE_DB
    }
}

/// Root mean square level, linear.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    (sum_sq / signal.len() as f64).sqrt() as f32
}

/// RMS level in dB.
pub fn rms_db(signal: &[f32]) -> f32 {
    to_db(rms(signal))
}

/// Largest absolute sample.
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0_f32, |acc, &x| acc.max(x.abs()))
}

/// Peak level in dB.
pub fn peak_db(signal: &[f32]) -> f32 {
    to_db(peak(signal))
}

/// Peak-to-RMS ratio.
///
/// A sine sits near 1.41; dense masters typically land between 2 and 4.
pub fn crest_factor(signal: &[f32]) -> f32 {
    let rms_val = rms(signal);
    if rms_val > 1e-10 {
        peak(signal) / rms_val
    } else {
        0.0
    }
}

/// Crest factor in dB.
pub fn crest_factor_db(signal: &[f32]) -> f32 {
    let cf = crest_factor(signal);
    if cf > 1e-10 { 20.0 * cf.log10() } else { 0.0 }
}

/// Per-channel and overall levels of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferLevels {
    /// Peak of each channel in dB.
    pub channel_peak_db: Vec<f32>,
    /// RMS of each channel in dB.
    pub channel_rms_db: Vec<f32>,
    /// Highest channel peak in dB.
    pub peak_db: f32,
    /// Crest factor of the loudest channel in dB.
    pub crest_db: f32,
}

/// Measure every channel of `buffer`.
pub fn buffer_levels(buffer: &AudioBuffer) -> BufferLevels {
    let channel_peak_db: Vec<f32> = buffer.channels().iter().map(|c| peak_db(c)).collect();
    let channel_rms_db: Vec<f32> = buffer.channels().iter().map(|c| rms_db(c)).collect();
    let loudest = channel_rms_db
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i);
    BufferLevels {
        peak_db: to_db(buffer.peak()),
        crest_db: crest_factor_db(buffer.channel(loudest)),
        channel_peak_db,
        channel_rms_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(amp: f32) -> Vec<f32> {
        (0..48000)
            .map(|i| amp * (2.0 * PI * 1000.0 * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_sine_levels() {
        let s = sine(0.5);
        assert!((peak(&s) - 0.5).abs() < 1e-3);
        assert!((rms(&s) - 0.5 / 2.0f32.sqrt()).abs() < 1e-3);
        assert!((crest_factor(&s) - 2.0f32.sqrt()).abs() < 0.01);
        assert!((crest_factor_db(&s) - 3.01).abs() < 0.05);
    }

    #[test]
    fn test_silence() {
        let s = vec![0.0; 100];
        assert_eq!(rms_db(&s), SILENCE_DB);
        assert_eq!(peak_db(&s), SILENCE_DB);
        assert_eq!(crest_factor(&s), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_buffer_levels_picks_loudest_channel() {
        let buffer = AudioBuffer::from_planar(vec![sine(0.1), sine(0.9)], 48000).unwrap();
        let levels = buffer_levels(&buffer);
        assert_eq!(levels.channel_peak_db.len(), 2);
        assert!((levels.peak_db - 20.0 * 0.9f32.log10()).abs() < 0.01);
        assert!(levels.channel_rms_db[1] > levels.channel_rms_db[0]);
        assert!((levels.crest_db - 3.01).abs() < 0.05);
    }
}
