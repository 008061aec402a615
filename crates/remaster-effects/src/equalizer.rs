//! Five-band mastering equalizer.
//!
//! A low shelf, three peaking bells and a high shelf, applied in series from
//! low to high. Band frequency, type and Q are fixed when the stage is built;
//! only gain moves at runtime. Gain changes ramp linearly over one control
//! frame, and the band's coefficients are recomputed every sample while the
//! ramp runs so there is no step in the response.

use remaster_config::{BandId, EqBand, FilterType};
use remaster_core::{
    AudioBuffer, Biquad, Coefficients, LinearSmoothedParam, high_shelf_coefficients,
    low_shelf_coefficients, peaking_eq_coefficients,
};

use crate::error::{StageError, check_nyquist};
use crate::{CONTROL_FRAME, Stage};

#[derive(Debug, Clone)]
struct Band {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    gain: LinearSmoothedParam,
    filters: Vec<Biquad>,
}

impl Band {
    fn coefficients(&self, gain_db: f32, sample_rate: f32) -> Coefficients {
        match self.filter_type {
            FilterType::LowShelf => low_shelf_coefficients(self.frequency, gain_db, sample_rate),
            FilterType::Peaking => {
                peaking_eq_coefficients(self.frequency, self.q, gain_db, sample_rate)
            }
            FilterType::HighShelf => {
                high_shelf_coefficients(self.frequency, gain_db, sample_rate)
            }
        }
    }

    fn apply_gain(&mut self, gain_db: f32, sample_rate: f32) {
        let coefficients = self.coefficients(gain_db, sample_rate);
        for filter in &mut self.filters {
            filter.set(coefficients);
        }
    }
}

/// Serial five-band equalizer.
#[derive(Debug, Clone)]
pub struct Equalizer {
    sample_rate: f32,
    bands: Vec<Band>,
}

impl Equalizer {
    /// Build the equalizer for `num_channels` channels.
    ///
    /// Fails if any band frequency is at or above Nyquist.
    pub fn new(sample_rate: f32, num_channels: usize, bands: &[EqBand; 5]) -> Result<Self, StageError> {
        let mut built = Vec::with_capacity(bands.len());
        for band in bands {
            check_nyquist("equalizer", band.frequency_hz, sample_rate)?;
            let mut b = Band {
                filter_type: band.filter_type,
                frequency: band.frequency_hz,
                q: band.q(),
                gain: LinearSmoothedParam::with_ramp(band.gain_db, CONTROL_FRAME as u32),
                filters: vec![Biquad::new(); num_channels],
            };
            b.apply_gain(band.gain_db, sample_rate);
            built.push(b);
        }
        Ok(Self {
            sample_rate,
            bands: built,
        })
    }

    /// Ramp one band's gain to `gain_db`.
    pub fn set_gain(&mut self, id: BandId, gain_db: f32) {
        if let Some(band) = self.bands.get_mut(id.index()) {
            band.gain.set_target(gain_db);
        }
    }

    /// Target gain of a band in dB.
    pub fn gain(&self, id: BandId) -> f32 {
        self.bands.get(id.index()).map_or(0.0, |b| b.gain.target())
    }

    /// Normalized coefficients `[b0, b1, b2, a1, a2]` of each band.
    pub fn coefficients(&self) -> Vec<[f32; 5]> {
        self.bands
            .iter()
            .filter_map(|b| b.filters.first().map(Biquad::normalized))
            .collect()
    }
}

impl Stage for Equalizer {
    type Params = [EqBand; 5];

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let frames = buffer.frames();
        let channels = buffer.channels_mut();

        for i in 0..frames {
            for band in &mut self.bands {
                if !band.gain.is_settled() {
                    let gain_db = band.gain.advance();
                    band.apply_gain(gain_db, self.sample_rate);
                }
            }
            for (c, channel) in channels.iter_mut().enumerate() {
                let mut x = channel[i];
                for band in &mut self.bands {
                    x = band.filters[c].process(x);
                }
                channel[i] = x;
            }
        }
    }

    fn update(&mut self, params: &[EqBand; 5]) {
        for band in params {
            self.set_gain(band.id, band.gain_db);
        }
    }

    fn reset(&mut self) {
        let sample_rate = self.sample_rate;
        for band in &mut self.bands {
            band.gain.snap_to_target();
            band.apply_gain(band.gain.get(), sample_rate);
            for filter in &mut band.filters {
                filter.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| 0.25 * (2.0 * PI * freq * i as f32 / 48000.0).sin())
            .collect();
        AudioBuffer::from_planar(vec![samples], 48000).unwrap()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = Equalizer::new(48000.0, 1, &EqBand::default_bands()).unwrap();
        let mut buffer = sine(440.0, 4800);
        let reference = buffer.clone();
        eq.process(&mut buffer);
        for (a, b) in buffer.channel(0).iter().zip(reference.channel(0)) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mid_boost() {
        let mut bands = EqBand::default_bands();
        bands[BandId::Mid.index()].gain_db = 6.0;
        let mut eq = Equalizer::new(48000.0, 1, &bands).unwrap();
        let mut buffer = sine(1000.0, 9600);
        let input_rms = rms(&buffer.channel(0)[4800..]);
        eq.process(&mut buffer);
        let gain = 20.0 * (rms(&buffer.channel(0)[4800..]) / input_rms).log10();
        assert!((gain - 6.0).abs() < 0.5, "gain {gain}");
    }

    #[test]
    fn test_gain_change_ramps_over_control_frame() {
        let mut eq = Equalizer::new(48000.0, 1, &EqBand::default_bands()).unwrap();
        eq.set_gain(BandId::LowShelf, 12.0);
        let mut buffer = AudioBuffer::new(1, CONTROL_FRAME / 2, 48000).unwrap();
        eq.process(&mut buffer);
        assert!(!eq.bands[0].gain.is_settled());
        let mid = eq.bands[0].gain.get();
        assert!(mid > 0.0 && mid < 12.0);

        let mut buffer = AudioBuffer::new(1, CONTROL_FRAME, 48000).unwrap();
        eq.process(&mut buffer);
        assert_eq!(eq.bands[0].gain.get(), 12.0);
    }

    #[test]
    fn test_band_above_nyquist_fails() {
        let mut bands = EqBand::default_bands();
        bands[4].frequency_hz = 9000.0;
        let err = Equalizer::new(16000.0, 2, &bands).unwrap_err();
        assert!(matches!(err, StageError::FrequencyAboveNyquist { .. }));
    }

    #[test]
    fn test_update_only_moves_gain() {
        let mut eq = Equalizer::new(48000.0, 2, &EqBand::default_bands()).unwrap();
        let mut bands = EqBand::default_bands();
        bands[1].gain_db = -3.0;
        bands[1].frequency_hz = 500.0;
        eq.update(&bands);
        eq.reset();
        assert_eq!(eq.gain(BandId::LowMid), -3.0);
        assert_eq!(eq.bands[1].frequency, 250.0);
    }
}
