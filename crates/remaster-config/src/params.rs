//! Mastering parameter types and their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Q of the three peaking EQ bands.
pub const PEAKING_Q: f32 = 1.2;

/// Identifier of one of the five fixed EQ bands, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BandId {
    /// 80 Hz low shelf.
    LowShelf,
    /// 250 Hz bell.
    LowMid,
    /// 1 kHz bell.
    Mid,
    /// 4 kHz bell.
    HighMid,
    /// 6 kHz high shelf.
    HighShelf,
}

impl BandId {
    /// All bands in processing order.
    pub const ALL: [BandId; 5] = [
        BandId::LowShelf,
        BandId::LowMid,
        BandId::Mid,
        BandId::HighMid,
        BandId::HighShelf,
    ];

    /// Position of the band in the EQ array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in presets and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            BandId::LowShelf => "lowShelf",
            BandId::LowMid => "lowMid",
            BandId::Mid => "mid",
            BandId::HighMid => "highMid",
            BandId::HighShelf => "highShelf",
        }
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BandId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown EQ band '{s}' (expected one of: lowShelf, lowMid, mid, highMid, highShelf)"
                )
            })
    }
}

/// Response shape of an EQ band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Boost or cut below the band frequency.
    LowShelf,
    /// Bell around the band frequency.
    Peaking,
    /// Boost or cut above the band frequency.
    HighShelf,
}

/// One equalizer band. Only `gain_db` changes during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Band identifier.
    pub id: BandId,
    /// Corner or center frequency in Hz.
    pub frequency_hz: f32,
    /// Gain in dB.
    pub gain_db: f32,
    /// Filter response.
    pub filter_type: FilterType,
    /// Bandwidth for peaking bands; shelves ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_factor: Option<f32>,
    /// Human readable label.
    pub label: String,
}

impl EqBand {
    fn new(id: BandId, frequency_hz: f32, filter_type: FilterType, label: &str) -> Self {
        Self {
            id,
            frequency_hz,
            gain_db: 0.0,
            filter_type,
            q_factor: (filter_type == FilterType::Peaking).then_some(PEAKING_Q),
            label: label.to_string(),
        }
    }

    /// The Q the filter is built with.
    pub fn q(&self) -> f32 {
        self.q_factor.unwrap_or(PEAKING_Q)
    }

    /// The five fixed bands at 0 dB.
    pub fn default_bands() -> [EqBand; 5] {
        [
            EqBand::new(BandId::LowShelf, 80.0, FilterType::LowShelf, "Lows (80Hz)"),
            EqBand::new(BandId::LowMid, 250.0, FilterType::Peaking, "Low Mids (250Hz)"),
            EqBand::new(BandId::Mid, 1000.0, FilterType::Peaking, "Mids (1kHz)"),
            EqBand::new(BandId::HighMid, 4000.0, FilterType::Peaking, "High Mids (4kHz)"),
            EqBand::new(BandId::HighShelf, 6000.0, FilterType::HighShelf, "Highs (6kHz)"),
        ]
    }
}

/// Feed-forward compressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Level where compression begins, in dB.
    pub threshold_db: f32,
    /// Width of the soft knee centered on the threshold, in dB.
    pub knee_db: f32,
    /// Input/output slope above the knee (>= 1).
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack_sec: f32,
    /// Release time in seconds.
    pub release_sec: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 4.0,
            attack_sec: 0.003,
            release_sec: 0.25,
        }
    }
}

/// One multiband sub-band: a compressor plus makeup gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandParams {
    /// Level where compression begins, in dB.
    pub threshold_db: f32,
    /// Soft knee width, in dB.
    pub knee_db: f32,
    /// Compression ratio (>= 1).
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack_sec: f32,
    /// Release time in seconds.
    pub release_sec: f32,
    /// Gain applied after compression, in dB.
    pub makeup_gain_db: f32,
}

impl BandParams {
    fn with_times(attack_sec: f32, release_sec: f32) -> Self {
        Self {
            attack_sec,
            release_sec,
            ..Self::default()
        }
    }

    /// The dynamics part of the band.
    pub fn compressor(&self) -> CompressorParams {
        CompressorParams {
            threshold_db: self.threshold_db,
            knee_db: self.knee_db,
            ratio: self.ratio,
            attack_sec: self.attack_sec,
            release_sec: self.release_sec,
        }
    }
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            knee_db: 30.0,
            ratio: 3.0,
            attack_sec: 0.005,
            release_sec: 0.1,
            makeup_gain_db: 0.0,
        }
    }
}

/// Three-band split compressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultibandParams {
    /// Whether the stage is in the signal path.
    pub enabled: bool,
    /// Boundary between the low and mid bands, in Hz.
    pub crossover_low_mid_hz: f32,
    /// Boundary between the mid and high bands, in Hz.
    pub crossover_mid_high_hz: f32,
    /// Low band settings.
    pub low_band: BandParams,
    /// Mid band settings.
    pub mid_band: BandParams,
    /// High band settings.
    pub high_band: BandParams,
}

impl MultibandParams {
    /// Bands in low, mid, high order.
    pub fn bands(&self) -> [&BandParams; 3] {
        [&self.low_band, &self.mid_band, &self.high_band]
    }
}

impl Default for MultibandParams {
    fn default() -> Self {
        Self {
            enabled: true,
            crossover_low_mid_hz: 250.0,
            crossover_mid_high_hz: 3000.0,
            low_band: BandParams::with_times(0.01, 0.15),
            mid_band: BandParams::with_times(0.005, 0.1),
            high_band: BandParams::with_times(0.002, 0.05),
        }
    }
}

/// Tape-style saturation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturatorParams {
    /// Whether the waveshaper is in the signal path.
    pub enabled: bool,
    /// Amount of saturation, 0 to 1.
    pub drive: f32,
}

impl Default for SaturatorParams {
    fn default() -> Self {
        Self {
            enabled: false,
            drive: 0.1,
        }
    }
}

/// Output limiter. Knee, ratio and attack are fixed by the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterParams {
    /// Output ceiling in dBFS.
    pub ceiling_db: f32,
    /// Release time in seconds.
    pub release_sec: f32,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            ceiling_db: -1.0,
            release_sec: 0.05,
        }
    }
}

/// Convolution reverb with a synthesized tail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    /// Wet proportion, 0 (dry) to 1 (wet).
    pub mix: f32,
    /// Impulse response length in seconds.
    pub decay_sec: f32,
    /// Delay before the wet signal, in seconds.
    pub pre_delay_sec: f32,
    /// Lowpass corner applied to the tail, in Hz.
    pub damping_hz: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            mix: 0.0,
            decay_sec: 1.5,
            pre_delay_sec: 0.02,
            damping_hz: 6000.0,
        }
    }
}

/// Mid/side width control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoExpanderParams {
    /// 0 = mono, 1 = unchanged, 2 = doubled side signal.
    pub width: f32,
}

impl Default for StereoExpanderParams {
    fn default() -> Self {
        Self { width: 1.0 }
    }
}

/// The complete parameter set for the mastering chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteringParams {
    /// Final linear gain, 0 to 1.5.
    pub master_volume: f32,
    /// Equalizer bands, applied low to high.
    pub eq: [EqBand; 5],
    /// Single-band "glue" compressor.
    pub compressor: CompressorParams,
    /// Three-band compressor.
    pub multiband: MultibandParams,
    /// Tape saturation.
    pub saturator: SaturatorParams,
    /// Output limiter.
    pub limiter: LimiterParams,
    /// Reverb.
    pub reverb: ReverbParams,
    /// Stereo width (stereo sources only).
    pub stereo: StereoExpanderParams,
}

impl Default for MasteringParams {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            eq: EqBand::default_bands(),
            compressor: CompressorParams::default(),
            multiband: MultibandParams::default(),
            saturator: SaturatorParams::default(),
            limiter: LimiterParams::default(),
            reverb: ReverbParams::default(),
            stereo: StereoExpanderParams::default(),
        }
    }
}

impl MasteringParams {
    /// The band with the given id.
    pub fn eq_band(&self, id: BandId) -> &EqBand {
        &self.eq[id.index()]
    }

    /// Set one band's gain in dB.
    pub fn set_eq_gain(&mut self, id: BandId, gain_db: f32) {
        self.eq[id.index()].gain_db = gain_db;
    }

    /// Parse parameters from a TOML string. Missing fields keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, crate::ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String, crate::ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_fixed_layout() {
        let bands = EqBand::default_bands();
        let freqs: Vec<f32> = bands.iter().map(|b| b.frequency_hz).collect();
        assert_eq!(freqs, vec![80.0, 250.0, 1000.0, 4000.0, 6000.0]);
        assert_eq!(bands[0].filter_type, FilterType::LowShelf);
        assert_eq!(bands[4].filter_type, FilterType::HighShelf);
        assert!(bands[1..4].iter().all(|b| b.q_factor == Some(PEAKING_Q)));
        for (band, id) in bands.iter().zip(BandId::ALL) {
            assert_eq!(band.id, id);
            assert_eq!(band.gain_db, 0.0);
        }
    }

    #[test]
    fn test_band_id_parse() {
        assert_eq!("highShelf".parse::<BandId>(), Ok(BandId::HighShelf));
        assert_eq!("LOWMID".parse::<BandId>(), Ok(BandId::LowMid));
        assert!("air".parse::<BandId>().is_err());
    }

    #[test]
    fn test_set_eq_gain() {
        let mut params = MasteringParams::default();
        params.set_eq_gain(BandId::Mid, -3.0);
        assert_eq!(params.eq_band(BandId::Mid).gain_db, -3.0);
        assert_eq!(params.eq_band(BandId::LowMid).gain_db, 0.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params = MasteringParams::from_toml(
            r#"
master_volume = 0.8

[reverb]
mix = 0.15

[multiband.low_band]
ratio = 2.5
makeup_gain_db = 1.5
"#,
        )
        .unwrap();
        assert_eq!(params.master_volume, 0.8);
        assert_eq!(params.reverb.mix, 0.15);
        assert_eq!(params.reverb.decay_sec, 1.5);
        assert_eq!(params.multiband.low_band.ratio, 2.5);
        assert_eq!(params.multiband.low_band.threshold_db, -18.0);
        assert_eq!(params.multiband.low_band.makeup_gain_db, 1.5);
        assert_eq!(params.eq, EqBand::default_bands());
    }

    #[test]
    fn test_toml_serializes_band_ids_camel_case() {
        let toml = MasteringParams::default().to_toml().unwrap();
        assert!(toml.contains("id = \"lowShelf\""), "{toml}");
        assert!(toml.contains("filter_type = \"peaking\""), "{toml}");
    }
}
