//! WAV file reading and export encoding.
//!
//! Sources are read with `hound` into a planar [`AudioBuffer`]. Exports are
//! encoded by hand so the header is the plain 44-byte `RIFF`/`WAVE` layout
//! with a 16-byte PCM `fmt ` chunk at every bit depth and channel count:
//!
//! ```text
//! 0   "RIFF"  u32 36 + data_len  "WAVE"
//! 12  "fmt "  u32 16  u16 1 (PCM)  u16 channels  u32 sample_rate
//!             u32 byte_rate  u16 block_align  u16 bits
//! 36  "data"  u32 data_len  interleaved little-endian samples
//! ```
//!
//! Samples are clamped to `[-1, 1]`, scaled by `2^(bits-1) - 1` and rounded
//! half up.

use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use remaster_core::{AudioBuffer, MAX_CHANNELS};

use crate::{Error, Result};

/// Size of the export header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Stem used when the source has no usable file name.
pub const DEFAULT_STEM: &str = "mastered_track";

/// PCM bit depth of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 16-bit, scaled by 32767.
    Sixteen,
    /// 24-bit, scaled by 8388607.
    #[default]
    TwentyFour,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }

    /// Bytes per sample.
    pub fn bytes(self) -> usize {
        usize::from(self.bits() / 8)
    }

    fn scale(self) -> f64 {
        match self {
            Self::Sixteen => 32767.0,
            Self::TwentyFour => 8_388_607.0,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = Error;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(Error::UnsupportedFormat(format!(
                "{other}-bit export (expected 16 or 24)"
            ))),
        }
    }
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Samples per channel.
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Whether samples are IEEE floats.
    pub is_float: bool,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
        is_float: spec.sample_format == SampleFormat::Float,
    })
}

/// Decode a WAV file into a planar buffer.
///
/// Any decoding problem is reported as the recoverable [`Error::Decode`].
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let decode = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let reader = WavReader::open(path).map_err(|e| decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(Error::UnsupportedFormat(format!(
            "{channels} channels (expected 1..={MAX_CHANNELS})"
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode(e.to_string()))?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| decode(e.to_string()))?
        }
    };

    AudioBuffer::from_interleaved(&samples, channels, spec.sample_rate)
        .map_err(|e| decode(e.to_string()))
}

fn quantize(sample: f32, scale: f64) -> i32 {
    let clamped = f64::from(sample).clamp(-1.0, 1.0);
    (clamped * scale + 0.5).floor() as i32
}

/// Encode `buffer` as a complete WAV file in memory.
pub fn encode_wav(buffer: &AudioBuffer, depth: BitDepth) -> Result<Vec<u8>> {
    let channels = buffer.num_channels();
    let bytes = depth.bytes();
    let block_align = channels * bytes;
    let data_len = buffer.frames() * block_align;
    let riff_len = u32::try_from(36 + data_len)
        .map_err(|_| Error::UnsupportedFormat(format!("{data_len} bytes of audio exceed RIFF")))?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(channels as u16).to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    out.extend_from_slice(&(buffer.sample_rate() * block_align as u32).to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&depth.bits().to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());

    let scale = depth.scale();
    for i in 0..buffer.frames() {
        for channel in buffer.channels() {
            let value = quantize(channel[i], scale).to_le_bytes();
            out.extend_from_slice(&value[..bytes]);
        }
    }
    Ok(out)
}

/// Encode `buffer` and write it to `path` atomically.
///
/// The file is written next to `path` with a `.part` suffix and renamed into
/// place, so a failed export never leaves a partial file under `path`.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, depth: BitDepth) -> Result<()> {
    let path = path.as_ref();
    let encoded = encode_wav(buffer, depth)?;
    let part = part_path(path);

    let written = fs::write(&part, &encoded).and_then(|()| fs::rename(&part, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&part);
        return Err(e.into());
    }
    tracing::debug!(path = %path.display(), bytes = encoded.len(), "wrote wav");
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Export file name: `<stem>_<rate in kHz>kHz_<bits>bit.wav`.
pub fn export_file_name(stem: &str, sample_rate: u32, depth: BitDepth) -> String {
    let khz = f64::from(sample_rate) / 1000.0;
    format!("{stem}_{khz}kHz_{}bit.wav", depth.bits())
}

/// Source file name without its extension, or [`DEFAULT_STEM`].
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_two_frame_stereo_24bit_is_byte_exact() {
        let buffer = AudioBuffer::from_planar(vec![vec![0.5, -1.0], vec![1.5, 0.0]], 48000).unwrap();
        let bytes = encode_wav(&buffer, BitDepth::TwentyFour).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"RIFF");
        expected.extend_from_slice(&(36u32 + 12).to_le_bytes());
        expected.extend_from_slice(b"WAVEfmt ");
        expected.extend_from_slice(&[16, 0, 0, 0, 1, 0, 2, 0]);
        expected.extend_from_slice(&48000u32.to_le_bytes());
        expected.extend_from_slice(&(48000u32 * 6).to_le_bytes());
        expected.extend_from_slice(&[6, 0, 24, 0]);
        expected.extend_from_slice(b"data");
        expected.extend_from_slice(&12u32.to_le_bytes());
        // 0.5 · 8388607 = 4194303.5 rounds up to 0x400000
        expected.extend_from_slice(&[0x00, 0x00, 0x40]);
        // 1.5 clamps to 1.0 → 0x7FFFFF
        expected.extend_from_slice(&[0xFF, 0xFF, 0x7F]);
        // -1.0 → -8388607 = 0x800001
        expected.extend_from_slice(&[0x01, 0x00, 0x80]);
        expected.extend_from_slice(&[0x00, 0x00, 0x00]);

        assert_eq!(bytes.len(), WAV_HEADER_LEN + 12);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_16bit_layout() {
        let buffer = AudioBuffer::from_planar(vec![vec![1.0, -0.5]], 44100).unwrap();
        let bytes = encode_wav(&buffer, BitDepth::Sixteen).unwrap();
        assert_eq!(&bytes[22..24], &[1, 0]);
        assert_eq!(&bytes[28..32], &(44100u32 * 2).to_le_bytes());
        assert_eq!(&bytes[32..36], &[2, 0, 16, 0]);
        assert_eq!(&bytes[44..46], &32767i16.to_le_bytes());
        // -16383.5 rounds half up to -16383
        assert_eq!(&bytes[46..48], &(-16383i16).to_le_bytes());
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let left: Vec<f32> = (0..480).map(|i| (i as f32 * 0.05).sin() * 0.8).collect();
        let right: Vec<f32> = left.iter().map(|x| -x).collect();
        let buffer = AudioBuffer::from_planar(vec![left, right], 48000).unwrap();

        write_wav(&path, &buffer, BitDepth::TwentyFour).unwrap();
        assert!(!part_path(&path).exists());

        let info = read_wav_info(&path).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 24);
        assert_eq!(info.num_frames, 480);

        let loaded = read_wav(&path).unwrap();
        for (a, b) in buffer.channels().iter().zip(loaded.channels()) {
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let buffer = AudioBuffer::new(1, 10, 48000).unwrap();
        assert!(matches!(
            write_wav(&path, &buffer, BitDepth::TwentyFour),
            Err(Error::Io(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_failure_is_recoverable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        fs::write(&path, b"not a wav file").unwrap();
        let err = read_wav(&path).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("song", 48000, BitDepth::TwentyFour),
            "song_48kHz_24bit.wav"
        );
        assert_eq!(
            export_file_name("song", 44100, BitDepth::Sixteen),
            "song_44.1kHz_16bit.wav"
        );
        assert_eq!(source_stem(Path::new("/music/take 3.flac")), "take 3");
        assert_eq!(source_stem(Path::new("/")), DEFAULT_STEM);
    }

    #[test]
    fn test_bit_depth_parsing() {
        assert_eq!(BitDepth::try_from(24).unwrap(), BitDepth::TwentyFour);
        assert!(matches!(
            BitDepth::try_from(8),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    proptest! {
        #[test]
        fn quantized_samples_stay_in_range(x in prop::num::f32::ANY) {
            let v = quantize(x, BitDepth::TwentyFour.scale());
            prop_assert!((-8_388_607..=8_388_607).contains(&v));
            let v = quantize(x, BitDepth::Sixteen.scale());
            prop_assert!((-32767..=32767).contains(&v));
        }
    }
}
