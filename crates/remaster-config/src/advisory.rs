//! Textual parameter snapshot for an external advice service.
//!
//! The engine never parses advice: it hands over a prompt built from the
//! user's description and a snapshot of the current settings, and whatever
//! text comes back is shown as-is.

use std::fmt;

use thiserror::Error;

use crate::params::MasteringParams;

/// Standing instructions sent along with every advisory request.
pub const ADVISORY_SYSTEM_PROMPT: &str = "\
You are an audio mastering assistant. The user describes their track or the sound they want, \
followed by their current settings. Suggest concrete, practical adjustments using only these tools:
- EQ: five bands (Lows 80Hz shelf, Low Mids 250Hz, Mids 1kHz, High Mids 4kHz, Highs 6kHz shelf), gain -15 to +15 dB.
- Multiband compressor: on/off, crossovers near 250Hz and 3kHz, per band threshold, knee, ratio, attack, release, makeup gain.
- Compressor: threshold, knee, ratio, attack, release.
- Tape saturation: on/off, drive 0-100%.
- Reverb: mix 0-100%, decay in seconds, pre-delay 0-500ms, damping 500-20000Hz.
- Stereo expander: width 0% (mono) to 200%.
- Limiter: ceiling in dBFS and release in seconds.
- Master volume.
Keep the answer short, use bullet points, and explain briefly why each change helps. Do not output JSON.";

/// Errors an advisory service can report.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// The service is not configured or reachable.
    #[error("advisory service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an error.
    #[error("advisory request failed: {0}")]
    Failed(String),
}

/// One request to an advice service.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryRequest {
    /// Free text from the user.
    pub description: String,
    /// Rendered parameter snapshot.
    pub snapshot: String,
}

impl AdvisoryRequest {
    /// Build a request from the user's text and the current parameters.
    pub fn new(description: impl Into<String>, params: &MasteringParams) -> Self {
        Self {
            description: description.into(),
            snapshot: params.snapshot().to_string(),
        }
    }

    /// The full prompt text.
    pub fn prompt(&self) -> String {
        format!("User description: \"{}\".\n{}", self.description, self.snapshot)
    }
}

/// Anything that turns an [`AdvisoryRequest`] into free-form advice.
pub trait AdvisoryService {
    /// Return natural-language suggestions for `request`.
    fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

/// Display adapter rendering the parameter snapshot.
pub struct Snapshot<'a>(&'a MasteringParams);

impl MasteringParams {
    /// The textual snapshot of the settings an advice service sees.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot(self)
    }
}

impl fmt::Display for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0;
        let eq = p
            .eq
            .iter()
            .map(|b| format!("{}: {:.1}dB", b.label, b.gain_db))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "Current EQ settings: {eq}.")?;
        writeln!(
            f,
            "Compressor: Threshold {:.1}dB, Ratio {:.1}:1, Attack {:.3}s, Release {:.3}s.",
            p.compressor.threshold_db,
            p.compressor.ratio,
            p.compressor.attack_sec,
            p.compressor.release_sec
        )?;
        writeln!(
            f,
            "Reverb: Mix {:.0}%, Decay {:.1}s.",
            p.reverb.mix * 100.0,
            p.reverb.decay_sec
        )?;
        writeln!(f, "Stereo Expander: Width {:.0}%.", p.stereo.width * 100.0)?;
        writeln!(f, "Limiter Ceiling: {:.1}dB.", p.limiter.ceiling_db)?;
        write!(f, "Master Volume: {:.0}%.", p.master_volume * 100.0)
    }
}
