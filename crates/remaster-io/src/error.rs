//! Error type for rendering, export and session control.

use std::path::PathBuf;

use remaster_config::ConfigError;
use remaster_effects::GraphError;

/// Errors produced by the I/O layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be decoded into PCM.
    #[error("cannot decode {path}: {reason}")]
    Decode {
        /// File that failed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// WAV container error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The processing graph could not be built or updated.
    #[error("processing graph error: {0}")]
    Graph(#[from] GraphError),

    /// Parameters or presets could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Offline render failed; nothing was written.
    #[error("render failed: {0}")]
    Render(String),

    /// Playback could not be resumed.
    #[error("cannot resume playback: {0}")]
    Resume(String),

    /// No source is open.
    #[error("no source is open")]
    NoSession,

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The source or requested output format is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// True for errors the caller may retry or report without tearing down
    /// the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Resume(_))
    }
}

/// Convenience result type for the I/O layer.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let decode = Error::Decode {
            path: PathBuf::from("a.wav"),
            reason: "truncated".into(),
        };
        assert!(decode.is_recoverable());
        assert!(Error::Resume("device busy".into()).is_recoverable());
        assert!(!Error::NoSession.is_recoverable());
        assert!(!Error::Render("nan".into()).is_recoverable());
        assert!(!Error::Graph(GraphError::InvalidSampleRate(0)).is_recoverable());
    }

    #[test]
    fn test_display() {
        let e = Error::Decode {
            path: PathBuf::from("song.wav"),
            reason: "bad header".into(),
        };
        assert_eq!(e.to_string(), "cannot decode song.wav: bad header");
    }
}
