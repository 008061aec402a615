//! Error types for stage and graph construction.

use remaster_config::ValidationError;
use thiserror::Error;

/// A single stage could not be wired at the requested configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    /// A filter frequency is at or above half the sample rate.
    #[error("{stage}: {frequency} Hz is at or above Nyquist ({nyquist} Hz)")]
    FrequencyAboveNyquist {
        /// Stage that owns the filter.
        stage: &'static str,
        /// Requested frequency in Hz.
        frequency: f32,
        /// Half the sample rate.
        nyquist: f32,
    },

    /// The stage cannot run at this sample rate.
    #[error("{stage}: sample rate {sample_rate} Hz exceeds the supported maximum of {max} Hz")]
    SampleRateTooHigh {
        /// Stage name.
        stage: &'static str,
        /// Requested sample rate.
        sample_rate: u32,
        /// Largest supported sample rate.
        max: u32,
    },
}

/// Errors from building or driving a [`ProcessingGraph`](crate::ProcessingGraph).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// Sample rate of zero.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count outside 1..=MAX_CHANNELS.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),

    /// A required stage failed to build.
    #[error("required stage failed: {0}")]
    Stage(#[from] StageError),

    /// Parameters rejected by validation.
    #[error("invalid parameters: {0}")]
    Params(#[from] ValidationError),

    /// Buffer channel count differs from the graph's.
    #[error("buffer has {actual} channels, graph was built for {expected}")]
    ChannelMismatch {
        /// Channels the graph was built for.
        expected: usize,
        /// Channels in the buffer handed to `process`.
        actual: usize,
    },
}

/// Checks `frequency` against the Nyquist limit of `sample_rate`.
pub(crate) fn check_nyquist(
    stage: &'static str,
    frequency: f32,
    sample_rate: f32,
) -> Result<(), StageError> {
    let nyquist = sample_rate / 2.0;
    if frequency >= nyquist {
        Err(StageError::FrequencyAboveNyquist {
            stage,
            frequency,
            nyquist,
        })
    } else {
        Ok(())
    }
}
