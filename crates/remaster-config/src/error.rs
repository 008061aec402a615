//! Errors raised while loading, saving or checking parameters.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationError;

/// Failure of a parameter or preset operation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter or preset file could not be read.
    #[error("cannot read parameters from '{path}': {source}")]
    ReadFile {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A parameter or preset file could not be written.
    #[error("cannot write parameters to '{path}': {source}")]
    WriteFile {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The directory for a preset could not be created.
    #[error("cannot create preset directory '{path}': {source}")]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or does not match the parameter layout.
    #[error("invalid parameter file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Parameters could not be rendered as TOML.
    #[error("cannot encode parameters: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Parameters parsed but lie outside their documented ranges.
    #[error("parameters rejected: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn read_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn create_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }
}
