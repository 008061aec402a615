//! Preset file format and operations.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::params::MasteringParams;

/// A named, complete parameter set stored as TOML.
///
/// # TOML Format
///
/// ```toml
/// name = "Warm Master"
/// description = "Gentle glue with a touch of tape"
///
/// [params]
/// master_volume = 1.0
///
/// [params.saturator]
/// enabled = true
/// drive = 0.25
///
/// [params.reverb]
/// mix = 0.08
/// ```
///
/// Fields left out of `[params]` take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The parameter set.
    #[serde(default)]
    pub params: MasteringParams,
}

impl Preset {
    /// Create a preset holding the default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: MasteringParams::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the parameters.
    pub fn with_params(mut self, params: MasteringParams) -> Self {
        self.params = params;
        self
    }

    /// Load a preset from a TOML file and validate its parameters.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&read(path.as_ref())?)
    }

    /// Parse a preset from a TOML string and validate its parameters.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let preset: Preset = toml::from_str(toml_str)?;
        preset.params.validate()?;
        Ok(preset)
    }

    /// Save the preset to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
            }
            _ => {}
        }
        write(path, &self.to_toml()?)
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Load a bare parameter file (the `[params]` table contents at top level).
pub fn load_params(path: impl AsRef<Path>) -> Result<MasteringParams, ConfigError> {
    let params = MasteringParams::from_toml(&read(path.as_ref())?)?;
    params.validate()?;
    Ok(params)
}

/// Save a bare parameter file.
pub fn save_params(params: &MasteringParams, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    write(path.as_ref(), &params.to_toml()?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))
}

fn write(path: &Path, contents: &str) -> Result<(), ConfigError> {
    fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preset_holds_defaults() {
        let preset = Preset::new("Test Preset");
        assert_eq!(preset.name, "Test Preset");
        assert!(preset.description.is_none());
        assert_eq!(preset.params, MasteringParams::default());
    }

    #[test]
    fn missing_params_take_defaults() {
        let preset = Preset::from_toml(
            r#"
name = "Warm"
description = "tape"

[params.saturator]
enabled = true
drive = 0.25
"#,
        )
        .unwrap();
        assert_eq!(preset.name, "Warm");
        assert!(preset.params.saturator.enabled);
        assert_eq!(preset.params.saturator.drive, 0.25);
        assert_eq!(preset.params.limiter.ceiling_db, -1.0);
    }

    #[test]
    fn out_of_range_params_rejected() {
        let result = Preset::from_toml(
            r#"
name = "Broken"

[params.reverb]
decay_sec = 12.0
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn truncated_toml_rejected() {
        assert!(matches!(
            Preset::from_toml("name = "),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
