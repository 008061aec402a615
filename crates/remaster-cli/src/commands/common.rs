//! Shared CLI helpers used across multiple commands.

use anyhow::{Context, anyhow, bail};
use clap::Args;
use remaster_config::{BandId, MasteringParams, Preset, load_params};
use std::path::{Path, PathBuf};
use toml::Value;

/// Where a command's mastering parameters come from.
#[derive(Args, Debug, Default)]
pub struct ParamSource {
    /// Preset or parameter file (TOML)
    #[arg(short, long)]
    pub preset: Option<PathBuf>,

    /// Override one parameter (e.g. "reverb.mix=0.2", "eq.highShelf=2.5")
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val, number_of_values = 1)]
    pub overrides: Vec<(String, String)>,
}

impl ParamSource {
    /// Defaults, then the preset file, then every override in order.
    ///
    /// The result is validated; out-of-range values are an error.
    pub fn resolve(&self) -> anyhow::Result<MasteringParams> {
        let mut params = match &self.preset {
            Some(path) => load_preset_params(path)?,
            None => MasteringParams::default(),
        };
        for (key, value) in &self.overrides {
            params = apply_override(&params, key, value)?;
        }
        params.validate().context("invalid mastering parameters")?;
        Ok(params)
    }
}

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid parameter format: '{}' (expected key=value)",
            s
        ));
    }
    Ok((parts[0].trim().to_string(), parts[1].trim().to_string()))
}

/// Accepts either a named preset (with a `[params]` table) or a bare
/// parameter file.
fn load_preset_params(path: &Path) -> anyhow::Result<MasteringParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let table: toml::Table =
        toml::from_str(&text).with_context(|| format!("{} is not valid TOML", path.display()))?;
    if table.contains_key("params") {
        let preset = Preset::from_toml(&text)
            .with_context(|| format!("cannot load preset {}", path.display()))?;
        tracing::debug!(name = %preset.name, "loaded preset");
        return Ok(preset.params);
    }
    load_params(path).with_context(|| format!("cannot load parameters from {}", path.display()))
}

/// Return `params` with the dotted `key` set to `value`.
///
/// `eq.<band>` sets that band's gain. Any other key addresses a field of the
/// parameter file, e.g. `compressor.ratio` or `multiband.low_band.makeup_gain_db`.
pub fn apply_override(params: &MasteringParams, key: &str, value: &str) -> anyhow::Result<MasteringParams> {
    if let Some(band) = key.strip_prefix("eq.") {
        let band = band.strip_suffix(".gain_db").unwrap_or(band);
        let id: BandId = band.parse().map_err(|e: String| anyhow!(e))?;
        let gain_db: f32 = value
            .parse()
            .with_context(|| format!("'{value}' is not a number (for {key})"))?;
        let mut out = params.clone();
        out.set_eq_gain(id, gain_db);
        return Ok(out);
    }

    let mut root = Value::Table(toml::from_str::<toml::Table>(&params.to_toml()?)?);
    let mut node = &mut root;
    for part in key.split('.') {
        node = node
            .as_table_mut()
            .and_then(|t| t.get_mut(part))
            .ok_or_else(|| anyhow!("unknown parameter '{key}'"))?;
    }
    *node = match &*node {
        Value::Boolean(_) => Value::Boolean(
            value
                .parse()
                .with_context(|| format!("'{value}' is not true or false (for {key})"))?,
        ),
        Value::Float(_) | Value::Integer(_) => Value::Float(
            value
                .parse()
                .with_context(|| format!("'{value}' is not a number (for {key})"))?,
        ),
        Value::String(_) => Value::String(value.to_string()),
        _ => bail!("'{key}' is a group of parameters, not a single value"),
    };
    Ok(root.try_into()?)
}
