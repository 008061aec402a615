//! Parameter inspection, validation and saving.

use super::common::ParamSource;
use anyhow::Context;
use clap::Args;
use remaster_config::{Preset, save_params};
use std::path::PathBuf;

#[derive(Args)]
pub struct ParamsArgs {
    #[command(flatten)]
    params: ParamSource,

    /// Print as JSON instead of TOML
    #[arg(long)]
    json: bool,

    /// Save the resolved parameters to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Save as a named preset instead of a bare parameter file
    #[arg(long, requires = "save")]
    name: Option<String>,

    /// Preset description (with --name)
    #[arg(long, requires = "name")]
    description: Option<String>,
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    let params = args.params.resolve()?;

    if let Some(path) = &args.save {
        match &args.name {
            Some(name) => {
                let mut preset = Preset::new(name).with_params(params.clone());
                if let Some(description) = &args.description {
                    preset = preset.with_description(description);
                }
                preset.save(path)
            }
            None => save_params(&params, path),
        }
        .with_context(|| format!("cannot save {}", path.display()))?;
        eprintln!("Saved {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&params)?);
    } else {
        print!("{}", params.to_toml()?);
    }
    Ok(())
}
