//! Advisory prompt for an external mastering assistant.

use super::common::ParamSource;
use clap::Args;
use remaster_config::{ADVISORY_SYSTEM_PROMPT, AdvisoryRequest};

#[derive(Args)]
pub struct AdviseArgs {
    /// What the track sounds like, or what it should sound like
    #[arg(value_name = "DESCRIPTION")]
    description: String,

    #[command(flatten)]
    params: ParamSource,

    /// Also print the standing instructions sent with every request
    #[arg(long)]
    system: bool,
}

pub fn run(args: AdviseArgs) -> anyhow::Result<()> {
    let params = args.params.resolve()?;
    let request = AdvisoryRequest::new(args.description, &params);
    if args.system {
        println!("{ADVISORY_SYSTEM_PROMPT}\n");
    }
    println!("{}", request.prompt());
    Ok(())
}
