//! Remaster CLI - master, preview and inspect audio files.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "remaster")]
#[command(author, version, about = "Audio mastering chain CLI", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a file through the mastering chain and export it
    #[command(alias = "render")]
    Master(commands::master::MasterArgs),

    /// Play a file through the mastering chain with live meters
    Play(commands::play::PlayArgs),

    /// Report levels, loudness and spectrum peaks of a file
    Analyze(commands::analyze::AnalyzeArgs),

    /// Show, validate and save mastering parameters
    Params(commands::params::ParamsArgs),

    /// Print the advisory prompt for the current settings
    Advise(commands::advise::AdviseArgs),

    /// List audio output devices
    Devices,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Master(args) => commands::master::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Params(args) => commands::params::run(args),
        Commands::Advise(args) => commands::advise::run(args),
        Commands::Devices => commands::devices::run(),
    }
}
