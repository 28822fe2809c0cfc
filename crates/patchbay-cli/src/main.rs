//! patchbay CLI - loads, inspects and runs patches.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use patchbay_config::{EngineConfig, default_engine_config_path};

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "patchbay dataflow engine CLI", long_about = None)]
struct Cli {
    /// Engine settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available boxes, or describe one
    Boxes(commands::boxes::BoxesArgs),

    /// Print the boxes and links of a patch
    Info(commands::info::InfoArgs),

    /// Run the signal graph of a patch and report every peak~ box
    Run(commands::run::RunArgs),
}

/// Explicit `--config` must load; the default file is optional.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match explicit {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => {
            let path = default_engine_config_path();
            if path.is_file() {
                Ok(EngineConfig::load(&path)?)
            } else {
                Ok(EngineConfig::default())
            }
        }
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.log_level);
    patchbay_boxes::register_standard_boxes();

    match cli.command {
        Commands::Boxes(args) => commands::boxes::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Run(args) => commands::run::run(args, &config),
    }
}
