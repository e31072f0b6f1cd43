//! varpack - assemble multi-variant module packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use varpack_cli::cmd;
use varpack_cli::{Cli, Commands};
use varpack_core::AssemblyMode;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.global.resolve_config()?;
    let modules = cli.global.resolve_modules(&config)?;

    match cli.command {
        Commands::Build { parallel, verbose } => {
            let variants = cli.global.build_variants()?;
            cmd::build::build(&config, &modules, &variants, parallel, verbose).await
        }
        Commands::Assemble => cmd::assemble::assemble(&config, &modules, AssemblyMode::Fresh),
        Commands::Merge => cmd::assemble::assemble(&config, &modules, AssemblyMode::Merge),
        Commands::Check => cmd::check::check(&config, &modules),
    }
}
