mod cli;
mod config;
mod env;
mod notify;
mod observability;
mod workflow;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    let layout = config::ProjectLayout::resolve(cli.project_dir.as_deref())?;
    let services_dir = config::resolve_services_dir(cli.services_dir.as_deref())?;

    env::builder::ensure_environment(&layout, cli.skip_deps)?;
    workflow::installer::install(&layout, &services_dir)?;

    Ok(())
}
