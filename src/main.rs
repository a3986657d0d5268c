use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    ppolona::logging::init().context("init logging")?;

    let cli = ppolona::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let api = ppolona::config::ApiConfig::from_env().context("read api config")?;
    let summary = ppolona::pipeline::run(&cli, api).context("run")?;
    tracing::debug!(?summary, "done");

    Ok(())
}
