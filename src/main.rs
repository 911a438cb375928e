use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    siterecon::logging::init().context("init logging")?;

    let cli = siterecon::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        siterecon::cli::Command::Crawl(args) => {
            siterecon::crawl::run(args).await.context("crawl")?;
        }
    }

    Ok(())
}
