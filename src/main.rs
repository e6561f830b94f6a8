use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use friendship_faucet::config::{
    Cli,
    Command,
    FaucetConfig,
};
use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const LOG_FILE_PREFIX: &str = "friendship-faucet.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The TUI owns the terminal, so logs go to a daily file instead.
fn init_file_tracing(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
    fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {e}"))?;
    Ok(guard)
}

fn init_stderr_tracing() -> Result<()> {
    fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = FaucetConfig::from_cli(&cli);
    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let _guard = init_file_tracing(&cli.log_dir)?;
            tracing::info!(
                contract = %config.contract_address,
                rpc = %config.rpc_url,
                "starting friendship-faucet"
            );
            client::run_app(config).await
        }
        command => {
            init_stderr_tracing()?;
            client::run_command(config, command).await
        }
    }
}
