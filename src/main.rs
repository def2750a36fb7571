use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use updater_config::Config;

mod cli;
mod commands;
mod error;
mod transport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    commands::apply_overrides(&mut config, cli.database);
    init_logging(&config.log.level);

    match commands::run_command(cli.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

/// Log to stderr; stdout carries the JSON-lines output.
fn init_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
