use clap::Parser;

mod cli;
mod commands;
mod config;
mod seed;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = commands::resolve_config(&cli)?;

    let level = if config.config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    commands::run_command(cli, config)
}
