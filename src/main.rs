use anyhow::{Context, Result};
use azenith::core::config::load_settings;
use azenith::monitor;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

#[derive(Parser)]
#[command(name = "azenith-monitor")]
#[command(version, about = "AZenith front-end status monitor")]
struct Args {
    /// Front-end settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let base_filter = EnvFilter::new("info");
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter);
    let timer = tracing_subscriber::fmt::time::UtcTime::new(
        time::format_description::parse("[hour]:[minute]:[second]")
            .context("Invalid log time format")?,
    );

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_level(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = load_settings(args.config)?;

    tracing::info!(
        "AZenith monitor v{} started (tick={}ms, app config={})",
        env!("CARGO_PKG_VERSION"),
        settings.monitor.tick_ms,
        settings.paths.app_config
    );

    monitor::run::run(settings, filter_handle).await
}
