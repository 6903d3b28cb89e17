use super::Visibility;
use super::watcher::{WatchEvent, start_config_watcher};
use crate::core::channel::ShellChannel;
use crate::core::config::FrontendSettings;
use crate::frontend::Frontend;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::{signal as ctrl, time};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

pub type ReloadHandle =
    tracing_subscriber::reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

fn apply_log_level(handle: &ReloadHandle, level: &str) {
    match handle.reload(EnvFilter::new(level)) {
        Ok(_) => debug!(target: "azenith::monitor", "Log level set to {}", level),
        Err(e) => error!(target: "azenith::monitor", "Failed to change log level: {}", e),
    }
}

/// Runs the monitor until Ctrl-C.
///
/// `SIGUSR1` hides the front-end and `SIGUSR2` brings it back, the same
/// transitions a UI host sends on visibility changes.
pub async fn run(settings: FrontendSettings, filter_handle: ReloadHandle) -> Result<()> {
    apply_log_level(&filter_handle, &settings.monitor.log_level);

    let channel = Arc::new(
        ShellChannel::new(settings.channel.timeout_ms).with_shell(settings.channel.shell.clone()),
    );
    let frontend = Arc::new(Frontend::new(channel, &settings));

    let mut hidden = signal(SignalKind::user_defined1()).context("Failed to listen for SIGUSR1")?;
    let mut visible = signal(SignalKind::user_defined2()).context("Failed to listen for SIGUSR2")?;
    let mut watch_rx = start_config_watcher(
        PathBuf::from(&settings.paths.app_config),
        PathBuf::from(&settings.paths.gamelist),
    );
    let reload = frontend.monitor().debouncer(RELOAD_DEBOUNCE);
    let mut status_log = time::interval_at(time::Instant::now() + STATUS_LOG_INTERVAL, STATUS_LOG_INTERVAL);

    let init = frontend.init();
    tokio::pin!(init);
    let mut init_done = false;

    info!(target: "azenith::monitor", "Monitor | Started");
    loop {
        tokio::select! {
            _ = &mut init, if !init_done => {
                init_done = true;
                info!(
                    target: "azenith::monitor",
                    "Monitor | Ready: {} / {}",
                    frontend.cached_status("service"),
                    frontend.cached_status("profile")
                );
            }
            _ = hidden.recv() => {
                info!(target: "azenith::monitor", "Monitor | Hidden");
                frontend.on_visibility(Visibility::Hidden);
            }
            _ = visible.recv() => {
                info!(target: "azenith::monitor", "Monitor | Visible");
                frontend.on_visibility(Visibility::Visible);
            }
            Some(event) = watch_rx.recv() => match event {
                WatchEvent::AppConfig => {
                    let frontend = frontend.clone();
                    reload.call(async move {
                        let doc = frontend.config().load_config().await;
                        info!(target: "azenith::monitor", "App config reloaded: {} apps", doc.len());
                    });
                }
                WatchEvent::GameList => {
                    debug!(target: "azenith::monitor", "Game list changed on disk");
                }
            },
            _ = status_log.tick() => {
                for (key, value) in frontend.monitor().snapshot() {
                    debug!(target: "azenith::monitor", "{:>12}: {}", key, value);
                }
            }
            _ = ctrl::ctrl_c() => {
                info!(target: "azenith::monitor", "Monitor | Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    frontend.dispose();
    info!(target: "azenith::monitor", "Monitor | Stopped");
    Ok(())
}
