//! Application-facing facade over the monitor, the app config and the game
//! list. User-initiated actions report their outcome through a [`Notifier`].

use crate::core::channel::PrivilegedChannel;
use crate::core::config::{ConfigStore, FrontendSettings, StoreError};
use crate::core::gamelist::GameListStore;
use crate::monitor::Monitor;
pub use crate::monitor::Visibility;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sink for short user-visible messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "azenith::frontend", "{}", message);
    }
}

pub type ToggleHandler = Box<dyn Fn(bool) + Send + Sync>;

/// Anything that can host per-package on/off switches.
pub trait ToggleSurface {
    fn on_toggle(&mut self, package: &str, handler: ToggleHandler);
}

pub struct Frontend {
    monitor: Monitor,
    config: ConfigStore,
    gamelist: GameListStore,
    notifier: Arc<dyn Notifier>,
}

impl Frontend {
    pub fn new(channel: Arc<dyn PrivilegedChannel>, settings: &FrontendSettings) -> Self {
        Self::from_parts(
            Monitor::new(channel.clone(), settings),
            ConfigStore::new(channel.clone(), settings.paths.app_config.clone()),
            GameListStore::new(channel, settings.paths.gamelist.clone()),
        )
    }

    pub fn from_parts(monitor: Monitor, config: ConfigStore, gamelist: GameListStore) -> Self {
        Self {
            monitor,
            config,
            gamelist,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn gamelist(&self) -> &GameListStore {
        &self.gamelist
    }

    /// Loads the app config, then runs staged init. Safe to call again.
    pub async fn init(&self) {
        let doc = self.config.load_config().await;
        debug!(target: "azenith::frontend", "{} apps enabled", doc.len());
        self.monitor.heavy_init().await;
    }

    pub fn cached_status(&self, key: &str) -> String {
        self.monitor.cached_status(key)
    }

    pub async fn request_refresh(&self, key: &str) -> Result<String> {
        match self.monitor.request_refresh(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.notifier.notify(&format!("Refresh failed: {:#}", e));
                Err(e)
            }
        }
    }

    pub async fn set_config_field(&self, package: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let result = self.config.update_field_named(package, field, value).await;
        self.report(&result, || format!("{}: {} set to {}", package, field, value));
        result
    }

    pub async fn set_enabled(&self, package: &str, enabled: bool) -> Result<(), StoreError> {
        let result = self.config.set_enabled(package, enabled).await;
        self.report(&result, || {
            format!("{} {}", package, if enabled { "enabled" } else { "disabled" })
        });
        result
    }

    pub async fn begin_list_edit(&self) -> Result<String, StoreError> {
        let result = self.gamelist.begin_edit().await;
        if let Err(e) = &result {
            self.notifier.notify(&format!("Cannot open game list: {}", e));
        }
        result
    }

    pub fn filter_list(&self, term: &str) -> String {
        self.gamelist.filtered(term)
    }

    pub async fn merge_and_save_list(&self, edited: &str, term: &str) -> Result<usize, StoreError> {
        let result = self.gamelist.merge_and_save(edited, term).await;
        match &result {
            Ok(count) => self.notifier.notify(&format!("Saved {} packages", count)),
            Err(e) => self.notifier.notify(&format!("Failed to save game list: {}", e)),
        }
        result
    }

    pub fn on_visibility(&self, visibility: Visibility) {
        self.monitor.on_visibility(visibility);
    }

    pub fn dispose(&self) {
        self.monitor.dispose();
        self.gamelist.end_edit();
    }

    /// Wires one switch per package to `set_enabled`. The switches start in
    /// the state recorded in the loaded config.
    pub fn bind_toggles(self: &Arc<Self>, surface: &mut dyn ToggleSurface, packages: &[String]) {
        let runtime = tokio::runtime::Handle::current();
        for package in packages {
            let frontend = Arc::clone(self);
            let runtime = runtime.clone();
            let pkg = package.clone();
            surface.on_toggle(
                package,
                Box::new(move |enabled| {
                    let frontend = frontend.clone();
                    let pkg = pkg.clone();
                    runtime.spawn(async move {
                        let _ = frontend.set_enabled(&pkg, enabled).await;
                    });
                }),
            );
        }
        debug!(target: "azenith::frontend", "Bound {} toggles", packages.len());
    }

    fn report<T>(&self, result: &Result<T, StoreError>, success: impl FnOnce() -> String) {
        match result {
            Ok(_) => self.notifier.notify(&success()),
            Err(e) => {
                warn!(target: "azenith::frontend", "{}", e);
                self.notifier.notify(&format!("Failed to save: {}", e));
            }
        }
    }
}
