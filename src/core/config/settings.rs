use crate::common::{API_DIR, APP_CONFIG_FILE, GAMELIST_FILE, VALUE_DIR};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FrontendSettings {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Per-probe polling overrides in milliseconds, keyed by probe name.
    #[serde(default)]
    pub intervals: HashMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_tick")]
    pub tick_ms: u64,

    #[serde(default = "default_hygiene_interval")]
    pub hygiene_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Interpreter for commands. Anything other than `sh` (e.g. `su`) also
    /// carries config and game-list file access.
    #[serde(default = "default_shell")]
    pub shell: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_app_config")]
    pub app_config: String,
    #[serde(default = "default_gamelist")]
    pub gamelist: String,
    #[serde(default = "default_value_dir")]
    pub value_dir: String,
    #[serde(default = "default_api_dir")]
    pub api_dir: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_ms: default_tick(),
            hygiene_interval_ms: default_hygiene_interval(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            shell: default_shell(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            app_config: default_app_config(),
            gamelist: default_gamelist(),
            value_dir: default_value_dir(),
            api_dir: default_api_dir(),
        }
    }
}

impl FrontendSettings {
    /// Load settings from TOML. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(target: "azenith::config", "{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).context(format!("Failed to parse {}", path.display()))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.monitor.tick_ms.max(1))
    }

    pub fn hygiene_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.hygiene_interval_ms.max(1))
    }

    /// Interval for `probe`, honouring an override from `[intervals]`.
    pub fn interval_for(&self, probe: &str, default_ms: u64) -> Duration {
        Duration::from_millis(self.intervals.get(probe).copied().unwrap_or(default_ms))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick() -> u64 {
    1000
}

fn default_hygiene_interval() -> u64 {
    15000
}

fn default_timeout() -> u64 {
    3000
}

fn default_shell() -> String {
    crate::core::channel::DEFAULT_SHELL.to_string()
}

fn default_app_config() -> String {
    APP_CONFIG_FILE.to_string()
}

fn default_gamelist() -> String {
    GAMELIST_FILE.to_string()
}

fn default_value_dir() -> String {
    VALUE_DIR.to_string()
}

fn default_api_dir() -> String {
    API_DIR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FrontendSettings::load(dir.path().join("frontend.toml")).unwrap();

        assert_eq!(settings.tick(), Duration::from_secs(1));
        assert_eq!(settings.hygiene_interval(), Duration::from_secs(15));
        assert_eq!(settings.paths.app_config, APP_CONFIG_FILE);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[monitor]\ntick_ms = 500\n\n[paths]\ngamelist = \"/tmp/gamelist.txt\"\n\n[intervals]\nprofile = 2000"
        )
        .unwrap();

        let settings = FrontendSettings::load(file.path()).unwrap();
        assert_eq!(settings.tick(), Duration::from_millis(500));
        assert_eq!(settings.monitor.log_level, "info");
        assert_eq!(settings.paths.gamelist, "/tmp/gamelist.txt");
        assert_eq!(settings.paths.value_dir, VALUE_DIR);
        assert_eq!(settings.interval_for("profile", 5000), Duration::from_secs(2));
        assert_eq!(settings.interval_for("service", 5000), Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor\ntick_ms = ").unwrap();

        assert!(FrontendSettings::load(file.path()).is_err());
    }
}
