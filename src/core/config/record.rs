use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const DEFAULT_VALUE: &str = "default";

const SWITCH_VALUES: &[&str] = &["default", "true", "false"];
const REFRESH_VALUES: &[&str] = &["default", "60", "90", "120", "144"];
const RENDERER_VALUES: &[&str] = &["default", "vulkan", "skiagl"];

/// Per-app setting understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    PerfLiteMode,
    DndOnGaming,
    AppPriority,
    GamePreload,
    RefreshRate,
    Renderer,
}

impl ConfigField {
    pub const ALL: [ConfigField; 6] = [
        Self::PerfLiteMode,
        Self::DndOnGaming,
        Self::AppPriority,
        Self::GamePreload,
        Self::RefreshRate,
        Self::Renderer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PerfLiteMode => "perf_lite_mode",
            Self::DndOnGaming => "dnd_on_gaming",
            Self::AppPriority => "app_priority",
            Self::GamePreload => "game_preload",
            Self::RefreshRate => "refresh_rate",
            Self::Renderer => "renderer",
        }
    }

    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            Self::RefreshRate => REFRESH_VALUES,
            Self::Renderer => RENDERER_VALUES,
            _ => SWITCH_VALUES,
        }
    }

    /// Canonical spelling of `value`, matched case-insensitively.
    pub fn normalize(&self, value: &str) -> Option<&'static str> {
        let value = value.trim();
        self.allowed_values()
            .iter()
            .copied()
            .find(|allowed| allowed.eq_ignore_ascii_case(value))
    }
}

impl FromStr for ConfigField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| s.to_string())
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn default_value() -> String {
    DEFAULT_VALUE.to_string()
}

/// Settings for one app. Unknown fields are dropped on read; every known
/// field is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(default = "default_value")]
    pub perf_lite_mode: String,
    #[serde(default = "default_value")]
    pub dnd_on_gaming: String,
    #[serde(default = "default_value")]
    pub app_priority: String,
    #[serde(default = "default_value")]
    pub game_preload: String,
    #[serde(default = "default_value")]
    pub refresh_rate: String,
    #[serde(default = "default_value")]
    pub renderer: String,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            perf_lite_mode: default_value(),
            dnd_on_gaming: default_value(),
            app_priority: default_value(),
            game_preload: default_value(),
            refresh_rate: default_value(),
            renderer: default_value(),
        }
    }
}

impl ConfigRecord {
    pub fn get(&self, field: ConfigField) -> &str {
        match field {
            ConfigField::PerfLiteMode => &self.perf_lite_mode,
            ConfigField::DndOnGaming => &self.dnd_on_gaming,
            ConfigField::AppPriority => &self.app_priority,
            ConfigField::GamePreload => &self.game_preload,
            ConfigField::RefreshRate => &self.refresh_rate,
            ConfigField::Renderer => &self.renderer,
        }
    }

    pub fn set(&mut self, field: ConfigField, value: &str) {
        let slot = match field {
            ConfigField::PerfLiteMode => &mut self.perf_lite_mode,
            ConfigField::DndOnGaming => &mut self.dnd_on_gaming,
            ConfigField::AppPriority => &mut self.app_priority,
            ConfigField::GamePreload => &mut self.game_preload,
            ConfigField::RefreshRate => &mut self.refresh_rate,
            ConfigField::Renderer => &mut self.renderer,
        };
        *slot = value.to_string();
    }
}

/// Whether an app is managed, made explicit. On disk this is only the
/// presence of the package key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState<'a> {
    Disabled,
    Enabled(&'a ConfigRecord),
}

/// Package name → settings. Presence of a key means the app is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    entries: BTreeMap<String, ConfigRecord>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank input decodes to an empty document.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(content)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn state(&self, package: &str) -> AppState<'_> {
        match self.entries.get(package) {
            Some(record) => AppState::Enabled(record),
            None => AppState::Disabled,
        }
    }

    pub fn is_enabled(&self, package: &str) -> bool {
        self.entries.contains_key(package)
    }

    pub fn get(&self, package: &str) -> Option<&ConfigRecord> {
        self.entries.get(package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabling inserts defaults only when absent; disabling drops the key.
    pub fn set_enabled(&mut self, package: &str, enabled: bool) {
        if enabled {
            self.entries.entry(package.to_string()).or_default();
        } else {
            self.entries.remove(package);
        }
    }

    /// Sets one field, creating the record (and thereby enabling the app)
    /// when it is absent.
    pub fn update_field(&mut self, package: &str, field: ConfigField, value: &str) {
        self.entries
            .entry(package.to_string())
            .or_default()
            .set(field, value);
    }
}
