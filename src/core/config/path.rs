use std::path::PathBuf;
pub use super::record::*;
pub use super::settings::*;
pub use super::store::*;

pub fn settings_path() -> PathBuf {
    PathBuf::from(crate::common::SETTINGS_FILE)
}

/// Settings from `path`, or from the well-known location when `None`.
pub fn load_settings(path: Option<PathBuf>) -> anyhow::Result<FrontendSettings> {
    FrontendSettings::load(path.unwrap_or_else(settings_path))
}
