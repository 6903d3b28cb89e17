//! Locations agreed upon with the AZenith daemon. Changing any of these
//! breaks compatibility with the daemon that reads them.

pub const SETTINGS_FILE: &str = "/data/adb/.config/AZenith/frontend.toml";
pub const APP_CONFIG_FILE: &str = "/data/adb/.config/AZenith/gamelist/azenithApplist.json";
pub const GAMELIST_FILE: &str = "/sdcard/AZenith/config/gamelist/gamelist.txt";
pub const VALUE_DIR: &str = "/sdcard/AZenith/config/value";
pub const API_DIR: &str = "/sdcard/AZenith/config/API";
pub const SERVICE_PROCESS: &str = "sys.azenith-service";
