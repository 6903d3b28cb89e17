use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Shown for a key that is registered but has never been fetched successfully.
pub const PLACEHOLDER_INITIALIZING: &str = "Initializing";
/// Shown for a key nobody registered.
pub const PLACEHOLDER_UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub key: String,
    pub value: Option<String>,
    /// When the fetch that produced `value` was started.
    pub fetched_at: Option<Instant>,
    pub min_interval: Duration,
}

/// Last-known status values. Reads never touch the privileged channel.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    entries: Arc<RwLock<HashMap<String, StatusEntry>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the entry for `key` if it does not exist yet. A second
    /// registration keeps the existing value.
    pub fn register(&self, key: &str, min_interval: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries
                .entry(key.to_string())
                .or_insert_with(|| StatusEntry {
                    key: key.to_string(),
                    value: None,
                    fetched_at: None,
                    min_interval,
                });
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|e| e.get(key).and_then(|entry| entry.value.clone()))
    }

    pub fn entry(&self, key: &str) -> Option<StatusEntry> {
        self.entries.read().ok().and_then(|e| e.get(key).cloned())
    }

    /// Stores `value` as read at `fetched_at`. A reading older than the
    /// cached one is dropped and `false` is returned.
    pub fn set(&self, key: &str, value: String, fetched_at: Instant) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| StatusEntry {
                key: key.to_string(),
                value: None,
                fetched_at: None,
                min_interval: Duration::ZERO,
            });
        if entry.fetched_at.is_some_and(|cached| cached > fetched_at) {
            return false;
        }
        entry.value = Some(value);
        entry.fetched_at = Some(fetched_at);
        true
    }

    /// Value for display, falling back to a placeholder.
    pub fn display(&self, key: &str) -> String {
        match self.entry(key) {
            Some(StatusEntry { value: Some(v), .. }) => v,
            Some(_) => PLACEHOLDER_INITIALIZING.to_string(),
            None => PLACEHOLDER_UNKNOWN.to_string(),
        }
    }

    /// Sorted `(key, display value)` pairs.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .entries
            .read()
            .map(|e| {
                e.values()
                    .map(|entry| {
                        let shown = entry
                            .value
                            .clone()
                            .unwrap_or_else(|| PLACEHOLDER_INITIALIZING.to_string());
                        (entry.key.clone(), shown)
                    })
                    .collect()
            })
            .unwrap_or_default();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases spare map capacity. Used by the periodic hygiene hook.
    pub fn compact(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.shrink_to_fit();
            for entry in entries.values_mut() {
                if let Some(v) = entry.value.as_mut() {
                    v.shrink_to_fit();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_distinguish_unregistered_from_pending() {
        let cache = StatusCache::new();
        cache.register("profile", Duration::from_secs(5));

        assert_eq!(cache.get("profile"), None);
        assert_eq!(cache.display("profile"), PLACEHOLDER_INITIALIZING);
        assert_eq!(cache.display("kernel"), PLACEHOLDER_UNKNOWN);
    }

    #[test]
    fn set_records_value_and_timestamp() {
        let cache = StatusCache::new();
        cache.register("kernel", Duration::ZERO);
        let at = Instant::now();
        cache.set("kernel", "5.10.0".into(), at);

        let entry = cache.entry("kernel").unwrap();
        assert_eq!(entry.value.as_deref(), Some("5.10.0"));
        assert_eq!(entry.fetched_at, Some(at));
        assert_eq!(cache.display("kernel"), "5.10.0");
    }

    #[test]
    fn older_reading_does_not_replace_newer_one() {
        let cache = StatusCache::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);

        assert!(cache.set("profile", "Balanced".into(), t1));
        assert!(!cache.set("profile", "Performance".into(), t0));
        assert_eq!(cache.get("profile").as_deref(), Some("Balanced"));
        assert!(cache.set("profile", "ECO Mode".into(), t1));
        assert_eq!(cache.get("profile").as_deref(), Some("ECO Mode"));
    }

    #[test]
    fn re_registration_keeps_cached_value() {
        let cache = StatusCache::new();
        cache.register("dnd", Duration::ZERO);
        cache.set("dnd", "Enabled".into(), Instant::now());
        cache.register("dnd", Duration::from_secs(1));

        assert_eq!(cache.get("dnd").as_deref(), Some("Enabled"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_by_key() {
        let cache = StatusCache::new();
        cache.register("service", Duration::ZERO);
        cache.set("android", "14".into(), Instant::now());

        let snap = cache.snapshot();
        assert_eq!(
            snap,
            vec![
                ("android".to_string(), "14".to_string()),
                ("service".to_string(), PLACEHOLDER_INITIALIZING.to_string()),
            ]
        );
    }
}
