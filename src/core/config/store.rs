use super::record::{AppState, ConfigDocument, ConfigField, ConfigRecord};
use crate::core::channel::{ChannelError, PrivilegedChannel};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: ChannelError,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: ChannelError,
    },

    #[error("unknown setting `{0}`")]
    UnknownField(String),

    #[error("`{value}` is not a valid value for {field} (expected one of {allowed})")]
    InvalidValue {
        field: ConfigField,
        value: String,
        allowed: String,
    },
}

/// JSON app-config file shared with the daemon.
///
/// Every mutation re-reads the persisted document, applies one change and
/// writes the whole document back while holding the writer lock. The
/// in-memory copy only moves forward after the write succeeded.
pub struct ConfigStore {
    channel: Arc<dyn PrivilegedChannel>,
    path: String,
    current: RwLock<ConfigDocument>,
    writer: Mutex<()>,
}

impl ConfigStore {
    pub fn new(channel: Arc<dyn PrivilegedChannel>, path: impl Into<String>) -> Self {
        Self {
            channel,
            path: path.into(),
            current: RwLock::new(ConfigDocument::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last document loaded or written.
    pub fn snapshot(&self) -> ConfigDocument {
        self.current
            .read()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn is_enabled(&self, package: &str) -> bool {
        self.current
            .read()
            .map(|d| d.is_enabled(package))
            .unwrap_or(false)
    }

    pub fn record(&self, package: &str) -> Option<ConfigRecord> {
        self.current
            .read()
            .ok()
            .and_then(|d| match d.state(package) {
                AppState::Enabled(record) => Some(record.clone()),
                AppState::Disabled => None,
            })
    }

    pub fn enabled_packages(&self) -> Vec<String> {
        self.current
            .read()
            .map(|d| d.packages().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Reloads from disk. Never fails: a missing or malformed file yields an
    /// empty document, a transport failure keeps the last known one.
    pub async fn load_config(&self) -> ConfigDocument {
        match self.read_persisted().await {
            Ok(doc) => {
                debug!(target: "azenith::config", "Loaded {} app entries from {}", doc.len(), self.path);
                self.replace(doc.clone());
                doc
            }
            Err(e) => {
                warn!(target: "azenith::config", "Keeping last known app config: {}", e);
                self.snapshot()
            }
        }
    }

    pub async fn set_enabled(&self, package: &str, enabled: bool) -> Result<(), StoreError> {
        self.mutate(|doc| doc.set_enabled(package, enabled)).await?;
        info!(
            target: "azenith::config",
            "{} {}",
            if enabled { "Enabled" } else { "Disabled" },
            package
        );
        Ok(())
    }

    /// Sets one field. The package is inserted if absent, which enables it.
    pub async fn update_field(
        &self,
        package: &str,
        field: ConfigField,
        value: &str,
    ) -> Result<(), StoreError> {
        let canonical = field.normalize(value).ok_or_else(|| StoreError::InvalidValue {
            field,
            value: value.to_string(),
            allowed: field.allowed_values().join("|"),
        })?;

        self.mutate(|doc| doc.update_field(package, field, canonical))
            .await?;
        info!(target: "azenith::config", "{}: {} = {}", package, field, canonical);
        Ok(())
    }

    /// `update_field` with the field given by its on-disk name.
    pub async fn update_field_named(
        &self,
        package: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let field = field.parse::<ConfigField>().map_err(StoreError::UnknownField)?;
        self.update_field(package, field, value).await
    }

    async fn read_persisted(&self) -> Result<ConfigDocument, StoreError> {
        let content = self
            .channel
            .read_file(&self.path)
            .await
            .map_err(|source| StoreError::Transport {
                path: self.path.clone(),
                source,
            })?;

        let Some(content) = content else {
            debug!(target: "azenith::config", "{} does not exist yet", self.path);
            return Ok(ConfigDocument::new());
        };

        match ConfigDocument::from_json(&content) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(target: "azenith::config", "Malformed {}, treating as empty: {}", self.path, e);
                Ok(ConfigDocument::new())
            }
        }
    }

    async fn mutate<F>(&self, apply: F) -> Result<ConfigDocument, StoreError>
    where
        F: FnOnce(&mut ConfigDocument),
    {
        let _guard = self.writer.lock().await;

        let mut doc = self.read_persisted().await?;
        apply(&mut doc);

        let json = doc.to_json_pretty().map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;
        self.channel
            .write_file(&self.path, &json)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        self.replace(doc.clone());
        Ok(doc)
    }

    fn replace(&self, doc: ConfigDocument) {
        if let Ok(mut current) = self.current.write() {
            *current = doc;
        }
    }
}
