use super::editor::{EditSession, to_persisted};
use crate::core::channel::PrivilegedChannel;
use crate::core::config::StoreError;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Pipe-delimited game list file plus the active edit session.
pub struct GameListStore {
    channel: Arc<dyn PrivilegedChannel>,
    path: String,
    session: Mutex<Option<EditSession>>,
    writer: tokio::sync::Mutex<()>,
}

impl GameListStore {
    pub fn new(channel: Arc<dyn PrivilegedChannel>, path: impl Into<String>) -> Self {
        Self {
            channel,
            path: path.into(),
            session: Mutex::new(None),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Persisted list, newline-delimited. A missing file is an empty list.
    pub async fn load(&self) -> Result<String, StoreError> {
        let content = self
            .channel
            .read_file(&self.path)
            .await
            .map_err(|source| StoreError::Transport {
                path: self.path.clone(),
                source,
            })?;
        Ok(super::editor::begin_edit(&content.unwrap_or_default()))
    }

    /// Starts an edit session from the persisted list and returns the full text.
    pub async fn begin_edit(&self) -> Result<String, StoreError> {
        let text = self.load().await?;
        let session = EditSession::begin(&text);
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session);
        }
        debug!(target: "azenith::gamelist", "Edit session started ({} lines)", text.lines().count());
        Ok(text)
    }

    /// Filtered view of the active session, empty when none is active.
    pub fn filtered(&self, term: &str) -> String {
        self.session
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|session| session.filtered(term)))
            .unwrap_or_default()
    }

    fn current_session(&self) -> Option<EditSession> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    /// Merges `edited` into the session baseline and writes the result.
    /// Starts a session first when none is active. Returns the number of
    /// entries written.
    pub async fn merge_and_save(&self, edited: &str, term: &str) -> Result<usize, StoreError> {
        let _guard = self.writer.lock().await;

        let session = match self.current_session() {
            Some(session) => session,
            None => {
                self.begin_edit().await?;
                self.current_session().unwrap_or_default()
            }
        };

        let merged = session.merge(edited, term);
        self.channel
            .write_file(&self.path, &to_persisted(&merged))
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(EditSession::begin(&to_persisted(&merged)));
        }
        info!(target: "azenith::gamelist", "Saved {} packages to {}", merged.len(), self.path);
        Ok(merged.len())
    }

    pub fn end_edit(&self) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = None;
        }
    }
}
