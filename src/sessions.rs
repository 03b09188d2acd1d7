//! Disk persistence for summaries and chat sessions.
//!
//! One JSON blob per deployment: userId -> rolling summary, and userId ->
//! sessionId -> session record. Writes are fire-and-forget off the response
//! path; last write wins and a crash before the flush is an accepted
//! at-most-once durability window. No schema versioning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub role: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub history: Vec<SessionMessage>,
    pub last_updated: Option<DateTime<Utc>>,
    pub message_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionData {
    summaries: HashMap<String, String>,
    sessions: HashMap<String, HashMap<String, SessionRecord>>,
}

pub struct SessionStore {
    path: PathBuf,
    data: Mutex<SessionData>,
}

impl SessionStore {
    /// Load the blob from disk, starting empty when the file is missing.
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse session data at {:?}", path))?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => SessionData::default(),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("Failed to read session data at {:?}", path))
            }
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub async fn summary(&self, user_id: &str) -> Option<String> {
        self.data.lock().await.summaries.get(user_id).cloned()
    }

    pub async fn set_summary(&self, user_id: &str, summary: String) {
        self.data
            .lock()
            .await
            .summaries
            .insert(user_id.to_string(), summary);
    }

    pub async fn append_message(
        &self,
        user_id: &str,
        session_id: &str,
        role: &str,
        text: &str,
        now: DateTime<Utc>,
    ) {
        let mut data = self.data.lock().await;
        let record = data
            .sessions
            .entry(user_id.to_string())
            .or_default()
            .entry(session_id.to_string())
            .or_default();
        record.history.push(SessionMessage {
            role: role.to_string(),
            text: text.to_string(),
            timestamp: now,
        });
        record.message_count += 1;
        record.last_updated = Some(now);
    }

    pub async fn session(&self, user_id: &str, session_id: &str) -> Option<SessionRecord> {
        self.data
            .lock()
            .await
            .sessions
            .get(user_id)
            .and_then(|sessions| sessions.get(session_id))
            .cloned()
    }

    /// Write the whole blob back to disk.
    pub async fn flush(&self) -> Result<()> {
        let snapshot = {
            let data = self.data.lock().await;
            serde_json::to_string_pretty(&*data).context("Failed to serialize session data")?
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data dir {:?}", parent))?;
        }
        tokio::fs::write(&self.path, snapshot)
            .await
            .with_context(|| format!("Failed to write session data to {:?}", self.path))?;
        Ok(())
    }

    /// Fire-and-forget flush; failures are logged, never surfaced to the
    /// response path.
    pub fn spawn_flush(self: &Arc<Self>) {
        let store = self.clone();
        tokio::spawn(async move {
            if let Err(error) = store.flush().await {
                tracing::warn!("Session flush failed: {:#}", error);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("luna_sessions.json");

        let store = SessionStore::load(path.clone()).expect("load empty");
        store.set_summary("u1", "Recently felt anxious.".to_string()).await;
        store
            .append_message("u1", DEFAULT_SESSION_ID, "user", "hello", Utc::now())
            .await;
        store
            .append_message("u1", DEFAULT_SESSION_ID, "luna", "hi!", Utc::now())
            .await;
        store.flush().await.expect("flush");

        let reloaded = SessionStore::load(path).expect("reload");
        assert_eq!(
            reloaded.summary("u1").await.as_deref(),
            Some("Recently felt anxious.")
        );
        let session = reloaded
            .session("u1", DEFAULT_SESSION_ID)
            .await
            .expect("session exists");
        assert_eq!(session.message_count, 2);
        assert_eq!(session.history.len(), 2);
        assert!(session.last_updated.is_some());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::load(dir.path().join("nope.json")).expect("load");
        assert_eq!(store.summary("anyone").await, None);
    }
}
