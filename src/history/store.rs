//! Stored session summaries.
//!
//! The device keeps the summaries a user chooses to save. Each entry is the
//! summary log a session emitted when it ended; live logs are never stored.

use crate::core::SampleLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// History of kept sessions, oldest first.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<SampleLog>,
    /// Path for persisting entries
    persist_path: Option<PathBuf>,
}

impl SessionHistory {
    /// Create an empty in-memory history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history backed by `path`, loading any entries already stored there.
    pub fn with_persistence(path: PathBuf) -> Result<Self, HistoryError> {
        let mut history = Self::new();
        history.persist_path = Some(path);
        history.load()?;
        Ok(history)
    }

    /// Keep a session summary.
    ///
    /// Each session can only be kept once.
    pub fn add(&mut self, summary: SampleLog) -> Result<(), HistoryError> {
        if !summary.is_summary() {
            return Err(HistoryError::NotASummary);
        }
        if self.contains(summary.session_id()) {
            return Err(HistoryError::DuplicateSession(summary.session_id()));
        }

        debug!(session_id = %summary.session_id(), "Session kept");
        self.entries.push(summary);
        Ok(())
    }

    /// Remove the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<SampleLog, HistoryError> {
        if index >= self.entries.len() {
            return Err(HistoryError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Forget every stored session.
    pub fn clear(&mut self) {
        info!(count = self.entries.len(), "Session history cleared");
        self.entries.clear();
    }

    pub fn get(&self, index: usize) -> Option<&SampleLog> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[SampleLog] {
        &self.entries
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.session_id() == session_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save entries to disk. A no-op for in-memory histories.
    pub fn save(&self) -> Result<(), HistoryError> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedHistory {
                sessions: self.entries.clone(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), HistoryError> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedHistory = serde_json::from_str(&content)?;
                self.entries = persisted.sessions;
            }
        }
        Ok(())
    }
}

/// On-disk format.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    sessions: Vec<SampleLog>,
    last_updated: DateTime<Utc>,
}

/// Errors from the session history.
#[derive(Debug)]
pub enum HistoryError {
    /// Only end-of-session summaries can be kept
    NotASummary,
    DuplicateSession(Uuid),
    IndexOutOfRange { index: usize, len: usize },
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::NotASummary => write!(f, "Only session summaries can be kept"),
            HistoryError::DuplicateSession(id) => write!(f, "Session {id} is already kept"),
            HistoryError::IndexOutOfRange { index, len } => {
                write!(f, "No session at index {index} (history has {len})")
            }
            HistoryError::Io(e) => write!(f, "IO error: {e}"),
            HistoryError::Serde(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io(e) => Some(e),
            HistoryError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(e: std::io::Error) -> Self {
        HistoryError::Io(e)
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Serde(e)
    }
}
