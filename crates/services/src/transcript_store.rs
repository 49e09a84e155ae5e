//! Day-scoped transcript persistence
//!
//! Two entries back a session: the transcript itself in a short-lived
//! (session-scoped) backend, and a "last seen" date in a durable backend
//! that only serves day-rollover detection.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::transcript::{Session, Turn};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const SESSION_KEY: &str = "naaj_chat_session";
pub const LAST_SEEN_KEY: &str = "naaj_chat_date";

/// Key/value string storage, in the spirit of a browser storage area
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Lives as long as the process
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/state`, or `./state` when no home directory exists
    pub fn default_location() -> Self {
        let dir = directories::ProjectDirs::from("com.local", "Naaj", "NaajChat")
            .map(|p| p.config_dir().join("state"))
            .unwrap_or_else(|| PathBuf::from("./state"));
        Self::new(dir)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    session_date: NaiveDate,
    turns: Vec<Turn>,
}

/// Loads and saves the transcript for the current civil day
pub struct TranscriptStore {
    session_scope: Arc<dyn StorageBackend>,
    durable: Arc<dyn StorageBackend>,
    greeting: String,
}

impl TranscriptStore {
    pub fn new(
        session_scope: Arc<dyn StorageBackend>,
        durable: Arc<dyn StorageBackend>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            session_scope,
            durable,
            greeting: greeting.into(),
        }
    }

    /// Resume today's transcript, or start a fresh one with the greeting.
    ///
    /// Never fails: unreadable or corrupt state is logged and replaced.
    pub fn load(&self, today: NaiveDate) -> Session {
        match self.last_seen() {
            Some(day) if day != today => {
                tracing::info!(last_seen = %day, %today, "day rolled over, starting a new session")
            }
            _ => {}
        }

        match self.read_stored() {
            Ok(Some(stored)) if stored.session_date == today && !stored.turns.is_empty() => {
                let session = Session::restore(stored.session_date, stored.turns);
                tracing::info!(turns = session.len(), "resumed today's session");
                session
            }
            Ok(Some(stored)) => {
                tracing::debug!(stored = %stored.session_date, "stored session is not from today");
                Session::with_greeting(today, &self.greeting)
            }
            Ok(None) => Session::with_greeting(today, &self.greeting),
            Err(e) => {
                tracing::warn!("discarding unreadable session: {:#}", e);
                Session::with_greeting(today, &self.greeting)
            }
        }
    }

    /// Persist the session. Empty transcripts are never written.
    pub fn save(&self, session: &Session) -> Result<()> {
        if session.is_empty() {
            tracing::debug!("skipping save of empty transcript");
            return Ok(());
        }
        let stored = StoredSession {
            session_date: session.date(),
            turns: session.turns().to_vec(),
        };
        let json = serde_json::to_string(&stored)?;
        self.session_scope.set(SESSION_KEY, &json)?;
        self.durable
            .set(LAST_SEEN_KEY, &serde_json::to_string(&session.date())?)?;
        Ok(())
    }

    /// The day of the most recent save, from the durable marker
    pub fn last_seen(&self) -> Option<NaiveDate> {
        let raw = match self.durable.get(LAST_SEEN_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("could not read last seen date: {:#}", e);
                return None;
            }
        };
        serde_json::from_str(&raw).ok()
    }

    fn read_stored(&self) -> Result<Option<StoredSession>> {
        let Some(raw) = self.session_scope.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let stored = serde_json::from_str(&raw).context("parsing stored session")?;
        Ok(Some(stored))
    }
}
