//! Run store
//!
//! Records the narration a game sends (`context`) and the actions the server
//! forced during a run, as two JSON array files that CI can upload as
//! artifacts. Sessions only see the [`Store`] trait.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sink for run records. Failures are the implementation's problem; callers
/// never see them.
pub trait Store: Send + Sync {
    fn context_add(&self, message: &str, source: &str, game: &str, silent: bool);

    fn actions_add(&self, action: &str, source: &str, reason: Option<&str>);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl Store for NullStore {
    fn context_add(&self, _message: &str, _source: &str, _game: &str, _silent: bool) {}

    fn actions_add(&self, _action: &str, _source: &str, _reason: Option<&str>) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub timestamp: String,
    pub message: String,
    pub source: String,
    pub game: String,
    pub silent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub timestamp: String,
    pub action: String,
    pub source: String,
    pub reason: Option<String>,
}

/// Store backed by two JSON files in one directory.
///
/// All sessions share one instance; the mutex serializes the
/// read-modify-write of each file.
#[derive(Debug)]
pub struct JsonStore {
    context_path: PathBuf,
    actions_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Create the directory and pick file names for this run.
    /// Files are created lazily on the first record.
    pub fn new(dir: &Path, run_id: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%d-%m-%Y_%H-%M-%S");
        let prefix = format!("vicky_{}_{}", stamp, run_id);
        Ok(Self {
            context_path: dir.join(format!("{}_context-store.json", prefix)),
            actions_path: dir.join(format!("{}_actions-store.json", prefix)),
            lock: Mutex::new(()),
        })
    }

    pub fn context_path(&self) -> &Path {
        &self.context_path
    }

    pub fn actions_path(&self) -> &Path {
        &self.actions_path
    }

    /// Everything recorded as context so far
    pub fn context(&self) -> Vec<ContextEntry> {
        let _guard = self.lock.lock();
        read_entries(&self.context_path)
    }

    /// Everything recorded as actions so far
    pub fn actions(&self) -> Vec<ActionEntry> {
        let _guard = self.lock.lock();
        read_entries(&self.actions_path)
    }

    fn append<T: Serialize + for<'de> Deserialize<'de>>(&self, path: &Path, entry: T) {
        let _guard = self.lock.lock();
        let mut entries: Vec<T> = read_entries(path);
        entries.push(entry);

        let result = serde_json::to_string_pretty(&entries)
            .map_err(std::io::Error::from)
            .and_then(|json| fs::write(path, json));
        if let Err(e) = result {
            tracing::warn!("Failed to write store {}: {}", path.display(), e);
        }
    }
}

/// A missing or unreadable file counts as empty
fn read_entries<T: for<'de> Deserialize<'de>>(path: &Path) -> Vec<T> {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Store for JsonStore {
    fn context_add(&self, message: &str, source: &str, game: &str, silent: bool) {
        let entry = ContextEntry {
            timestamp: timestamp(),
            message: message.to_string(),
            source: source.to_string(),
            game: game.to_string(),
            silent,
        };
        self.append(&self.context_path, entry);
    }

    fn actions_add(&self, action: &str, source: &str, reason: Option<&str>) {
        let entry = ActionEntry {
            timestamp: timestamp(),
            action: action.to_string(),
            source: source.to_string(),
            reason: reason.map(str::to_string),
        };
        self.append(&self.actions_path, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_paths_carry_run_id() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "run42").unwrap();

        let context = store.context_path().file_name().unwrap().to_string_lossy();
        let actions = store.actions_path().file_name().unwrap().to_string_lossy();
        assert!(context.starts_with("vicky_"));
        assert!(context.ends_with("_run42_context-store.json"));
        assert!(actions.ends_with("_run42_actions-store.json"));
    }

    #[test]
    fn test_context_entries_accumulate() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "local").unwrap();
        assert!(store.context().is_empty());

        store.context_add("Hello", "game", "Vicky", false);
        store.context_add("Quiet", "game", "Vicky", true);

        let entries = store.context();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "Hello");
        assert!(!entries[0].silent);
        assert_eq!(entries[1].message, "Quiet");
        assert_eq!(entries[1].game, "Vicky");
    }

    #[test]
    fn test_action_entries_keep_reason() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "local").unwrap();

        store.actions_add("jump", "vicky", Some("Pick a move"));
        store.actions_add("duck", "vicky", None);

        let entries = store.actions();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason.as_deref(), Some("Pick a move"));
        assert_eq!(entries[1].reason, None);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "local").unwrap();
        fs::write(store.context_path(), "not json").unwrap();

        store.context_add("fresh", "game", "Vicky", true);
        assert_eq!(store.context().len(), 1);
    }
}
