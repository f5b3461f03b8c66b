//! Durable monitor state (JSON file persistence)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{Result, StoreError};

fn default_state() -> String {
    "HEALTHY".to_string()
}

/// The only memory that survives a daemon restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default)]
    pub counters: BTreeMap<String, u32>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            state: default_state(),
            counters: BTreeMap::new(),
        }
    }
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, empty and corrupt files all yield the default state.
    pub fn load(&self) -> PersistedState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PersistedState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state file, starting fresh");
                return PersistedState::default();
            }
        };

        if content.trim().is_empty() {
            return PersistedState::default();
        }

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt state file, starting fresh");
                PersistedState::default()
            }
        }
    }

    /// Write to a sibling temp file, then rename it over the target.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let content = serde_json::to_string(state)?;

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(&self.path)
            .map_err(|e| StoreError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_state_store_round_trip() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let store = StateStore::new(temp.path().join("state.json"));

        let mut counters = BTreeMap::new();
        counters.insert("network_probe".to_string(), 3);
        let state = PersistedState {
            state: "UNHEALTHY".to_string(),
            counters,
        };

        store.save(&state)?;
        assert_eq!(store.load(), state);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_defaults() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let store = StateStore::new(temp.path().join("absent.json"));

        let loaded = store.load();
        assert_eq!(loaded.state, "HEALTHY");
        assert!(loaded.counters.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_corrupt_file_defaults() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("state.json");
        fs::write(&path, "{ invalid json }")?;

        assert_eq!(StateStore::new(&path).load(), PersistedState::default());
        Ok(())
    }

    #[test]
    fn test_load_whitespace_only_file_defaults() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("state.json");
        fs::write(&path, "   \n  \t  ")?;

        assert_eq!(StateStore::new(&path).load(), PersistedState::default());
        Ok(())
    }

    #[test]
    fn test_load_negative_counter_defaults() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("state.json");
        fs::write(&path, r#"{"state":"UNHEALTHY","counters":{"system_probe":-2}}"#)?;

        assert_eq!(StateStore::new(&path).load(), PersistedState::default());
        Ok(())
    }

    #[test]
    fn test_load_fills_missing_fields() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("state.json");
        fs::write(&path, r#"{"counters":{"openclaw_health":1}}"#)?;

        let loaded = StateStore::new(&path).load();
        assert_eq!(loaded.state, "HEALTHY");
        assert_eq!(loaded.counters["openclaw_health"], 1);
        Ok(())
    }

    #[test]
    fn test_save_creates_parent_directories() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("nested").join("logs").join("state.json");
        let store = StateStore::new(&path);

        store.save(&PersistedState::default())?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_save_writes_flat_record() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("state.json");
        let store = StateStore::new(&path);

        let mut state = PersistedState::default();
        state.counters.insert("openclaw_status".to_string(), 2);
        store.save(&state)?;

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(value["state"], "HEALTHY");
        assert_eq!(value["counters"]["openclaw_status"], 2);
        assert_eq!(value.as_object().map(|o| o.len()), Some(2));
        Ok(())
    }

    #[test]
    fn test_save_overwrites_previous_state() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let store = StateStore::new(temp.path().join("state.json"));

        store.save(&PersistedState {
            state: "UNHEALTHY".to_string(),
            counters: BTreeMap::new(),
        })?;
        store.save(&PersistedState::default())?;

        assert_eq!(store.load().state, "HEALTHY");
        // No temp files left behind next to the state file.
        assert_eq!(fs::read_dir(temp.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_save_into_unwritable_location_errors() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "file")?;
        let store = StateStore::new(blocker.join("state.json"));

        let err = store.save(&PersistedState::default()).unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
        Ok(())
    }
}
