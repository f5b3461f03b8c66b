//! Append-only JSON Lines audit log, one record per cycle

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::probe::ProbeResult;

pub const MESSAGE_PREVIEW_LIMIT: usize = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: String,
    pub state: String,
    pub transition: String,
    pub notified: bool,
    pub restart_attempted: bool,
    pub restart_ok: bool,
    pub message_preview: String,
    pub counters: BTreeMap<String, u32>,
    pub results: Vec<ProbeResult>,
}

pub fn message_preview(message: &str) -> String {
    message.chars().take(MESSAGE_PREVIEW_LIMIT).collect()
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file is opened and closed per record so readers can tail it freely.
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(transition: &str) -> AuditRecord {
        AuditRecord {
            ts: "2026-01-01 00:00:00 +00:00".to_string(),
            state: "HEALTHY".to_string(),
            transition: transition.to_string(),
            notified: false,
            restart_attempted: false,
            restart_ok: false,
            message_preview: String::new(),
            counters: BTreeMap::new(),
            results: vec![ProbeResult::success("openclaw_health", 0, 4, "{}")],
        }
    }

    #[test]
    fn test_append_writes_one_line_per_record() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let log = AuditLog::new(temp.path().join("logs").join("healthd.jsonl"));

        log.append(&record("steady"))?;
        log.append(&record("recovered"))?;

        let content = fs::read_to_string(log.path())?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: AuditRecord = serde_json::from_str(lines[1])?;
        assert_eq!(second.transition, "recovered");
        assert_eq!(second.results[0].layer, "openclaw_health");
        Ok(())
    }

    #[test]
    fn test_result_fields_use_snake_case() -> anyhow::Result<()> {
        let line = serde_json::to_string(&record("steady"))?;
        assert!(line.contains("\"latency_ms\":4"));
        assert!(line.contains("\"raw_excerpt\":\"{}\""));
        assert!(line.contains("\"message_preview\""));
        Ok(())
    }

    #[test]
    fn test_message_preview_is_capped() {
        let long = "a".repeat(500);
        assert_eq!(message_preview(&long).len(), MESSAGE_PREVIEW_LIMIT);
        assert_eq!(message_preview("short"), "short");
    }
}
