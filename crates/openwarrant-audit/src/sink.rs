//! External audit sinks
//!
//! The ledger itself is in-memory. Sinks receive each record after it has
//! been chained, so durable storage can live outside the process.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::record::AuditRecord;
use crate::{AuditError, Result};

/// Receives every record appended to a ledger
pub trait AuditSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> String;

    /// Persist or forward one record
    fn write(&self, record: &AuditRecord) -> Result<()>;
}

/// Appends records to a file, one JSON object per line
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlFileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AuditError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlFileSink {
    fn name(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }

    fn write(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| AuditError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// Read back a JSONL audit file written by [`JsonlFileSink`]
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| AuditError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(AuditError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_chain_integrity, AuditContent, AuditLedger};
    use openwarrant_types::Decision;
    use std::sync::Arc;

    #[test]
    fn test_jsonl_sink_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = Arc::new(JsonlFileSink::open(&path).unwrap());
        let ledger = AuditLedger::new().with_sink(sink);

        for decision in [Decision::Authorized, Decision::NoWarrant] {
            ledger.append(AuditContent {
                agent_id: "agent".to_string(),
                warrant_id: None,
                action: "read".to_string(),
                decision,
                conditions: vec![],
                correlation_id: Some("corr".to_string()),
            });
        }

        let restored = read_jsonl(&path).unwrap();
        assert_eq!(restored, ledger.records());
        assert!(verify_chain_integrity(&restored));
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("audit.jsonl");
        assert!(matches!(JsonlFileSink::open(&path), Err(AuditError::Io { .. })));
    }
}
