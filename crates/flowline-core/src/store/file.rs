//! JSON-lines record file: the durable overseer.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FlowResult, WorkInfo, WorkRecord};
use crate::error::CodeError;
use crate::ports::Overseer;

/// One persisted outcome. Append-only on disk; on load, the last line per
/// key wins, so re-done work simply overwrites its earlier entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    key: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<StoredResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    err: Option<CodeError>,
    done_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResult {
    valid: bool,
    summary: String,
}

/// A prior result rehydrated from the record file. Carries only validity
/// and the stored summary; the original domain result is gone.
#[derive(Debug, Clone)]
pub struct RecordedResult {
    valid: bool,
    summary: String,
}

impl FlowResult for RecordedResult {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn summary(&self) -> String {
        self.summary.clone()
    }
}

struct FileOverseerState {
    records: HashMap<String, StoredRecord>,
    log: File,
}

/// Overseer persisting to a local JSON-lines file.
///
/// The whole file is loaded into a map at open; `work_done` appends a line
/// and flushes before updating the map, so a crash loses at most the entry
/// being written. Writes are serialized by the interior lock.
pub struct FileOverseer {
    state: Mutex<FileOverseerState>,
}

impl FileOverseer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CodeError> {
        let path = path.as_ref();
        let mut records = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(path).map_err(CodeError::local_io)?);
            for line in reader.lines() {
                let line = line.map_err(CodeError::local_io)?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StoredRecord>(&line) {
                    Ok(record) => {
                        records.insert(record.key.clone(), record);
                    }
                    Err(e) => tracing::warn!("skipping corrupt record line: {e}"),
                }
            }
        }

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(CodeError::local_io)?;

        Ok(Self {
            state: Mutex::new(FileOverseerState { records, log }),
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("overseer lock").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rehydrate(stored: &StoredRecord) -> WorkRecord {
        WorkRecord {
            work_info: WorkInfo::unparsed(stored.key.clone()),
            result: stored.result.as_ref().map(|r| {
                Arc::new(RecordedResult {
                    valid: r.valid,
                    summary: r.summary.clone(),
                }) as Arc<dyn FlowResult>
            }),
            err: stored.err.clone(),
        }
    }
}

#[async_trait]
impl Overseer for FileOverseer {
    async fn record_if_done(&self, work: &WorkInfo) -> Option<WorkRecord> {
        let state = self.state.lock().expect("overseer lock");
        state.records.get(work.data()).map(Self::rehydrate)
    }

    async fn work_done(&self, record: &WorkRecord) {
        let stored = StoredRecord {
            key: record.work_info.data().to_string(),
            success: record.is_success(),
            result: record.result.as_ref().map(|r| StoredResult {
                valid: r.is_valid(),
                summary: r.summary(),
            }),
            err: record.err.clone(),
            done_at: Utc::now(),
        };

        let mut state = self.state.lock().expect("overseer lock");
        match serde_json::to_string(&stored) {
            Ok(line) => {
                if let Err(e) = writeln!(state.log, "{line}").and_then(|()| state.log.flush()) {
                    tracing::error!(key = stored.key, "record write failed: {e}");
                }
            }
            Err(e) => tracing::error!(key = stored.key, "record encode failed: {e}"),
        }
        state.records.insert(stored.key.clone(), stored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Done;

    impl FlowResult for Done {
        fn is_valid(&self) -> bool {
            true
        }

        fn summary(&self) -> String {
            "done".to_string()
        }
    }

    fn work(key: &str) -> WorkInfo {
        WorkInfo::new(key, serde_json::json!({}))
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        {
            let overseer = FileOverseer::open(&path).unwrap();
            overseer
                .work_done(&WorkRecord::success(work("a"), Arc::new(Done)))
                .await;
            overseer
                .work_done(&WorkRecord::fail(
                    work("b"),
                    CodeError::new(crate::error::ErrorCode(500), "server"),
                ))
                .await;
        }

        let overseer = FileOverseer::open(&path).unwrap();
        assert_eq!(overseer.len(), 2);

        let prior = overseer.record_if_done(&work("a")).await.unwrap();
        assert!(prior.is_success());
        assert_eq!(prior.result.unwrap().summary(), "done");

        let prior = overseer.record_if_done(&work("b")).await.unwrap();
        assert!(!prior.is_success());
        assert_eq!(prior.err.unwrap().desc, "server");
    }

    #[tokio::test]
    async fn last_entry_per_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        {
            let overseer = FileOverseer::open(&path).unwrap();
            overseer
                .work_done(&WorkRecord::fail(work("a"), CodeError::param_missing("x")))
                .await;
            overseer
                .work_done(&WorkRecord::success(work("a"), Arc::new(Done)))
                .await;
        }

        let overseer = FileOverseer::open(&path).unwrap();
        assert_eq!(overseer.len(), 1);
        assert!(overseer.record_if_done(&work("a")).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        {
            let overseer = FileOverseer::open(&path).unwrap();
            overseer
                .work_done(&WorkRecord::success(work("a"), Arc::new(Done)))
                .await;
        }
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json\n")
            .unwrap();

        let overseer = FileOverseer::open(&path).unwrap();
        assert_eq!(overseer.len(), 1);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let overseer = FileOverseer::open(dir.path().join("records.jsonl")).unwrap();
        assert!(overseer.record_if_done(&work("nope")).await.is_none());
    }
}
