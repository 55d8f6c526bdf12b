//! Map-backed overseer for tests and single-run dedup.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{WorkInfo, WorkRecord};
use crate::ports::Overseer;

/// Keeps records in a map keyed by `WorkInfo::data`. Not durable.
#[derive(Default)]
pub struct InMemoryOverseer {
    records: Mutex<HashMap<String, WorkRecord>>,
}

impl InMemoryOverseer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed prior records, e.g. to simulate an earlier run.
    pub fn preloaded(records: impl IntoIterator<Item = WorkRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.work_info.data().to_string(), r))
            .collect();
        Self {
            records: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("overseer lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Overseer for InMemoryOverseer {
    async fn record_if_done(&self, work: &WorkInfo) -> Option<WorkRecord> {
        self.records
            .lock()
            .expect("overseer lock")
            .get(work.data())
            .cloned()
    }

    async fn work_done(&self, record: &WorkRecord) {
        self.records
            .lock()
            .expect("overseer lock")
            .insert(record.work_info.data().to_string(), record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodeError;

    #[tokio::test]
    async fn remembers_last_record_per_key() {
        let overseer = InMemoryOverseer::new();
        let work = WorkInfo::new("k", serde_json::json!(1));

        assert!(overseer.record_if_done(&work).await.is_none());

        overseer
            .work_done(&WorkRecord::fail(work.clone(), CodeError::param_missing("first")))
            .await;
        let prior = overseer.record_if_done(&work).await.unwrap();
        assert!(!prior.is_success());
        assert_eq!(overseer.len(), 1);
    }
}
