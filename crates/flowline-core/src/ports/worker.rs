//! Worker port: executes one batch at a time.

use async_trait::async_trait;

use crate::domain::{WorkInfo, WorkRecord};
use crate::error::CodeError;

/// What one `do_work` call produced.
///
/// `records` is either empty (total failure, `err` explains) or has one
/// record per batch item in positional order. `err` may accompany a full
/// record list; the engine then uses it as the fallback error for records
/// that carry neither a valid result nor an error of their own.
#[derive(Debug)]
pub struct BatchOutcome {
    pub records: Vec<WorkRecord>,
    pub err: Option<CodeError>,
}

impl BatchOutcome {
    pub fn records(records: Vec<WorkRecord>) -> Self {
        Self { records, err: None }
    }

    pub fn fail(err: CodeError) -> Self {
        Self {
            records: Vec::new(),
            err: Some(err),
        }
    }

    pub fn with_err(mut self, err: CodeError) -> Self {
        self.err = Some(err);
        self
    }
}

/// Executes batches. One instance per consumer, so implementations may
/// carry per-consumer state behind `&mut self`. Per-item failures belong in
/// the returned records, never in a panic.
#[async_trait]
pub trait Worker: Send {
    async fn do_work(&mut self, batch: &[WorkInfo]) -> BatchOutcome;
}

/// Builds one [`Worker`] per consumer at consumer start. A construction
/// failure terminates that consumer only.
#[async_trait]
pub trait WorkerProvider: Send + Sync {
    async fn provide(&self) -> Result<Box<dyn Worker>, CodeError>;
}
