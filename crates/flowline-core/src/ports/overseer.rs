//! Durable record of completed work.

use async_trait::async_trait;

use crate::domain::{WorkInfo, WorkRecord};

/// Remembers terminal outcomes across runs so a later flow can skip work
/// that is already done. Keyed by a stable key derived from
/// `WorkInfo::data`. Durability across crashes is the overseer's problem,
/// not the engine's; implementations serialize their own writes.
#[async_trait]
pub trait Overseer: Send + Sync {
    /// Pure lookup: the prior record for this unit, if one was stored.
    async fn record_if_done(&self, work: &WorkInfo) -> Option<WorkRecord>;

    /// Durably record a terminal outcome, success or failure.
    async fn work_done(&self, record: &WorkRecord);
}
