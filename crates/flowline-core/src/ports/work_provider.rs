//! Work source port.

use async_trait::async_trait;

use crate::domain::WorkInfo;
use crate::error::CodeError;

/// One pull from a work source.
#[derive(Debug, Clone)]
pub enum Supply {
    /// A unit ready for admission.
    Item(WorkInfo),

    /// A per-item defect that does not terminate the stream. The engine
    /// reports a skip when `err.code == PARAM_MISSING`, a failure otherwise,
    /// then pulls again. `work` ties the defect to its originating line
    /// when the provider still has one.
    Defect {
        work: Option<WorkInfo>,
        err: CodeError,
    },

    /// Nothing this tick, but more may follow.
    Pending,

    /// The source is exhausted.
    Exhausted,
}

/// Lazy, finite source of work units.
#[async_trait]
pub trait WorkProvider: Send + Sync {
    async fn provide(&self) -> Supply;
}
