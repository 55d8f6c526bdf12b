//! Admission predicates.

use crate::domain::{WorkInfo, WorkRecord};
use crate::error::CodeError;

/// Pre-admission filter, consulted before the overseer. Pure.
pub trait Skipper: Send + Sync {
    /// `(true, cause)` skips the unit; the cause reaches the skip hook.
    fn should_skip(&self, work: &WorkInfo) -> (bool, Option<CodeError>);
}

/// Re-execution decision for units the overseer reports as done. Pure.
/// Conditions change between runs; a prior success is not always final.
pub trait Redo: Send + Sync {
    /// `(true, cause)` re-admits the unit despite the prior record.
    fn should_redo(&self, work: &WorkInfo, prior: &WorkRecord) -> (bool, Option<CodeError>);
}
