//! Work record: outcome of one unit.

use crate::domain::{SharedResult, WorkInfo};
use crate::error::CodeError;

/// Terminal outcome of one work unit.
///
/// A record is successful iff it carries no error and its result reports
/// valid. Workers return one record per batch item, positionally aligned;
/// a per-item error lives in `err`, while a whole-batch error is applied
/// afterwards as a fallback for records that have neither.
#[derive(Debug, Clone)]
pub struct WorkRecord {
    pub work_info: WorkInfo,
    pub result: Option<SharedResult>,
    pub err: Option<CodeError>,
}

impl WorkRecord {
    pub fn success(work_info: WorkInfo, result: SharedResult) -> Self {
        Self {
            work_info,
            result: Some(result),
            err: None,
        }
    }

    pub fn fail(work_info: WorkInfo, err: CodeError) -> Self {
        Self {
            work_info,
            result: None,
            err: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.err.is_none() && self.result.as_ref().is_some_and(|r| r.is_valid())
    }

    /// Adopt the batch error when this record has neither a valid result
    /// nor an error of its own.
    pub(crate) fn apply_fallback(&mut self, batch_err: &Option<CodeError>) {
        let result_ok = self.result.as_ref().is_some_and(|r| r.is_valid());
        if !result_ok && self.err.is_none() {
            self.err = batch_err.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[derive(Debug)]
    struct Valid(bool);

    impl crate::domain::FlowResult for Valid {
        fn is_valid(&self) -> bool {
            self.0
        }
    }

    fn info() -> WorkInfo {
        WorkInfo::new("w", serde_json::json!(1))
    }

    #[test]
    fn success_needs_valid_result_and_no_err() {
        let ok = WorkRecord::success(info(), std::sync::Arc::new(Valid(true)));
        assert!(ok.is_success());

        let invalid = WorkRecord::success(info(), std::sync::Arc::new(Valid(false)));
        assert!(!invalid.is_success());

        let failed = WorkRecord::fail(info(), CodeError::new(ErrorCode(7), "x"));
        assert!(!failed.is_success());
    }

    #[test]
    fn fallback_fills_only_blank_records() {
        let batch_err = Some(CodeError::new(ErrorCode(500), "batch blew up"));

        let mut blank = WorkRecord {
            work_info: info(),
            result: None,
            err: None,
        };
        blank.apply_fallback(&batch_err);
        assert_eq!(blank.err, batch_err);

        let mut ok = WorkRecord::success(info(), std::sync::Arc::new(Valid(true)));
        ok.apply_fallback(&batch_err);
        assert!(ok.err.is_none());

        let own = CodeError::new(ErrorCode(7), "mine");
        let mut failed = WorkRecord::fail(info(), own.clone());
        failed.apply_fallback(&batch_err);
        assert_eq!(failed.err, Some(own));
    }

    #[test]
    fn invalid_result_with_own_err_keeps_it() {
        let batch_err = Some(CodeError::new(ErrorCode(500), "batch"));
        let mut rec = WorkRecord {
            work_info: info(),
            result: Some(std::sync::Arc::new(Valid(false))),
            err: None,
        };
        rec.apply_fallback(&batch_err);
        assert_eq!(rec.err, batch_err);
    }
}
