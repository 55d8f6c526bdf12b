//! Structured errors carried through the pipeline.
//!
//! The engine never returns errors to its caller; everything travels as a
//! [`CodeError`] attached to a work record or handed to a listener hook.
//! Only two codes mean anything to the engine itself (`PARAM_MISSING`,
//! `ALREADY_DONE`); every other value is domain-owned and passed through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric error code with an open value space.
///
/// Adapters mint their own codes (HTTP statuses, exit codes, whatever fits);
/// the engine only compares against the well-known constants below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Provider could not assemble a work unit from its input; the engine
    /// turns this into a skip instead of a failure.
    pub const PARAM_MISSING: ErrorCode = ErrorCode(101);

    /// Synthesized when the overseer reports a prior completion and no redo
    /// decision overrides it.
    pub const ALREADY_DONE: ErrorCode = ErrorCode(102);

    /// Local filesystem trouble in a provider or record store.
    pub const LOCAL_IO: ErrorCode = ErrorCode(103);
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An error with a structured code and a human description.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{desc} (code {code})")]
pub struct CodeError {
    pub code: ErrorCode,
    pub desc: String,
}

impl CodeError {
    pub fn new(code: ErrorCode, desc: impl Into<String>) -> Self {
        Self {
            code,
            desc: desc.into(),
        }
    }

    pub fn param_missing(desc: impl Into<String>) -> Self {
        Self::new(ErrorCode::PARAM_MISSING, desc)
    }

    pub fn already_done(desc: impl Into<String>) -> Self {
        Self::new(ErrorCode::ALREADY_DONE, desc)
    }

    pub fn local_io(err: std::io::Error) -> Self {
        Self::new(ErrorCode::LOCAL_IO, err.to_string())
    }

    /// Same description under a different code.
    pub fn recode(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_desc() {
        let e = CodeError::new(ErrorCode(42), "boom");
        assert_eq!(e.to_string(), "boom (code 42)");
    }

    #[test]
    fn recode_keeps_description() {
        let e = CodeError::param_missing("no key column").recode(ErrorCode::ALREADY_DONE);
        assert_eq!(e.code, ErrorCode::ALREADY_DONE);
        assert_eq!(e.desc, "no key column");
    }

    #[test]
    fn roundtrip_json() {
        let e = CodeError::already_done("seen before");
        let s = serde_json::to_string(&e).unwrap();
        let back: CodeError = serde_json::from_str(&s).unwrap();
        assert_eq!(back, e);
    }
}
