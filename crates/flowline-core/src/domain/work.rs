//! Work unit carried from provider to worker.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One unit of work, immutable after creation.
///
/// `data` is the raw textual line describing the unit. It doubles as the
/// deduplication key for overseers and as the identifier in logs. `work` is
/// the opaque domain payload a provider parsed out of the line; `None`
/// signals "unparsable input" so the engine can still record a terminal
/// skip/fail against the originating line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkInfo {
    data: String,
    work: Option<serde_json::Value>,
}

impl WorkInfo {
    pub fn new(data: impl Into<String>, work: serde_json::Value) -> Self {
        Self {
            data: data.into(),
            work: Some(work),
        }
    }

    /// A unit whose payload could not be assembled; still participates in
    /// skip/fail reporting under its raw line.
    pub fn unparsed(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            work: None,
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn work(&self) -> Option<&serde_json::Value> {
        self.work.as_ref()
    }

    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }
}

impl fmt::Display for WorkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

/// Domain result attached to a completed unit.
///
/// Implementations decide what "valid" means; the engine only asks. A
/// record with an invalid (or absent) result and no error of its own gets
/// the batch error as a fallback.
pub trait FlowResult: fmt::Debug + Send + Sync {
    fn is_valid(&self) -> bool;

    /// Short human rendering, used by record stores and logs.
    fn summary(&self) -> String {
        format!("{self:?}")
    }
}

/// Shared handle to a domain result.
pub type SharedResult = Arc<dyn FlowResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsed_has_no_payload() {
        let w = WorkInfo::unparsed("bad line");
        assert!(!w.has_work());
        assert_eq!(w.data(), "bad line");
    }

    #[test]
    fn display_is_raw_data() {
        let w = WorkInfo::new("a\tb", serde_json::json!({"key": "b"}));
        assert_eq!(w.to_string(), "a\tb");
    }
}
