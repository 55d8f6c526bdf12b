//! In-memory work source, mainly for tests and embedding.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::WorkInfo;
use crate::ports::{Supply, WorkProvider};

/// Serves a fixed list of units in order, then reports exhaustion.
pub struct SliceWorkProvider {
    items: Mutex<VecDeque<Supply>>,
}

impl SliceWorkProvider {
    pub fn new(items: impl IntoIterator<Item = WorkInfo>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().map(Supply::Item).collect()),
        }
    }

    /// Full control over the pull sequence, defects and pending ticks
    /// included. Exhaustion is appended implicitly.
    pub fn scripted(supplies: impl IntoIterator<Item = Supply>) -> Self {
        Self {
            items: Mutex::new(supplies.into_iter().collect()),
        }
    }
}

#[async_trait]
impl WorkProvider for SliceWorkProvider {
    async fn provide(&self) -> Supply {
        let mut items = self.items.lock().expect("provider lock");
        items.pop_front().unwrap_or(Supply::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_in_order_then_exhausts() {
        let provider = SliceWorkProvider::new(vec![
            WorkInfo::new("a", serde_json::json!(1)),
            WorkInfo::new("b", serde_json::json!(2)),
        ]);

        match provider.provide().await {
            Supply::Item(w) => assert_eq!(w.data(), "a"),
            other => panic!("unexpected supply: {other:?}"),
        }
        match provider.provide().await {
            Supply::Item(w) => assert_eq!(w.data(), "b"),
            other => panic!("unexpected supply: {other:?}"),
        }
        assert!(matches!(provider.provide().await, Supply::Exhausted));
        // Stays exhausted on further pulls.
        assert!(matches!(provider.provide().await, Supply::Exhausted));
    }
}
