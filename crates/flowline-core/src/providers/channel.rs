//! Channel-fed work source: another task supplies the units.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::domain::WorkInfo;
use crate::ports::{Supply, WorkProvider};

/// Pulls units from an mpsc channel; the stream ends when every sender is
/// dropped. Lets a flow consume work discovered concurrently (a directory
/// walk, a listing API) without buffering it all first.
pub struct ChannelWorkProvider {
    rx: Mutex<mpsc::Receiver<WorkInfo>>,
}

impl ChannelWorkProvider {
    pub fn new(rx: mpsc::Receiver<WorkInfo>) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    /// Convenience pair: a sender for the feeding task and the provider.
    pub fn bounded(capacity: usize) -> (mpsc::Sender<WorkInfo>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl WorkProvider for ChannelWorkProvider {
    async fn provide(&self) -> Supply {
        match self.rx.lock().await.recv().await {
            Some(work) => Supply::Item(work),
            None => Supply::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_channel_then_exhausts() {
        let (tx, provider) = ChannelWorkProvider::bounded(4);

        tx.send(WorkInfo::new("a", serde_json::json!(1)))
            .await
            .unwrap();
        tx.send(WorkInfo::new("b", serde_json::json!(2)))
            .await
            .unwrap();
        drop(tx);

        match provider.provide().await {
            Supply::Item(w) => assert_eq!(w.data(), "a"),
            other => panic!("unexpected supply: {other:?}"),
        }
        assert!(matches!(provider.provide().await, Supply::Item(_)));
        assert!(matches!(provider.provide().await, Supply::Exhausted));
    }
}
