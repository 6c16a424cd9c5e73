use crate::domain::notification::Notification;
use crate::domain::ports::{Notifier, SnapshotStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// A thread-safe in-memory snapshot slot.
///
/// `Clone` shares the underlying slot, so a test can keep a handle and
/// inspect what the ledger wrote.
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new, empty in-memory snapshot store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `snapshot`, valid or not.
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(snapshot.into()))),
        }
    }

    pub async fn snapshot(&self) -> Option<String> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, snapshot: String) -> Result<()> {
        *self.slot.write().await = Some(snapshot);
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Collects every notification it receives, in order.
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_snapshot_store() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save("[]".to_string()).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("[]"));

        store.erase().await.unwrap();
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let store = InMemorySnapshotStore::new();
        let handle = store.clone();
        store.save("[1]".to_string()).await.unwrap();
        assert_eq!(handle.snapshot().await.as_deref(), Some("[1]"));
    }

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notification::info("a", "first"));
        notifier.notify(Notification::failure("b", "second"));

        let received = notifier.notifications();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].title, "a");
        assert!(received[1].is_destructive());
    }
}
