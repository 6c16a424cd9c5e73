#![allow(dead_code)]

use async_trait::async_trait;
use escrowsim::application::ledger::{EscrowLedger, LedgerOptions};
use escrowsim::domain::fingerprint::FingerprintGenerator;
use escrowsim::domain::ports::SnapshotStore;
use escrowsim::error::{Result, SimulatorError};
use escrowsim::infrastructure::in_memory::{InMemorySnapshotStore, RecordingNotifier};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

pub async fn ledger_with(
    store: InMemorySnapshotStore,
    seed: u64,
) -> (Arc<EscrowLedger>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let ledger = EscrowLedger::open(
        Box::new(store),
        notifier.clone(),
        FingerprintGenerator::seeded(seed),
        LedgerOptions::instant(),
    )
    .await;
    (Arc::new(ledger), notifier)
}

pub async fn ledger() -> (Arc<EscrowLedger>, Arc<RecordingNotifier>) {
    ledger_with(InMemorySnapshotStore::new(), 1).await
}

/// Holds every `save` until the test opens the gate, so callers can observe
/// state while a ledger write is in flight.
#[derive(Clone)]
pub struct GatedStore {
    inner: InMemorySnapshotStore,
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    fail: Arc<AtomicBool>,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: InMemorySnapshotStore::new(),
            gate: Arc::new(Notify::new()),
            entered: Arc::new(Notify::new()),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Waits until a `save` is parked at the gate.
    pub async fn wait_for_save(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for GatedStore {
    async fn load(&self) -> Result<Option<String>> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: String) -> Result<()> {
        self.entered.notify_one();
        self.gate.notified().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(SimulatorError::PersistenceError(
                "disk unavailable".to_string(),
            ));
        }
        self.inner.save(snapshot).await
    }

    async fn erase(&self) -> Result<()> {
        self.inner.erase().await
    }
}
