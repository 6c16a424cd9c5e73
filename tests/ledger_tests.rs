mod common;

use escrowsim::application::ledger::{EscrowLedger, LedgerOptions};
use escrowsim::domain::escrow::{CreateEscrowRequest, EscrowStatus, NotificationMode};
use escrowsim::domain::fingerprint::{FingerprintGenerator, is_valid_hash};
use escrowsim::error::SimulatorError;
use escrowsim::infrastructure::file::FileSnapshotStore;
use escrowsim::infrastructure::in_memory::{InMemorySnapshotStore, RecordingNotifier};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_create_then_release_sample_payment() {
    let (ledger, notifier) = common::ledger().await;

    let created = ledger.create(CreateEscrowRequest::sample()).await.unwrap();
    assert_eq!(created.status, EscrowStatus::Locked);
    assert_eq!(created.amount.value(), dec!(500));
    assert_eq!(created.description, "Sample Escrow Payment");
    assert!(is_valid_hash(&created.hash));

    assert!(
        ledger
            .release(&created.id, NotificationMode::Announce)
            .await
            .unwrap()
    );

    let released = ledger.get(&created.id).await.unwrap();
    assert_eq!(released.status, EscrowStatus::Released);
    assert!(is_valid_hash(&released.hash));
    assert_ne!(released.hash, created.hash);
    assert!(released.updated_at >= created.updated_at);

    let titles: Vec<_> = notifier
        .notifications()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, ["Escrow Created", "Payment Released"]);
}

#[tokio::test]
async fn test_newest_escrow_comes_first() {
    let (ledger, _) = common::ledger().await;
    let first = ledger
        .create(CreateEscrowRequest::new(dec!(1), "first", "1", "One").unwrap())
        .await
        .unwrap();
    let second = ledger
        .create(CreateEscrowRequest::new(dec!(2), "second", "2", "Two").unwrap())
        .await
        .unwrap();

    let ids: Vec<_> = ledger.transactions().await.into_iter().map(|t| t.id).collect();
    assert_eq!(ids, [second.id, first.id]);
}

#[tokio::test]
async fn test_dispute_annotates_description_and_keeps_hash() {
    let (ledger, _) = common::ledger().await;
    let created = ledger.create(CreateEscrowRequest::sample()).await.unwrap();

    assert!(
        ledger
            .dispute(&created.id, "Goods damaged", NotificationMode::Announce)
            .await
            .unwrap()
    );

    let disputed = ledger.get(&created.id).await.unwrap();
    assert_eq!(disputed.status, EscrowStatus::Disputed);
    assert_eq!(
        disputed.description,
        "Sample Escrow Payment (Disputed: Goods damaged)"
    );
    assert_eq!(disputed.hash, created.hash);
}

#[tokio::test]
async fn test_settled_escrow_cannot_move_again() {
    let (ledger, notifier) = common::ledger().await;
    let created = ledger.create(CreateEscrowRequest::sample()).await.unwrap();
    ledger
        .release(&created.id, NotificationMode::Announce)
        .await
        .unwrap();
    let settled = ledger.get(&created.id).await.unwrap();
    let announced = notifier.notifications().len();

    assert!(
        !ledger
            .dispute(&created.id, "too late", NotificationMode::Announce)
            .await
            .unwrap()
    );
    assert!(
        !ledger
            .release(&created.id, NotificationMode::Announce)
            .await
            .unwrap()
    );
    assert!(
        !ledger
            .release("no-such-id", NotificationMode::Announce)
            .await
            .unwrap()
    );

    assert_eq!(ledger.get(&created.id).await.unwrap(), settled);
    assert_eq!(notifier.notifications().len(), announced);
}

#[tokio::test]
async fn test_clear_empties_ledger_and_snapshot() {
    let store = InMemorySnapshotStore::new();
    let (ledger, notifier) = common::ledger_with(store.clone(), 3).await;
    ledger.create(CreateEscrowRequest::sample()).await.unwrap();
    assert!(store.snapshot().await.is_some());

    ledger.clear().await.unwrap();

    assert!(ledger.is_empty().await);
    assert!(store.snapshot().await.is_none());
    assert_eq!(notifier.notifications().last().unwrap().title, "Ledger Cleared");

    // Clearing an empty ledger is still acknowledged.
    ledger.clear().await.unwrap();
    assert_eq!(notifier.notifications().len(), 3);
}

#[tokio::test]
async fn test_reopen_restores_records_in_order() {
    let store = InMemorySnapshotStore::new();
    let (ledger, _) = common::ledger_with(store.clone(), 5).await;
    let a = ledger.create(CreateEscrowRequest::sample()).await.unwrap();
    let b = ledger
        .create(CreateEscrowRequest::new(dec!(12.5), "Tooling", "77", "Acme").unwrap())
        .await
        .unwrap();
    ledger
        .dispute(&a.id, "late", NotificationMode::Silent)
        .await
        .unwrap();
    let before = ledger.transactions().await;

    let (reopened, _) = common::ledger_with(store, 6).await;

    assert_eq!(reopened.transactions().await, before);
    assert_eq!(reopened.first().await.unwrap().id, b.id);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let open = |seed| {
        let path = path.clone();
        async move {
            EscrowLedger::open(
                Box::new(FileSnapshotStore::new(path)),
                Arc::new(RecordingNotifier::new()),
                FingerprintGenerator::seeded(seed),
                LedgerOptions::instant(),
            )
            .await
        }
    };

    let ledger = open(1).await;
    let created = ledger.create(CreateEscrowRequest::sample()).await.unwrap();
    drop(ledger);

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["recipientName"], "Sample Supplier");
    assert_eq!(value[0]["status"], "locked");

    let restarted = open(2).await;
    assert_eq!(restarted.get(&created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let store = InMemorySnapshotStore::with_snapshot("{ not json");
    let (ledger, _) = common::ledger_with(store, 1).await;
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_failed_write_leaves_ledger_untouched() {
    let store = common::GatedStore::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let ledger = Arc::new(
        EscrowLedger::open(
            Box::new(store.clone()),
            notifier.clone(),
            FingerprintGenerator::seeded(9),
            LedgerOptions::instant(),
        )
        .await,
    );

    store.fail_saves(true);
    let pending = tokio::spawn({
        let ledger = ledger.clone();
        async move { ledger.create(CreateEscrowRequest::sample()).await }
    });
    store.wait_for_save().await;
    store.open();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(SimulatorError::PersistenceError(_))));
    assert!(ledger.is_empty().await);

    let failure = notifier.notifications().pop().unwrap();
    assert_eq!(failure.title, "Failed to create escrow");
    assert!(failure.is_destructive());
}
