use crate::domain::escrow::{
    CreateEscrowRequest, EscrowStatus, EscrowTransaction, NotificationMode,
};
use crate::domain::fingerprint::FingerprintGenerator;
use crate::domain::notification::Notification;
use crate::domain::ports::{NotifierHandle, SnapshotStoreBox};
use crate::error::{Result, SimulatorError};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Tunables for [`EscrowLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Simulated network latency applied before create/release/dispute.
    pub latency: Duration,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1000),
        }
    }
}

impl LedgerOptions {
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }
}

/// The session's escrow ledger.
///
/// Owns the collection of escrow records (most recent first) and is the only
/// component allowed to mutate them. Every mutation writes the full collection
/// to the snapshot store before it is committed in memory, so a failed write
/// leaves the ledger exactly as it was.
pub struct EscrowLedger {
    transactions: RwLock<Vec<EscrowTransaction>>,
    store: SnapshotStoreBox,
    notifier: NotifierHandle,
    fingerprints: FingerprintGenerator,
    options: LedgerOptions,
}

impl EscrowLedger {
    /// Opens the ledger, restoring a prior snapshot if one can be read.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty ledger.
    pub async fn open(
        store: SnapshotStoreBox,
        notifier: NotifierHandle,
        fingerprints: FingerprintGenerator,
        options: LedgerOptions,
    ) -> Self {
        let transactions = match store.load().await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<EscrowTransaction>>(&raw) {
                Ok(transactions) => {
                    debug!(count = transactions.len(), "Restored ledger snapshot");
                    transactions
                }
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt ledger snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Could not read ledger snapshot, starting empty");
                Vec::new()
            }
        };

        Self {
            transactions: RwLock::new(transactions),
            store,
            notifier,
            fingerprints,
            options,
        }
    }

    /// Locks funds for a recipient and records the new escrow at the head of the ledger.
    pub async fn create(&self, request: CreateEscrowRequest) -> Result<EscrowTransaction> {
        self.simulate_latency().await;

        let now = Utc::now();
        let escrow = EscrowTransaction {
            id: self.fingerprints.generate_id(),
            amount: request.amount,
            description: request.description,
            recipient_id: request.recipient_id,
            recipient_name: request.recipient_name,
            status: EscrowStatus::Locked,
            hash: self.fingerprints.generate_hash(),
            created_at: now,
            updated_at: now,
        };

        let mut transactions = self.transactions.write().await;
        let mut next = Vec::with_capacity(transactions.len() + 1);
        next.push(escrow.clone());
        next.extend(transactions.iter().cloned());

        if let Err(e) = self.persist(&next).await {
            return Err(self.fail("Failed to create escrow", request.mode, e));
        }
        *transactions = next;
        drop(transactions);

        info!(id = %escrow.id, amount = %escrow.amount, hash = %escrow.hash, "Escrow locked");
        self.announce(
            request.mode,
            Notification::info(
                "Escrow Created",
                format!(
                    "{} locked in escrow for {}",
                    escrow.amount, escrow.recipient_name
                ),
            ),
        );
        Ok(escrow)
    }

    /// Releases a locked escrow to its recipient and records a new ledger hash.
    ///
    /// Returns `Ok(false)` without touching anything when the id is unknown or
    /// the record is no longer `Locked`.
    pub async fn release(&self, id: &str, mode: NotificationMode) -> Result<bool> {
        self.simulate_latency().await;

        let released = self
            .transition(id, EscrowStatus::Released, mode, |tx| {
                tx.release(self.fingerprints.generate_hash(), Utc::now())
            })
            .await?;

        if let Some(tx) = released {
            info!(id = %tx.id, hash = %tx.hash, "Escrow released");
            self.announce(
                mode,
                Notification::info(
                    "Payment Released",
                    format!("{} released to {}", tx.amount, tx.recipient_name),
                ),
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Flags a locked escrow as disputed, appending the reason to its description.
    pub async fn dispute(&self, id: &str, reason: &str, mode: NotificationMode) -> Result<bool> {
        self.simulate_latency().await;

        let disputed = self
            .transition(id, EscrowStatus::Disputed, mode, |tx| {
                tx.dispute(reason, Utc::now())
            })
            .await?;

        if let Some(tx) = disputed {
            info!(id = %tx.id, reason, "Escrow disputed");
            self.announce(
                mode,
                Notification::info(
                    "Dispute Raised",
                    format!("Escrow {} is under dispute: {}", tx.id, reason),
                ),
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Empties the ledger and erases the persisted snapshot.
    pub async fn clear(&self) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if let Err(e) = self.store.erase().await {
            return Err(self.fail(
                "Failed to clear ledger",
                NotificationMode::Announce,
                persistence(e),
            ));
        }
        let removed = transactions.len();
        transactions.clear();
        drop(transactions);

        info!(removed, "Ledger cleared");
        self.notifier.notify(Notification::info(
            "Ledger Cleared",
            "All escrow transactions have been removed",
        ));
        Ok(())
    }

    /// A copy of every record, most recent first.
    pub async fn transactions(&self) -> Vec<EscrowTransaction> {
        self.transactions.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<EscrowTransaction> {
        self.transactions
            .read()
            .await
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
    }

    /// The most recently created record.
    pub async fn first(&self) -> Option<EscrowTransaction> {
        self.transactions.read().await.first().cloned()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }

    async fn transition<F>(
        &self,
        id: &str,
        target: EscrowStatus,
        mode: NotificationMode,
        apply: F,
    ) -> Result<Option<EscrowTransaction>>
    where
        F: FnOnce(&mut EscrowTransaction),
    {
        let mut transactions = self.transactions.write().await;

        let Some(pos) = transactions.iter().position(|tx| tx.id == id) else {
            warn!(id, to = %target, "Ignoring transition for unknown escrow");
            return Ok(None);
        };
        let current = transactions[pos].status;
        if !current.can_transition_to(target) {
            warn!(id, from = %current, to = %target, "Ignoring illegal escrow transition");
            return Ok(None);
        }

        let mut next = transactions.clone();
        apply(&mut next[pos]);

        if let Err(e) = self.persist(&next).await {
            let title = match target {
                EscrowStatus::Disputed => "Failed to raise dispute",
                _ => "Failed to release funds",
            };
            return Err(self.fail(title, mode, e));
        }

        let updated = next[pos].clone();
        *transactions = next;
        Ok(Some(updated))
    }

    async fn persist(&self, transactions: &[EscrowTransaction]) -> Result<()> {
        let snapshot = serde_json::to_string(transactions)
            .map_err(|e| SimulatorError::PersistenceError(e.to_string()))?;
        self.store.save(snapshot).await.map_err(persistence)
    }

    async fn simulate_latency(&self) {
        if !self.options.latency.is_zero() {
            tokio::time::sleep(self.options.latency).await;
        }
    }

    fn announce(&self, mode: NotificationMode, notification: Notification) {
        if mode == NotificationMode::Announce {
            self.notifier.notify(notification);
        }
    }

    fn fail(&self, title: &str, mode: NotificationMode, err: SimulatorError) -> SimulatorError {
        error!(error = %err, "{}", title);
        self.announce(mode, Notification::failure(title, err.to_string()));
        err
    }
}

fn persistence(err: SimulatorError) -> SimulatorError {
    match err {
        SimulatorError::PersistenceError(_) => err,
        other => SimulatorError::PersistenceError(other.to_string()),
    }
}
