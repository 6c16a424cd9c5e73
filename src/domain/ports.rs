use super::notification::Notification;
use super::wallet::{MockAddresses, WalletConnection, WalletTransaction};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Durable storage for the ledger: a single slot holding the JSON snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, snapshot: String) -> Result<()>;
    async fn erase(&self) -> Result<()>;
}

/// Receives user-facing notifications. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// The wallet-backed transaction API consumed by the scenario runner.
///
/// Every mutating call may fail; `create_payment` resolves with the id of the
/// new payment.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    async fn connection(&self) -> WalletConnection;
    async fn connect(&self) -> Result<WalletConnection>;
    async fn disconnect(&self) -> Result<()>;

    async fn deposit(&self, amount: Decimal) -> Result<()>;
    async fn create_payment(&self, payee: &str, amount: Decimal, description: &str)
    -> Result<String>;
    async fn fund_payment(&self, payment_id: &str, amount: Decimal) -> Result<()>;
    async fn release_payment(&self, payment_id: &str) -> Result<()>;
    async fn release_to_supplier(&self, supplier: &str, amount: Decimal) -> Result<()>;
    async fn create_dispute(&self, payment_id: &str, reason: &str) -> Result<()>;

    async fn transactions(&self) -> Vec<WalletTransaction>;
    async fn refresh_transactions(&self) -> Result<()>;
    fn mock_addresses(&self) -> MockAddresses;
}

pub type SnapshotStoreBox = Box<dyn SnapshotStore>;
pub type NotifierHandle = Arc<dyn Notifier>;
pub type WalletGatewayBox = Box<dyn WalletGateway>;
