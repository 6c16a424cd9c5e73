//! Data exchanged with the wallet/transaction collaborator driven by the scenario runner.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the counterparty used when a step does not reference a specific supplier.
pub const DEFAULT_SUPPLIER: &str = "supplier";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalletConnection {
    pub account: Option<String>,
    pub connecting: bool,
    pub is_connected: bool,
    pub balance: Decimal,
}

/// The six payment primitives the collaborator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletPrimitive {
    Deposit,
    CreatePayment,
    FundPayment,
    ReleasePayment,
    ReleaseToSupplier,
    CreateDispute,
}

/// An entry of the collaborator's transaction feed, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub hash: String,
    pub primitive: WalletPrimitive,
    pub amount: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Named mock counterparty addresses, e.g. `supplier` or `supplierB`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MockAddresses(BTreeMap<String, String>);

impl MockAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.0.insert(name.into(), address.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
