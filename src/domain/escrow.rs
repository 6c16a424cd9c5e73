use crate::error::{Result, SimulatorError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive monetary amount held in escrow.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(SimulatorError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = SimulatorError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of an escrow record.
///
/// Records are created directly in `Locked`; the only legal edges are
/// `Locked -> Released` and `Locked -> Disputed`. `Pending` is kept so that
/// snapshots written with a reserve-then-lock flow still deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Pending,
    Locked,
    Released,
    Disputed,
}

impl EscrowStatus {
    pub fn can_transition_to(self, next: EscrowStatus) -> bool {
        matches!(
            (self, next),
            (EscrowStatus::Locked, EscrowStatus::Released)
                | (EscrowStatus::Locked, EscrowStatus::Disputed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::Pending => "pending",
            EscrowStatus::Locked => "locked",
            EscrowStatus::Released => "released",
            EscrowStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A simulated escrow transaction as stored in the ledger snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowTransaction {
    pub id: String,
    pub amount: Amount,
    pub description: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub status: EscrowStatus,
    /// `0x`-prefixed fingerprint of the latest ledger event for this record.
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscrowTransaction {
    pub(crate) fn release(&mut self, hash: String, now: DateTime<Utc>) {
        self.status = EscrowStatus::Released;
        self.hash = hash;
        self.updated_at = now;
    }

    /// Marks the record disputed. The hash is kept: a dispute annotates the
    /// same underlying transaction rather than creating a new ledger event.
    pub(crate) fn dispute(&mut self, reason: &str, now: DateTime<Utc>) {
        self.status = EscrowStatus::Disputed;
        self.description = format!("{} (Disputed: {})", self.description, reason);
        self.updated_at = now;
    }
}

/// Whether a ledger operation announces its outcome through the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationMode {
    #[default]
    Announce,
    /// Used by flows that render their own status, e.g. the guided demo.
    Silent,
}

/// Validated input for [`crate::application::ledger::EscrowLedger::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEscrowRequest {
    pub amount: Amount,
    pub description: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub mode: NotificationMode,
}

impl CreateEscrowRequest {
    pub fn new(
        amount: Decimal,
        description: impl Into<String>,
        recipient_id: impl Into<String>,
        recipient_name: impl Into<String>,
    ) -> Result<Self> {
        let description = description.into();
        let recipient_id = recipient_id.into();
        let recipient_name = recipient_name.into();

        if description.trim().is_empty() {
            return Err(SimulatorError::ValidationError(
                "Description must not be empty".to_string(),
            ));
        }
        if recipient_id.trim().is_empty() {
            return Err(SimulatorError::ValidationError(
                "Recipient id must not be empty".to_string(),
            ));
        }
        if recipient_name.trim().is_empty() {
            return Err(SimulatorError::ValidationError(
                "Recipient name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            amount: Amount::new(amount)?,
            description,
            recipient_id,
            recipient_name,
            mode: NotificationMode::Announce,
        })
    }

    pub fn silent(mut self) -> Self {
        self.mode = NotificationMode::Silent;
        self
    }

    /// The fixed request used by the one-click demo and the widget.
    pub fn sample() -> Self {
        Self {
            amount: Amount(Decimal::from(500)),
            description: "Sample Escrow Payment".to_string(),
            recipient_id: "12345".to_string(),
            recipient_name: "Sample Supplier".to_string(),
            mode: NotificationMode::Announce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> EscrowTransaction {
        let now = Utc::now();
        EscrowTransaction {
            id: "abc".to_string(),
            amount: Amount::new(dec!(10)).unwrap(),
            description: "Steel coils".to_string(),
            recipient_id: "9".to_string(),
            recipient_name: "Acme".to_string(),
            status: EscrowStatus::Locked,
            hash: "0x00".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0)),
            Err(SimulatorError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5)),
            Err(SimulatorError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_rejects_non_positive_on_deserialize() {
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
        let amount: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(amount.value(), dec!(12.5));
    }

    #[test]
    fn test_request_validation() {
        assert!(CreateEscrowRequest::new(dec!(1), "x", "1", "Acme").is_ok());
        assert!(CreateEscrowRequest::new(dec!(1), "  ", "1", "Acme").is_err());
        assert!(CreateEscrowRequest::new(dec!(1), "x", "", "Acme").is_err());
        assert!(CreateEscrowRequest::new(dec!(1), "x", "1", "").is_err());
        assert!(CreateEscrowRequest::new(dec!(0), "x", "1", "Acme").is_err());
    }

    #[test]
    fn test_transitions_only_leave_locked() {
        use EscrowStatus::*;
        assert!(Locked.can_transition_to(Released));
        assert!(Locked.can_transition_to(Disputed));
        assert!(!Released.can_transition_to(Locked));
        assert!(!Disputed.can_transition_to(Released));
        assert!(!Pending.can_transition_to(Released));
    }

    #[test]
    fn test_dispute_keeps_hash_and_appends_reason() {
        let mut tx = record();
        tx.dispute("late delivery", Utc::now());
        assert_eq!(tx.status, EscrowStatus::Disputed);
        assert_eq!(tx.hash, "0x00");
        assert_eq!(tx.description, "Steel coils (Disputed: late delivery)");
    }

    #[test]
    fn test_snapshot_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["recipientId"], "9");
        assert_eq!(json["status"], "locked");
        assert!(json["createdAt"].is_string());
    }
}
