use crate::application::ledger::EscrowLedger;
use crate::domain::escrow::{CreateEscrowRequest, EscrowStatus, EscrowTransaction, NotificationMode};
use crate::error::{Result, SimulatorError};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetPhase {
    Create = 1,
    Locked = 2,
    Released = 3,
}

impl WidgetPhase {
    /// Projects the head of the ledger onto the three widget phases.
    ///
    /// A disputed or pending head has nothing the widget can act on, so it
    /// shows the create phase again.
    pub fn of(head: Option<&EscrowTransaction>) -> Self {
        match head.map(|tx| tx.status) {
            Some(EscrowStatus::Locked) => WidgetPhase::Locked,
            Some(EscrowStatus::Released) => WidgetPhase::Released,
            Some(EscrowStatus::Pending | EscrowStatus::Disputed) | None => WidgetPhase::Create,
        }
    }
}

impl fmt::Display for WidgetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WidgetPhase::Create => "create",
            WidgetPhase::Locked => "locked",
            WidgetPhase::Released => "released",
        };
        write!(f, "{} ({})", *self as u8, label)
    }
}

/// Compact embedding of the ledger.
///
/// Holds no state of its own and always looks at the most recent record, so
/// it only makes sense while a single escrow of interest is in flight.
pub struct WidgetSummary {
    ledger: Arc<EscrowLedger>,
}

impl WidgetSummary {
    pub fn new(ledger: Arc<EscrowLedger>) -> Self {
        Self { ledger }
    }

    pub async fn phase(&self) -> WidgetPhase {
        WidgetPhase::of(self.ledger.first().await.as_ref())
    }

    /// Locks the sample payment. Rejected only while the head escrow is still locked;
    /// a released head loops back to a new lock.
    pub async fn lock(&self) -> Result<WidgetPhase> {
        if self.phase().await == WidgetPhase::Locked {
            return Err(SimulatorError::ValidationError(
                "An escrow is already in progress".to_string(),
            ));
        }
        self.ledger.create(CreateEscrowRequest::sample()).await?;
        Ok(self.phase().await)
    }

    /// Releases the most recent escrow if it is locked.
    pub async fn release(&self) -> Result<WidgetPhase> {
        if let Some(head) = self.ledger.first().await
            && head.status == EscrowStatus::Locked
        {
            self.ledger
                .release(&head.id, NotificationMode::Announce)
                .await?;
        }
        Ok(self.phase().await)
    }
}
