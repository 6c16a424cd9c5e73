use crate::application::ledger::EscrowLedger;
use crate::domain::escrow::{CreateEscrowRequest, EscrowTransaction, NotificationMode};
use crate::domain::notification::Notification;
use crate::domain::ports::NotifierHandle;
use crate::error::{Result, SimulatorError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// The five frames of the one-click demo, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidedFrame {
    Intro,
    /// Waiting for the ledger to create the sample escrow.
    Creating,
    Created,
    /// Waiting for the ledger to release the sample escrow.
    Releasing,
    Released,
}

impl GuidedFrame {
    pub fn index(self) -> u8 {
        match self {
            GuidedFrame::Intro => 0,
            GuidedFrame::Creating => 1,
            GuidedFrame::Created => 2,
            GuidedFrame::Releasing => 3,
            GuidedFrame::Released => 4,
        }
    }

    pub fn is_transient(self) -> bool {
        matches!(self, GuidedFrame::Creating | GuidedFrame::Releasing)
    }
}

struct GuidedState {
    frame: GuidedFrame,
    escrow: Option<EscrowTransaction>,
}

enum Action {
    Create,
    Release(String),
}

/// Reverts a transient frame to `fallback` if the ledger call is abandoned
/// before it resolves, e.g. when the `advance` future is dropped.
struct InFlight<'a> {
    flow: &'a GuidedFlow,
    fallback: GuidedFrame,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.flow.state();
        if state.frame.is_transient() {
            state.frame = self.fallback;
        }
    }
}

/// A zero-configuration walk through create-then-release on the ledger.
///
/// Ledger calls are issued silently; the flow reports its own failures.
pub struct GuidedFlow {
    ledger: Arc<EscrowLedger>,
    notifier: NotifierHandle,
    state: Mutex<GuidedState>,
}

impl GuidedFlow {
    pub fn new(ledger: Arc<EscrowLedger>, notifier: NotifierHandle) -> Self {
        Self {
            ledger,
            notifier,
            state: Mutex::new(GuidedState {
                frame: GuidedFrame::Intro,
                escrow: None,
            }),
        }
    }

    pub fn frame(&self) -> GuidedFrame {
        self.state().frame
    }

    /// The escrow created by this walk-through, as of the last stable frame.
    pub fn escrow(&self) -> Option<EscrowTransaction> {
        self.state().escrow.clone()
    }

    /// The trigger is disabled while a ledger call is in flight.
    pub fn is_trigger_enabled(&self) -> bool {
        !self.frame().is_transient()
    }

    /// Presses the trigger: moves to the next frame, invoking the ledger where needed.
    ///
    /// On a ledger failure the flow falls back to the last stable frame and
    /// the error is returned.
    pub async fn advance(&self) -> Result<GuidedFrame> {
        let action = {
            let mut state = self.state();
            match state.frame {
                GuidedFrame::Intro => {
                    state.frame = GuidedFrame::Creating;
                    Action::Create
                }
                GuidedFrame::Created => {
                    let Some(id) = state.escrow.as_ref().map(|tx| tx.id.clone()) else {
                        state.frame = GuidedFrame::Intro;
                        return Ok(GuidedFrame::Intro);
                    };
                    state.frame = GuidedFrame::Releasing;
                    Action::Release(id)
                }
                GuidedFrame::Released => {
                    state.frame = GuidedFrame::Intro;
                    state.escrow = None;
                    return Ok(GuidedFrame::Intro);
                }
                GuidedFrame::Creating | GuidedFrame::Releasing => {
                    return Err(SimulatorError::BusyError(
                        "Demo step already in progress".to_string(),
                    ));
                }
            }
        };

        match action {
            Action::Create => {
                let _in_flight = InFlight {
                    flow: self,
                    fallback: GuidedFrame::Intro,
                };
                self.create().await
            }
            Action::Release(id) => {
                let _in_flight = InFlight {
                    flow: self,
                    fallback: GuidedFrame::Created,
                };
                self.release(&id).await
            }
        }
    }

    async fn create(&self) -> Result<GuidedFrame> {
        match self.ledger.create(CreateEscrowRequest::sample().silent()).await {
            Ok(escrow) => {
                info!(id = %escrow.id, "Demo escrow created");
                let mut state = self.state();
                state.frame = GuidedFrame::Created;
                state.escrow = Some(escrow);
                Ok(GuidedFrame::Created)
            }
            Err(e) => {
                self.state().frame = GuidedFrame::Intro;
                Err(self.report("Could not create demo escrow", e))
            }
        }
    }

    async fn release(&self, id: &str) -> Result<GuidedFrame> {
        match self.ledger.release(id, NotificationMode::Silent).await {
            Ok(true) => {
                let escrow = self.ledger.get(id).await;
                info!(id, "Demo escrow released");
                let mut state = self.state();
                state.frame = GuidedFrame::Released;
                state.escrow = escrow;
                Ok(GuidedFrame::Released)
            }
            Ok(false) => {
                // The record was cleared or moved on outside the demo; start over.
                {
                    let mut state = self.state();
                    state.frame = GuidedFrame::Intro;
                    state.escrow = None;
                }
                Err(self.report(
                    "Could not release demo escrow",
                    SimulatorError::NotFoundError(format!("Escrow {} is no longer locked", id)),
                ))
            }
            Err(e) => {
                self.state().frame = GuidedFrame::Created;
                Err(self.report("Could not release demo escrow", e))
            }
        }
    }

    fn report(&self, title: &str, err: SimulatorError) -> SimulatorError {
        warn!(error = %err, "{}", title);
        self.notifier
            .notify(Notification::failure(title, err.to_string()));
        err
    }

    fn state(&self) -> MutexGuard<'_, GuidedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
