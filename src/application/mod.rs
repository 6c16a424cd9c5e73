//! Application layer: the services a session drives.
//!
//! `EscrowLedger` owns the escrow records and their persistence. The
//! `ScenarioRunner` is a separate service on top of the wallet collaborator;
//! the two never share state. `GuidedFlow` and `WidgetSummary` are thin
//! front-ends over the ledger.

pub mod guided;
pub mod ledger;
pub mod runner;
pub mod widget;
