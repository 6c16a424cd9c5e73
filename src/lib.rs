//! Escrow payment rehearsal: a local escrow ledger plus a scenario runner that
//! drives multi-step payment workflows against a wallet collaborator. No real
//! chain or funds are involved.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
