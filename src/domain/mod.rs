//! Domain layer: value types, the scenario catalog and the port traits the
//! application layer is written against.

pub mod escrow;
pub mod fingerprint;
pub mod notification;
pub mod ports;
pub mod scenario;
pub mod wallet;
