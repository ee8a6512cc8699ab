//! Camera/location synchronization
//!
//! Decides when the map camera follows the user. The policy only decides;
//! the engine applies the recenter to the viewport.

pub mod policy;

pub use policy::{RecenterDecision, SyncPolicy};
