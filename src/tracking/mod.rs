//! Device location tracking
//!
//! [`LocationTracker`] owns the single active provider subscription, runs
//! each raw reading through the [`ReadingFilter`] and publishes the accepted
//! ones.

pub mod filter;
pub mod tracker;

pub use filter::{FilterVerdict, ReadingFilter};
pub use tracker::LocationTracker;

use serde::{Deserialize, Serialize};

use crate::core::geo::LocationReading;

/// Lifecycle of the location subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Idle,
    Requesting,
    Watching,
    Error,
}

/// Mirror of the platform location permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Prompt,
    Granted,
    Denied,
}

/// Failures reported by the location provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location request timed out after {timeout_ms} ms")]
    ProviderTimeout { timeout_ms: u64 },

    #[error("location unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Identifier of an active provider watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// One event pushed by a provider watch
pub type PositionUpdate = std::result::Result<LocationReading, LocationError>;
