//! # geoanchor
//!
//! Live device-location tracking with a geo-anchored 3D overlay for map
//! views.
//!
//! The crate filters raw location readings into a stable position, keeps a
//! map camera following the user without fighting their gestures, and
//! renders a 3D model pinned to that position with a per-frame projection
//! supplied by the map. Platform pieces (location source, map viewport,
//! model loader, render surface) are reached through the traits in
//! [`traits`]; [`sim`] provides headless implementations.

pub mod core;
pub mod engine;
pub mod prelude;
pub mod rendering;
pub mod sim;
pub mod sync;
pub mod tracking;
pub mod traits;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{DeviceTier, OverlayConfig, RenderProfile, SyncConfig, TrackerOptions},
    events::Subscription,
    geo::{Coordinate, LocationReading},
    viewport::{CameraParams, CameraState},
};

pub use engine::{EngineParts, OverlayEngine};

pub use rendering::{
    AssetError, FrameOutcome, OverlayAnchor, OverlayRenderer, RenderError, RendererState,
    WebMercatorProjection,
};

pub use sync::{RecenterDecision, SyncPolicy};

pub use tracking::{LocationError, LocationTracker, PermissionStatus, TrackingState};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize `env_logger` from `RUST_LOG`, defaulting to `info`
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
