//! Geo-anchored 3D overlay rendering
//!
//! The renderer owns a single [`scene::Scene`] bound to a
//! [`RenderSurface`](crate::traits::RenderSurface). Every rendered frame
//! reads the latest anchor, asks a projection source for the matrix that
//! places the anchor on the map and draws.

pub mod asset;
pub mod camera;
pub mod frame;
pub mod projection;
pub mod renderer;
pub mod scene;

pub use asset::{load_with_timeout, LoadOptions};
pub use camera::OverlayCamera;
pub use frame::FramePacer;
pub use projection::WebMercatorProjection;
pub use renderer::{AssetStatus, FrameOutcome, FrameStats, OverlayRenderer, RendererState, SkipReason};

#[cfg(feature = "http")]
pub use asset::HttpAssetLoader;

use serde::{Deserialize, Serialize};

use crate::core::geo::{Coordinate, LocationReading};

/// Combined model-view-projection transform for one frame
pub type ProjectionMatrix = nalgebra::Matrix4<f64>;

/// Where the 3D content sits on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayAnchor {
    pub position: Coordinate,
}

impl OverlayAnchor {
    pub fn new(position: Coordinate) -> Self {
        Self { position }
    }
}

impl From<&LocationReading> for OverlayAnchor {
    fn from(reading: &LocationReading) -> Self {
        Self::new(reading.coordinate)
    }
}

/// Model loading failures. Both are recovered by installing a fallback
/// primitive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load asset {url}: {reason}")]
    AssetLoadFailed { url: String, reason: String },

    #[error("asset {url} did not load within {timeout_ms} ms")]
    AssetLoadTimeout { url: String, timeout_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("renderer is not initialized")]
    NotInitialized,

    #[error("renderer is not ready (state: {0:?})")]
    NotReady(RendererState),

    #[error("projection unavailable for this frame")]
    ProjectionUnavailable,

    #[error("render surface error: {0}")]
    Surface(String),
}
