//! Prelude module for common geoanchor types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use geoanchor::prelude::*;`

pub use crate::core::{
    config::{
        AssetOptions, AssetOrientation, DeviceTier, OverlayConfig, RenderProfile, SyncConfig,
        TrackerOptions,
    },
    events::{ListenerSet, SharedValue, Subscription},
    geo::{Coordinate, LocationReading},
    geomath,
    viewport::{CameraChange, CameraChangeSource, CameraParams, CameraState},
};

pub use crate::tracking::{
    FilterVerdict, LocationError, LocationTracker, PermissionStatus, PositionUpdate,
    ReadingFilter, TrackingState, WatchId,
};

pub use crate::sync::{RecenterDecision, SyncPolicy};

pub use crate::rendering::{
    scene::{AssetHandle, Geometry, Primitive, Scene, SceneConfig, SceneNode},
    AssetError, AssetStatus, FrameOutcome, FramePacer, LoadOptions, OverlayAnchor,
    OverlayCamera, OverlayRenderer, ProjectionMatrix, RenderError, RendererState, SkipReason,
    WebMercatorProjection,
};

#[cfg(feature = "http")]
pub use crate::rendering::HttpAssetLoader;

pub use crate::engine::{EngineParts, OverlayEngine};

pub use crate::traits::{
    AssetLoader, Lerp, LocationProvider, MapViewport, ProjectionProvider, RenderSurface,
};

pub use crate::{Error, Result};

// Common external types
pub use std::sync::Arc;
pub use std::time::{Duration, Instant};
