//! Collaborator seams of the overlay engine
//!
//! The engine never talks to a platform directly. Device location, the map
//! viewport, model loading, projection and the render surface are all
//! reached through the traits below, so hosts (and tests) supply their own.

use async_trait::async_trait;
use crossbeam_channel::Sender;

use crate::core::config::TrackerOptions;
use crate::core::geo::{Coordinate, LocationReading};
use crate::core::viewport::CameraParams;
use crate::rendering::scene::{Scene, SceneConfig, SceneNode};
use crate::rendering::{AssetError, OverlayAnchor, ProjectionMatrix, RenderError};
use crate::tracking::{LocationError, PositionUpdate, WatchId};

/// Device location source (GPS, browser geolocation, replayed tracks...)
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Resolve a single fix. This is where the platform permission prompt
    /// is raised.
    async fn request_once(
        &self,
        options: &TrackerOptions,
    ) -> std::result::Result<LocationReading, LocationError>;

    /// Begin continuous updates. Every reading or error is pushed into
    /// `updates` on the provider's own cadence until [`cancel`] is called.
    ///
    /// [`cancel`]: LocationProvider::cancel
    fn watch(
        &self,
        options: &TrackerOptions,
        updates: Sender<PositionUpdate>,
    ) -> std::result::Result<WatchId, LocationError>;

    /// Stop a watch. Unknown ids are ignored.
    fn cancel(&self, watch: WatchId);
}

/// Externally owned 2D map viewport
pub trait MapViewport: Send {
    fn camera(&self) -> CameraParams;

    fn set_center(&mut self, center: Coordinate);

    fn set_zoom(&mut self, zoom: f64);
}

/// Asynchronous 3D model source
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, url: &str) -> std::result::Result<SceneNode, AssetError>;
}

/// Supplies the per-frame matrix that places anchored content on the map
pub trait ProjectionProvider: Send + Sync {
    /// `None` while the viewport cannot produce a transform yet
    fn projection(&self, anchor: &OverlayAnchor, camera: &CameraParams) -> Option<ProjectionMatrix>;
}

/// Drawing backend the overlay renders into
pub trait RenderSurface: Send {
    /// Create the context binding for the scene
    fn bind(&mut self, config: &SceneConfig) -> std::result::Result<(), RenderError>;

    fn draw(&mut self, scene: &Scene) -> std::result::Result<(), RenderError>;

    /// Schedule the next display-frame callback
    fn request_redraw(&mut self);

    /// Release GPU/context resources on teardown
    fn release(&mut self) {}
}

/// Unified interpolation trait
pub trait Lerp {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Coordinate {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Coordinate::with_altitude(
            self.lat.lerp(&other.lat, t),
            self.lng.lerp(&other.lng, t),
            self.altitude.lerp(&other.altitude, t),
        )
    }
}
