use serde::{Deserialize, Serialize};

use crate::core::constants::{MAX_TILT_DEG, MAX_ZOOM, MIN_ZOOM};
use crate::core::events::{ListenerSet, Subscription};
use crate::core::geo::Coordinate;
use crate::core::geomath::normalize_degrees;

/// Observable parameters of the map viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// The center of the map view in geographical coordinates
    pub center: Coordinate,
    /// The current zoom level
    pub zoom: f64,
    /// Pitch away from straight-down, in degrees
    pub tilt: f64,
    /// Rotation clockwise from north, in degrees
    pub heading: f64,
}

impl CameraParams {
    pub fn new(center: Coordinate, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            tilt: 0.0,
            heading: 0.0,
        }
    }

    pub fn with_tilt(mut self, tilt: f64) -> Self {
        self.tilt = tilt;
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// Gets the scale factor for the current zoom level
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self::new(Coordinate::default(), 2.0)
    }
}

/// Who moved the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraChangeSource {
    /// Gesture input reported by the map viewport
    User,
    /// Programmatic recenter decided by the sync policy
    Recenter,
}

/// Published after every accepted camera mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraChange {
    pub params: CameraParams,
    pub previous: CameraParams,
    pub source: CameraChangeSource,
}

impl CameraChange {
    pub fn center_changed(&self) -> bool {
        self.params.center != self.previous.center
    }

    pub fn zoom_changed(&self) -> bool {
        (self.params.zoom - self.previous.zoom).abs() > f64::EPSILON
    }
}

/// Mirror of the externally owned viewport.
///
/// There are exactly two writers: user gestures (via
/// [`CameraState::apply_user_change`]) and sync-policy recenters, which only
/// the engine can apply.
pub struct CameraState {
    params: CameraParams,
    min_zoom: f64,
    max_zoom: f64,
    max_tilt: f64,
    listeners: ListenerSet<CameraChange>,
}

impl CameraState {
    pub fn new(params: CameraParams) -> Self {
        let mut state = Self {
            params,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            max_tilt: MAX_TILT_DEG,
            listeners: ListenerSet::new(),
        };
        state.params = state.sanitize(params);
        state
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn center(&self) -> Coordinate {
        self.params.center
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
        self.params.zoom = self.params.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Register for change notifications from either writer
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CameraChange) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Record a change reported by the viewport's own events
    pub fn apply_user_change(&mut self, params: CameraParams) -> Option<CameraChange> {
        self.commit(params, CameraChangeSource::User)
    }

    /// Move the center (and optionally zoom) on behalf of the sync policy
    pub(crate) fn apply_recenter(
        &mut self,
        target: Coordinate,
        zoom: Option<f64>,
    ) -> Option<CameraChange> {
        let mut params = self.params;
        params.center = target;
        if let Some(zoom) = zoom {
            params.zoom = zoom;
        }
        self.commit(params, CameraChangeSource::Recenter)
    }

    fn commit(&mut self, params: CameraParams, source: CameraChangeSource) -> Option<CameraChange> {
        let params = self.sanitize(params);
        if params == self.params {
            return None;
        }

        let change = CameraChange {
            params,
            previous: self.params,
            source,
        };
        self.params = params;
        log::debug!(
            "camera {:?} change: center=({:.6}, {:.6}) zoom={:.2}",
            source,
            params.center.lat,
            params.center.lng,
            params.zoom
        );
        self.listeners.emit(&change);
        Some(change)
    }

    fn sanitize(&self, mut params: CameraParams) -> CameraParams {
        params.center.lat = Coordinate::clamp_lat(params.center.lat);
        params.center.lng = Coordinate::wrap_lng(params.center.lng);
        params.zoom = params.zoom.clamp(self.min_zoom, self.max_zoom);
        params.tilt = params.tilt.clamp(0.0, self.max_tilt);
        params.heading = normalize_degrees(params.heading);
        params
    }
}

impl std::fmt::Debug for CameraState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraState")
            .field("params", &self.params)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
