use crate::core::config::SyncConfig;
use crate::core::geo::Coordinate;
use crate::core::geomath;
use crate::core::viewport::CameraParams;

/// Outcome of evaluating one location against the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecenterDecision {
    pub should_recenter: bool,
    pub target: Option<Coordinate>,
    /// Only set on the first recenter of a session
    pub zoom: Option<f64>,
    /// Distance from the camera center to the location
    pub distance_m: f64,
}

impl RecenterDecision {
    fn hold(distance_m: f64) -> Self {
        Self {
            should_recenter: false,
            target: None,
            zoom: None,
            distance_m,
        }
    }

    fn recenter(target: Coordinate, zoom: Option<f64>, distance_m: f64) -> Self {
        Self {
            should_recenter: true,
            target: Some(target),
            zoom,
            distance_m,
        }
    }
}

/// Recenters the camera once the user has drifted more than the configured
/// threshold from its center.
///
/// A user pan away from the location never fights the user: nothing happens
/// until a new location arrives, and then only if that location is itself
/// beyond the threshold.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    config: SyncConfig,
    last_camera: Option<CameraParams>,
    last_location: Option<Coordinate>,
    has_recentered: bool,
    following: bool,
}

impl SyncPolicy {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            last_camera: None,
            last_location: None,
            has_recentered: false,
            following: false,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn last_camera(&self) -> Option<&CameraParams> {
        self.last_camera.as_ref()
    }

    /// Whether the camera center is within the threshold of the last known
    /// location
    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Evaluate a location against an explicit camera snapshot
    pub fn on_location_update(
        &mut self,
        location: &Coordinate,
        camera: &CameraParams,
    ) -> RecenterDecision {
        self.last_camera = Some(*camera);
        self.last_location = Some(*location);

        let distance = geomath::distance(&camera.center, location);
        if distance > self.config.recenter_threshold_m {
            let zoom = if self.has_recentered {
                None
            } else {
                self.config.recenter_zoom
            };
            self.has_recentered = true;
            self.following = true;
            log::debug!("recentering: user is {:.1} m from camera center", distance);
            return RecenterDecision::recenter(*location, zoom, distance);
        }

        self.following = true;
        RecenterDecision::hold(distance)
    }

    /// Evaluate a location against the last camera snapshot. Without one,
    /// the camera position is unknown and the location is always taken.
    pub fn on_location(&mut self, location: &Coordinate) -> RecenterDecision {
        match self.last_camera {
            Some(camera) => self.on_location_update(location, &camera),
            None => {
                let zoom = if self.has_recentered {
                    None
                } else {
                    self.config.recenter_zoom
                };
                self.last_location = Some(*location);
                self.has_recentered = true;
                self.following = true;
                RecenterDecision::recenter(*location, zoom, f64::INFINITY)
            }
        }
    }

    /// Record the latest camera position, whoever moved it
    pub fn on_camera_change(&mut self, camera: &CameraParams) {
        self.last_camera = Some(*camera);
        if let Some(location) = &self.last_location {
            self.following =
                geomath::distance(&camera.center, location) <= self.config.recenter_threshold_m;
        }
    }

    /// Forget session state so the next recenter applies the zoom again
    pub fn reset(&mut self) {
        self.last_location = None;
        self.has_recentered = false;
        self.following = false;
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
