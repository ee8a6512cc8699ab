//! Web Mercator placement of anchored content

use nalgebra::{Matrix4, Rotation3, Vector2, Vector3};

use super::{OverlayAnchor, ProjectionMatrix};
use crate::core::constants::{
    MAX_MERCATOR_LATITUDE, OVERLAY_FOV_DEG, TILE_SIZE, WEB_MERCATOR_RADIUS_M,
};
use crate::core::geo::Coordinate;
use crate::core::viewport::CameraParams;
use crate::traits::ProjectionProvider;

/// Projects a coordinate to world pixel coordinates at the given zoom
pub fn project_world_px(coord: &Coordinate, zoom: f64) -> Vector2<f64> {
    let world_size = TILE_SIZE * 2_f64.powf(zoom);
    let lat = coord.lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE).to_radians();

    let x = (coord.lng + 180.0) / 360.0 * world_size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * world_size;
    Vector2::new(x, y)
}

/// Ground resolution at a latitude
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE).to_radians();
    2.0 * std::f64::consts::PI * WEB_MERCATOR_RADIUS_M * lat.cos() / (TILE_SIZE * 2_f64.powf(zoom))
}

/// Perspective projection of anchor-local meters (x east, y north, z up)
/// onto a Web Mercator map viewport
#[derive(Debug, Clone)]
pub struct WebMercatorProjection {
    viewport_size: (f64, f64),
    fov_deg: f64,
}

impl WebMercatorProjection {
    pub fn new(viewport_size: (f64, f64)) -> Self {
        Self {
            viewport_size,
            fov_deg: OVERLAY_FOV_DEG,
        }
    }

    pub fn with_fov(mut self, fov_deg: f64) -> Self {
        self.fov_deg = fov_deg;
        self
    }

    pub fn set_viewport_size(&mut self, size: (f64, f64)) {
        self.viewport_size = size;
    }
}

impl ProjectionProvider for WebMercatorProjection {
    fn projection(&self, anchor: &OverlayAnchor, camera: &CameraParams) -> Option<ProjectionMatrix> {
        let (width, height) = self.viewport_size;
        if width <= 0.0 || height <= 0.0 || !anchor.position.is_valid() {
            return None;
        }

        let mpp = meters_per_pixel(anchor.position.lat, camera.zoom);
        if !(mpp > f64::EPSILON) {
            return None;
        }

        let fovy = self.fov_deg.to_radians();
        // distance at which one world pixel spans one screen pixel
        let distance = (height / 2.0) / (fovy / 2.0).tan();

        let offset = project_world_px(&anchor.position, camera.zoom)
            - project_world_px(&camera.center, camera.zoom);

        // meters -> world pixels, placed relative to the camera center.
        // Screen y grows downward, north grows upward.
        let model = Matrix4::new_translation(&Vector3::new(
            offset.x,
            -offset.y,
            anchor.position.altitude / mpp,
        )) * Matrix4::new_scaling(1.0 / mpp);

        let view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -distance))
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -camera.tilt.to_radians())
                .to_homogeneous()
            * Rotation3::from_axis_angle(&Vector3::z_axis(), camera.heading.to_radians())
                .to_homogeneous();

        let projection =
            Matrix4::new_perspective(width / height, fovy, distance * 0.01, distance * 100.0);

        Some(projection * view * model)
    }
}
