use nalgebra::{Matrix4, Vector3, Vector4};

use super::{OverlayAnchor, ProjectionMatrix};

/// Overlay camera.
///
/// Unlike a free camera it never derives its own matrices: the projection is
/// supplied every frame by the map, so the overlay stays glued to it.
#[derive(Debug, Clone)]
pub struct OverlayCamera {
    /// Viewport size in pixels
    viewport_size: (f64, f64),
    /// Model-view-projection for the current anchor
    projection_matrix: ProjectionMatrix,
    anchor: Option<OverlayAnchor>,
    updates: u64,
}

impl OverlayCamera {
    pub fn new(viewport_size: (f64, f64)) -> Self {
        Self {
            viewport_size,
            projection_matrix: Matrix4::identity(),
            anchor: None,
            updates: 0,
        }
    }

    /// Install the projection computed for this frame
    pub fn apply(&mut self, projection: ProjectionMatrix, anchor: OverlayAnchor) {
        self.projection_matrix = projection;
        self.anchor = Some(anchor);
        self.updates += 1;
    }

    pub fn projection_matrix(&self) -> &ProjectionMatrix {
        &self.projection_matrix
    }

    pub fn anchor(&self) -> Option<&OverlayAnchor> {
        self.anchor.as_ref()
    }

    /// Number of frames that supplied a projection
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        self.viewport_size
    }

    /// Get projection matrix as array for GPU upload
    pub fn projection_array(&self) -> [[f32; 4]; 4] {
        let m = &self.projection_matrix;
        let mut out = [[0.0_f32; 4]; 4];
        for (row, values) in out.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = m[(row, col)] as f32;
            }
        }
        out
    }

    /// Convert a point in anchor-local meters to screen pixels.
    /// `None` when the point is behind the camera.
    pub fn local_to_screen(&self, local: Vector3<f64>) -> Option<(f64, f64)> {
        let clip = self.projection_matrix * Vector4::new(local.x, local.y, local.z, 1.0);
        if clip.w <= f64::EPSILON {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let (width, height) = self.viewport_size;

        Some((
            (ndc_x + 1.0) * 0.5 * width,
            (1.0 - ndc_y) * 0.5 * height, // Flip Y
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Coordinate;

    #[test]
    fn test_apply_counts_updates() {
        let mut camera = OverlayCamera::new((800.0, 600.0));
        assert_eq!(camera.update_count(), 0);
        assert!(camera.anchor().is_none());

        let anchor = OverlayAnchor::new(Coordinate::new(35.0, 139.0));
        camera.apply(Matrix4::new_scaling(2.0), anchor);

        assert_eq!(camera.update_count(), 1);
        assert_eq!(camera.anchor(), Some(&anchor));
        assert_eq!(camera.projection_array()[0][0], 2.0);
    }

    #[test]
    fn test_identity_maps_origin_to_viewport_center() {
        let camera = OverlayCamera::new((800.0, 600.0));
        let (x, y) = camera.local_to_screen(Vector3::zeros()).unwrap();
        assert_eq!((x, y), (400.0, 300.0));
    }

    #[test]
    fn test_point_behind_camera() {
        let mut camera = OverlayCamera::new((800.0, 600.0));
        let mut flip = Matrix4::identity();
        flip[(3, 3)] = -1.0;
        camera.apply(flip, OverlayAnchor::new(Coordinate::default()));
        assert!(camera.local_to_screen(Vector3::zeros()).is_none());
    }
}
