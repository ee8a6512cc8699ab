use std::sync::{Arc, Mutex};

use crate::core::geo::Coordinate;
use crate::core::viewport::CameraParams;
use crate::traits::MapViewport;

#[derive(Debug)]
struct ViewportLog {
    camera: CameraParams,
    set_center_calls: usize,
    set_zoom_calls: usize,
}

/// Map viewport without a display.
///
/// Clones share state, so a host can keep a handle after moving one into
/// the engine and simulate gestures with [`pan_to`](Self::pan_to).
#[derive(Debug, Clone)]
pub struct HeadlessViewport {
    log: Arc<Mutex<ViewportLog>>,
}

impl HeadlessViewport {
    pub fn new(camera: CameraParams) -> Self {
        Self {
            log: Arc::new(Mutex::new(ViewportLog {
                camera,
                set_center_calls: 0,
                set_zoom_calls: 0,
            })),
        }
    }

    /// Simulate a user drag; returns the params the map would report
    pub fn pan_to(&self, center: Coordinate) -> CameraParams {
        match self.log.lock() {
            Ok(mut log) => {
                log.camera.center = center;
                log.camera
            }
            Err(_) => CameraParams::new(center, 0.0),
        }
    }

    pub fn set_center_calls(&self) -> usize {
        self.log.lock().map(|log| log.set_center_calls).unwrap_or(0)
    }

    pub fn set_zoom_calls(&self) -> usize {
        self.log.lock().map(|log| log.set_zoom_calls).unwrap_or(0)
    }
}

impl MapViewport for HeadlessViewport {
    fn camera(&self) -> CameraParams {
        self.log
            .lock()
            .map(|log| log.camera)
            .unwrap_or_default()
    }

    fn set_center(&mut self, center: Coordinate) {
        if let Ok(mut log) = self.log.lock() {
            log.camera.center = center;
            log.set_center_calls += 1;
        }
    }

    fn set_zoom(&mut self, zoom: f64) {
        if let Ok(mut log) = self.log.lock() {
            log.camera.zoom = zoom;
            log.set_zoom_calls += 1;
        }
    }
}
