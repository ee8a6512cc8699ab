use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::rendering::scene::{Scene, SceneConfig};
use crate::rendering::{OverlayAnchor, ProjectionMatrix, RenderError};
use crate::core::viewport::CameraParams;
use crate::traits::{ProjectionProvider, RenderSurface};

#[derive(Debug, Default)]
struct SurfaceLog {
    bound: Option<SceneConfig>,
    binds: usize,
    draws: usize,
    redraw_requests: usize,
    releases: usize,
    fail_draws: bool,
    last_projection: Option<ProjectionMatrix>,
    last_anchor: Option<OverlayAnchor>,
}

/// Render surface that records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R: Default>(&self, f: impl FnOnce(&SurfaceLog) -> R) -> R {
        self.log.lock().map(|log| f(&*log)).unwrap_or_default()
    }

    /// Reject subsequent draws with a surface error
    pub fn fail_draws(&self, fail: bool) {
        if let Ok(mut log) = self.log.lock() {
            log.fail_draws = fail;
        }
    }

    pub fn bound_config(&self) -> Option<SceneConfig> {
        self.read(|log| log.bound)
    }

    pub fn bind_count(&self) -> usize {
        self.read(|log| log.binds)
    }

    pub fn draw_count(&self) -> usize {
        self.read(|log| log.draws)
    }

    pub fn redraw_requests(&self) -> usize {
        self.read(|log| log.redraw_requests)
    }

    pub fn release_count(&self) -> usize {
        self.read(|log| log.releases)
    }

    pub fn last_projection(&self) -> Option<ProjectionMatrix> {
        self.read(|log| log.last_projection)
    }

    pub fn last_anchor(&self) -> Option<OverlayAnchor> {
        self.read(|log| log.last_anchor)
    }
}

impl RenderSurface for RecordingSurface {
    fn bind(&mut self, config: &SceneConfig) -> Result<(), RenderError> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| RenderError::Surface("surface log poisoned".into()))?;
        log.bound = Some(*config);
        log.binds += 1;
        Ok(())
    }

    fn draw(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| RenderError::Surface("surface log poisoned".into()))?;
        if log.fail_draws {
            return Err(RenderError::Surface("draw rejected".into()));
        }
        log.draws += 1;
        log.last_projection = Some(*scene.camera().projection_matrix());
        log.last_anchor = scene.camera().anchor().copied();
        Ok(())
    }

    fn request_redraw(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.redraw_requests += 1;
        }
    }

    fn release(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.releases += 1;
        }
    }
}

/// Projection source that can be switched off, like a map whose style has
/// not finished loading
#[derive(Debug, Clone)]
pub struct ToggleProjection<P> {
    inner: P,
    available: Arc<AtomicBool>,
}

impl<P: ProjectionProvider> ToggleProjection<P> {
    pub fn new(inner: P, available: bool) -> Self {
        Self {
            inner,
            available: Arc::new(AtomicBool::new(available)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl<P: ProjectionProvider> ProjectionProvider for ToggleProjection<P> {
    fn projection(&self, anchor: &OverlayAnchor, camera: &CameraParams) -> Option<ProjectionMatrix> {
        if self.available.load(Ordering::SeqCst) {
            self.inner.projection(anchor, camera)
        } else {
            None
        }
    }
}
