use std::sync::Arc;
use std::time::Instant;

use super::asset::{load_with_timeout, LoadOptions};
use super::frame::FramePacer;
use super::scene::{AssetHandle, Scene, SceneConfig, SceneNode};
use super::{AssetError, OverlayAnchor, ProjectionMatrix, RenderError};
use crate::traits::{AssetLoader, RenderSurface};

/// Lifecycle of the overlay renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    /// Surface bound, no model installed yet
    Initialized,
    LoadingAsset,
    Ready,
    Rendering,
}

/// Which model ended up in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Loaded,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Less than one frame interval since the last rendered frame
    Throttled,
    /// No location has been accepted yet
    NoAnchor,
    /// The map could not supply a transform this frame
    ProjectionUnavailable,
    /// The surface rejected the draw
    SurfaceError,
}

/// Result of one display-frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    Skipped(SkipReason),
    /// No render loop is running; nothing was scheduled
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub throttled: u64,
    pub no_anchor: u64,
    pub projection_unavailable: u64,
    pub surface_errors: u64,
}

impl FrameStats {
    fn record(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Rendered => self.rendered += 1,
            FrameOutcome::Skipped(SkipReason::Throttled) => self.throttled += 1,
            FrameOutcome::Skipped(SkipReason::NoAnchor) => self.no_anchor += 1,
            FrameOutcome::Skipped(SkipReason::ProjectionUnavailable) => {
                self.projection_unavailable += 1
            }
            FrameOutcome::Skipped(SkipReason::SurfaceError) => self.surface_errors += 1,
            FrameOutcome::Stopped => {}
        }
    }
}

type AnchorSource = Box<dyn Fn() -> Option<OverlayAnchor> + Send>;
type ProjectionSource = Box<dyn Fn(&OverlayAnchor) -> Option<ProjectionMatrix> + Send>;

struct RenderLoop {
    anchor: AnchorSource,
    projection: ProjectionSource,
    pacer: FramePacer,
}

/// Owns the overlay scene and drives the per-frame render loop.
///
/// The loop does not own a timer. The host calls [`frame`](Self::frame) on
/// every display refresh; the renderer decides whether that refresh does
/// any work and always asks the surface for the next callback while the
/// loop is running.
pub struct OverlayRenderer {
    state: RendererState,
    surface: Box<dyn RenderSurface>,
    loader: Arc<dyn AssetLoader>,
    scene: Option<Scene>,
    render_loop: Option<RenderLoop>,
    asset_url: Option<String>,
    last_asset_error: Option<AssetError>,
    stats: FrameStats,
}

impl OverlayRenderer {
    pub fn new(surface: Box<dyn RenderSurface>, loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            state: RendererState::Uninitialized,
            surface,
            loader,
            scene: None,
            render_loop: None,
            asset_url: None,
            last_asset_error: None,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn asset(&self) -> Option<&AssetHandle> {
        self.scene.as_ref().and_then(Scene::asset)
    }

    pub fn asset_url(&self) -> Option<&str> {
        self.asset_url.as_deref()
    }

    pub fn last_asset_error(&self) -> Option<&AssetError> {
        self.last_asset_error.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_some()
    }

    /// Bind the surface and build the scene. Calling again is a no-op; the
    /// first profile stays in effect.
    pub fn initialize(&mut self, config: &SceneConfig) -> Result<(), RenderError> {
        if self.state != RendererState::Uninitialized {
            log::debug!("renderer already initialized, ignoring");
            return Ok(());
        }

        self.surface.bind(config)?;
        self.scene = Some(Scene::new(*config));
        self.state = RendererState::Initialized;
        log::info!(
            "overlay renderer initialized ({} fps cap, {} segments, {} lights)",
            config.profile.target_fps,
            config.profile.sphere_segments,
            config.profile.light_count
        );
        Ok(())
    }

    /// Load the model at `url` once. A failure or timeout installs the
    /// fallback primitive instead; either way the renderer ends up ready.
    pub async fn load_asset(
        &mut self,
        url: &str,
        options: LoadOptions,
    ) -> Result<AssetStatus, RenderError> {
        if self.state == RendererState::Uninitialized {
            return Err(RenderError::NotInitialized);
        }
        if let Some(handle) = self.asset() {
            log::debug!("asset already installed, ignoring load of {}", url);
            return Ok(status_of(handle));
        }
        self.install_from(url, options).await
    }

    /// Replace the installed model with a freshly loaded one
    pub async fn reload_asset(
        &mut self,
        url: &str,
        options: LoadOptions,
    ) -> Result<AssetStatus, RenderError> {
        if self.state == RendererState::Uninitialized {
            return Err(RenderError::NotInitialized);
        }
        self.install_from(url, options).await
    }

    /// Install a node directly, without a loader
    pub fn install_primitive(&mut self, node: SceneNode) -> Result<AssetStatus, RenderError> {
        let scene = self.scene.as_mut().ok_or(RenderError::NotInitialized)?;
        scene.install(AssetHandle::Fallback(node));
        if self.state != RendererState::Rendering {
            self.state = RendererState::Ready;
        }
        Ok(AssetStatus::Fallback)
    }

    async fn install_from(
        &mut self,
        url: &str,
        options: LoadOptions,
    ) -> Result<AssetStatus, RenderError> {
        let resume = self.state == RendererState::Rendering;
        self.state = RendererState::LoadingAsset;
        log::info!("loading overlay asset {}", url);

        let LoadOptions {
            timeout,
            orientation,
            fallback,
        } = options;
        let loader = Arc::clone(&self.loader);

        let handle = match load_with_timeout(loader.as_ref(), url, timeout).await {
            Ok(mut node) => {
                node.transform.orient(&orientation);
                self.last_asset_error = None;
                AssetHandle::Model(node)
            }
            Err(error) => {
                log::warn!("{}; using fallback primitive", error);
                self.last_asset_error = Some(error);
                let node = match fallback {
                    Some(build) => build(),
                    None => match &self.scene {
                        Some(scene) => SceneNode::fallback_sphere(scene.profile()),
                        None => return Err(RenderError::NotInitialized),
                    },
                };
                AssetHandle::Fallback(node)
            }
        };

        let status = status_of(&handle);
        let scene = self.scene.as_mut().ok_or(RenderError::NotInitialized)?;
        scene.install(handle);
        self.asset_url = Some(url.to_string());
        self.state = if resume && self.render_loop.is_some() {
            RendererState::Rendering
        } else {
            RendererState::Ready
        };
        Ok(status)
    }

    /// Begin the per-frame loop.
    ///
    /// `anchor` is read once per rendered frame; `projection` maps that
    /// anchor to this frame's transform or reports it unavailable. Starting
    /// again replaces the sources, so there is never more than one loop.
    pub fn start_loop<A, P>(&mut self, anchor: A, projection: P, target_fps: u32) -> Result<(), RenderError>
    where
        A: Fn() -> Option<OverlayAnchor> + Send + 'static,
        P: Fn(&OverlayAnchor) -> Option<ProjectionMatrix> + Send + 'static,
    {
        match self.state {
            RendererState::Ready | RendererState::Rendering => {}
            RendererState::Uninitialized => return Err(RenderError::NotInitialized),
            state => return Err(RenderError::NotReady(state)),
        }

        if self.render_loop.is_some() {
            log::debug!("replacing running render loop");
        }
        self.render_loop = Some(RenderLoop {
            anchor: Box::new(anchor),
            projection: Box::new(projection),
            pacer: FramePacer::new(target_fps),
        });
        self.state = RendererState::Rendering;
        self.surface.request_redraw();
        log::info!("render loop started at {} fps", target_fps);
        Ok(())
    }

    /// Handle one display-frame callback
    pub fn frame(&mut self, now: Instant) -> FrameOutcome {
        let outcome = self.render_frame(now);
        self.stats.record(outcome);
        outcome
    }

    fn render_frame(&mut self, now: Instant) -> FrameOutcome {
        let Some(render_loop) = self.render_loop.as_mut() else {
            return FrameOutcome::Stopped;
        };
        self.surface.request_redraw();

        if !render_loop.pacer.is_due(now) {
            return FrameOutcome::Skipped(SkipReason::Throttled);
        }

        let Some(anchor) = (render_loop.anchor)() else {
            return FrameOutcome::Skipped(SkipReason::NoAnchor);
        };
        let Some(projection) = (render_loop.projection)(&anchor) else {
            log::trace!("{}", RenderError::ProjectionUnavailable);
            return FrameOutcome::Skipped(SkipReason::ProjectionUnavailable);
        };
        let Some(scene) = self.scene.as_mut() else {
            return FrameOutcome::Stopped;
        };

        scene.camera_mut().apply(projection, anchor);
        match self.surface.draw(scene) {
            Ok(()) => {
                render_loop.pacer.mark_rendered(now);
                FrameOutcome::Rendered
            }
            Err(error) => {
                log::warn!("frame dropped: {}", error);
                FrameOutcome::Skipped(SkipReason::SurfaceError)
            }
        }
    }

    /// Stop scheduling frames. Safe to call repeatedly.
    pub fn stop_loop(&mut self) {
        if self.render_loop.take().is_some() {
            log::info!("render loop stopped");
            if self.state == RendererState::Rendering {
                self.state = RendererState::Ready;
            }
        }
    }

    /// Stop the loop, drop the scene and release the surface. The renderer
    /// can be initialized again afterwards. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.stop_loop();
        if self.state == RendererState::Uninitialized {
            return;
        }
        self.surface.release();
        self.scene = None;
        self.asset_url = None;
        self.state = RendererState::Uninitialized;
        log::debug!("render surface released");
    }
}

fn status_of(handle: &AssetHandle) -> AssetStatus {
    if handle.is_fallback() {
        AssetStatus::Fallback
    } else {
        AssetStatus::Loaded
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("state", &self.state)
            .field("asset_url", &self.asset_url)
            .field("rendering", &self.is_rendering())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DeviceTier;
    use crate::core::geo::Coordinate;
    use crate::rendering::scene::Geometry;
    use crate::sim::{RecordingSurface, StaticAssetLoader};
    use nalgebra::Matrix4;
    use std::time::Duration;

    fn renderer(loader: StaticAssetLoader) -> (OverlayRenderer, RecordingSurface) {
        let surface = RecordingSurface::new();
        let renderer = OverlayRenderer::new(Box::new(surface.clone()), Arc::new(loader));
        (renderer, surface)
    }

    fn config() -> SceneConfig {
        SceneConfig::for_tier(DeviceTier::Mobile, (390.0, 844.0))
    }

    fn anchor() -> OverlayAnchor {
        OverlayAnchor::new(Coordinate::new(35.0, 139.0))
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut renderer, surface) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer
            .initialize(&SceneConfig::for_tier(DeviceTier::Desktop, (1.0, 1.0)))
            .unwrap();

        assert_eq!(renderer.state(), RendererState::Initialized);
        assert_eq!(surface.bind_count(), 1);
        assert_eq!(renderer.scene().unwrap().profile().target_fps, 30);
    }

    #[tokio::test]
    async fn test_load_before_initialize_fails() {
        let (mut renderer, _) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        let result = renderer
            .load_asset("m.glb", LoadOptions::new(Duration::from_secs(1)))
            .await;
        assert_eq!(result, Err(RenderError::NotInitialized));
    }

    #[tokio::test]
    async fn test_model_load_applies_orientation() {
        let (mut renderer, _) = renderer(StaticAssetLoader::ok(SceneNode::new("duck")));
        renderer.initialize(&config()).unwrap();

        let status = renderer
            .load_asset("duck.glb", LoadOptions::new(Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(status, AssetStatus::Loaded);
        assert_eq!(renderer.state(), RendererState::Ready);
        let node = renderer.asset().unwrap().node();
        assert_eq!(node.name, "duck");
        assert_ne!(node.transform.rotation, nalgebra::UnitQuaternion::identity());
    }

    #[tokio::test]
    async fn test_failed_load_installs_fallback() {
        let (mut renderer, _) = renderer(StaticAssetLoader::fail("404"));
        renderer.initialize(&config()).unwrap();

        let status = renderer
            .load_asset("missing.glb", LoadOptions::new(Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(status, AssetStatus::Fallback);
        assert_eq!(renderer.state(), RendererState::Ready);
        assert!(matches!(
            renderer.last_asset_error(),
            Some(AssetError::AssetLoadFailed { .. })
        ));
        assert!(matches!(
            renderer.asset().unwrap().node().geometry,
            Geometry::Primitive(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_load_falls_back_after_timeout() {
        let (mut renderer, _) = renderer(StaticAssetLoader::hang());
        renderer.initialize(&config()).unwrap();

        let options =
            LoadOptions::new(Duration::from_millis(500)).with_fallback(|| SceneNode::new("marker"));
        let status = renderer.load_asset("slow.glb", options).await.unwrap();

        assert_eq!(status, AssetStatus::Fallback);
        assert_eq!(renderer.asset().unwrap().node().name, "marker");
        assert!(matches!(
            renderer.last_asset_error(),
            Some(AssetError::AssetLoadTimeout { timeout_ms: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_asset_loads_at_most_once() {
        let loader = StaticAssetLoader::ok(SceneNode::new("duck"));
        let loads = loader.load_counter();
        let (mut renderer, _) = renderer(loader);
        renderer.initialize(&config()).unwrap();

        for _ in 0..3 {
            renderer
                .load_asset("duck.glb", LoadOptions::new(Duration::from_secs(1)))
                .await
                .unwrap();
        }
        assert_eq!(loads.get(), 1);

        renderer
            .reload_asset("duck.glb", LoadOptions::new(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn test_start_loop_requires_ready() {
        let (mut renderer, _) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        assert_eq!(
            renderer.start_loop(|| None, |_| None, 30),
            Err(RenderError::NotInitialized)
        );

        renderer.initialize(&config()).unwrap();
        assert_eq!(
            renderer.start_loop(|| None, |_| None, 30),
            Err(RenderError::NotReady(RendererState::Initialized))
        );
    }

    #[test]
    fn test_frame_skips_and_renders() {
        let (mut renderer, surface) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer.install_primitive(SceneNode::new("marker")).unwrap();

        let projection_ready = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ready = projection_ready.clone();
        renderer
            .start_loop(
                || Some(anchor()),
                move |_| {
                    ready
                        .load(std::sync::atomic::Ordering::SeqCst)
                        .then(Matrix4::identity)
                },
                30,
            )
            .unwrap();
        assert_eq!(renderer.state(), RendererState::Rendering);

        let start = Instant::now();
        assert_eq!(
            renderer.frame(start),
            FrameOutcome::Skipped(SkipReason::ProjectionUnavailable)
        );

        projection_ready.store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(renderer.frame(start), FrameOutcome::Rendered);
        assert_eq!(
            renderer.frame(start + Duration::from_millis(10)),
            FrameOutcome::Skipped(SkipReason::Throttled)
        );
        assert_eq!(
            renderer.frame(start + Duration::from_millis(40)),
            FrameOutcome::Rendered
        );

        assert_eq!(surface.draw_count(), 2);
        // every active frame schedules the next one
        assert!(surface.redraw_requests() >= 4);
        assert_eq!(renderer.stats().rendered, 2);
        assert_eq!(renderer.stats().projection_unavailable, 1);
        assert_eq!(renderer.scene().unwrap().camera().anchor(), Some(&anchor()));
    }

    #[test]
    fn test_no_anchor_skips_frame() {
        let (mut renderer, surface) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer.install_primitive(SceneNode::new("marker")).unwrap();
        renderer
            .start_loop(|| None, |_| Some(Matrix4::identity()), 60)
            .unwrap();

        assert_eq!(
            renderer.frame(Instant::now()),
            FrameOutcome::Skipped(SkipReason::NoAnchor)
        );
        assert_eq!(surface.draw_count(), 0);
    }

    #[test]
    fn test_stop_loop_is_idempotent() {
        let (mut renderer, surface) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer.install_primitive(SceneNode::new("marker")).unwrap();
        renderer
            .start_loop(|| Some(anchor()), |_| Some(Matrix4::identity()), 60)
            .unwrap();

        renderer.stop_loop();
        renderer.stop_loop();
        assert_eq!(renderer.state(), RendererState::Ready);

        let redraws = surface.redraw_requests();
        assert_eq!(renderer.frame(Instant::now()), FrameOutcome::Stopped);
        assert_eq!(surface.redraw_requests(), redraws);

        renderer.release();
        renderer.release();
        assert_eq!(surface.release_count(), 1);
    }

    #[test]
    fn test_restarted_loop_paces_from_scratch() {
        let (mut renderer, _) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer.install_primitive(SceneNode::new("marker")).unwrap();
        renderer
            .start_loop(|| Some(anchor()), |_| Some(Matrix4::identity()), 30)
            .unwrap();

        let start = Instant::now();
        assert_eq!(renderer.frame(start), FrameOutcome::Rendered);
        renderer.stop_loop();

        renderer
            .start_loop(|| Some(anchor()), |_| Some(Matrix4::identity()), 30)
            .unwrap();
        assert_eq!(
            renderer.frame(start + Duration::from_millis(1)),
            FrameOutcome::Rendered
        );
    }

    #[test]
    fn test_surface_error_does_not_advance_pacer() {
        let (mut renderer, surface) = renderer(StaticAssetLoader::ok(SceneNode::new("m")));
        renderer.initialize(&config()).unwrap();
        renderer.install_primitive(SceneNode::new("marker")).unwrap();
        renderer
            .start_loop(|| Some(anchor()), |_| Some(Matrix4::identity()), 30)
            .unwrap();

        surface.fail_draws(true);
        let start = Instant::now();
        assert_eq!(
            renderer.frame(start),
            FrameOutcome::Skipped(SkipReason::SurfaceError)
        );

        surface.fail_draws(false);
        assert_eq!(
            renderer.frame(start + Duration::from_millis(1)),
            FrameOutcome::Rendered
        );
    }
}
