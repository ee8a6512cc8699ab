//! Overlay engine
//!
//! Composes the tracker, camera state, sync policy and renderer for one
//! mounted map view. All work happens on the caller's task: provider events
//! are drained by [`OverlayEngine::pump_location`] and frames are driven by
//! [`OverlayEngine::frame`], or by [`OverlayEngine::run`] which does both on
//! a display-rate interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::core::config::OverlayConfig;
use crate::core::events::{SharedValue, Subscription};
use crate::core::geo::{Coordinate, LocationReading};
use crate::core::viewport::{CameraChange, CameraParams, CameraState};
use crate::rendering::scene::{SceneConfig, SceneNode};
use crate::rendering::{FrameOutcome, LoadOptions, OverlayAnchor, OverlayRenderer};
use crate::sync::{RecenterDecision, SyncPolicy};
use crate::tracking::{LocationError, LocationTracker, PermissionStatus, TrackingState};
use crate::traits::{AssetLoader, LocationProvider, MapViewport, ProjectionProvider, RenderSurface};
use crate::Result;

/// Host-supplied collaborators
pub struct EngineParts {
    pub location: Arc<dyn LocationProvider>,
    pub viewport: Box<dyn MapViewport>,
    pub loader: Arc<dyn AssetLoader>,
    pub surface: Box<dyn RenderSurface>,
    pub projection: Arc<dyn ProjectionProvider>,
}

/// Live location tracking with a geo-anchored 3D overlay
pub struct OverlayEngine {
    config: OverlayConfig,
    tracker: LocationTracker,
    camera: CameraState,
    policy: SyncPolicy,
    viewport: Box<dyn MapViewport>,
    renderer: OverlayRenderer,
    projection: Arc<dyn ProjectionProvider>,
    anchor: SharedValue<Option<OverlayAnchor>>,
    camera_snapshot: SharedValue<CameraParams>,
    subscriptions: Vec<Subscription>,
    mounted: bool,
    recenters: u64,
}

impl OverlayEngine {
    pub fn new(config: OverlayConfig, parts: EngineParts) -> Result<Self> {
        config.validate()?;

        let EngineParts {
            location,
            viewport,
            loader,
            surface,
            projection,
        } = parts;

        let tracker = LocationTracker::with_options(location, config.tracker.clone());
        let camera = CameraState::new(viewport.camera());
        let mut policy = SyncPolicy::new(config.sync.clone());
        policy.on_camera_change(camera.params());

        let anchor = SharedValue::new(None);
        let camera_snapshot = SharedValue::new(*camera.params());

        // render-loop inputs are kept current by subscription
        let anchor_feed = {
            let anchor = anchor.clone();
            tracker.subscribe(move |reading: &LocationReading| {
                anchor.set(Some(OverlayAnchor::from(reading)));
            })
        };
        let camera_feed = {
            let snapshot = camera_snapshot.clone();
            camera.subscribe(move |change: &CameraChange| snapshot.set(change.params))
        };

        Ok(Self {
            renderer: OverlayRenderer::new(surface, loader),
            config,
            tracker,
            camera,
            policy,
            viewport,
            projection,
            anchor,
            camera_snapshot,
            subscriptions: vec![anchor_feed, camera_feed],
            mounted: false,
            recenters: 0,
        })
    }

    /// Initialize rendering, load the model, start tracking and the render
    /// loop. Location failures do not fail the mount; they surface through
    /// [`on_location_error`](Self::on_location_error) and
    /// [`tracking_state`](Self::tracking_state).
    pub async fn mount(&mut self) -> Result<()> {
        if self.mounted {
            log::debug!("overlay already mounted");
            return Ok(());
        }

        let profile = self.config.render_profile();
        self.renderer
            .initialize(&SceneConfig::new(profile, self.config.viewport_size))?;

        match self.config.asset.clone() {
            Some(asset) => {
                self.renderer
                    .load_asset(&asset.url, LoadOptions::from(&asset))
                    .await?;
            }
            None => {
                self.renderer
                    .install_primitive(SceneNode::fallback_sphere(&profile))?;
            }
        }

        let state = self.tracker.start(self.config.tracker.clone()).await;
        if let Some(reading) = self.tracker.current_location().copied() {
            self.follow(&reading.coordinate);
        }

        let anchor = self.anchor.clone();
        let camera = self.camera_snapshot.clone();
        let projection = Arc::clone(&self.projection);
        self.renderer.start_loop(
            move || anchor.get().flatten(),
            move |anchor| camera.get().and_then(|params| projection.projection(anchor, &params)),
            profile.target_fps,
        )?;

        self.mounted = true;
        log::info!("overlay mounted (tracking: {:?})", state);
        Ok(())
    }

    /// Drain pending location events. Only the newest accepted reading of
    /// the batch is evaluated for a recenter.
    pub fn pump_location(&mut self) -> Option<RecenterDecision> {
        let accepted = self.tracker.pump();
        let latest = accepted.last()?;
        Some(self.follow(&latest.coordinate))
    }

    /// Report a camera change from the map's own events (user gestures)
    pub fn on_viewport_changed(&mut self, params: CameraParams) {
        if let Some(change) = self.camera.apply_user_change(params) {
            self.policy.on_camera_change(&change.params);
        }
    }

    /// Handle one display-frame callback
    pub fn frame(&mut self, now: Instant) -> FrameOutcome {
        self.renderer.frame(now)
    }

    /// Pump location events, then handle the display frame
    pub fn tick(&mut self, now: Instant) -> FrameOutcome {
        self.pump_location();
        self.frame(now)
    }

    /// Drive the engine at `display_interval` until `shutdown` fires (or its
    /// sender is dropped), then unmount
    pub async fn run(
        &mut self,
        display_interval: Duration,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<()> {
        self.mount().await?;

        let mut display = tokio::time::interval(display_interval);
        display.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                tick = display.tick() => {
                    if self.tick(tick.into_std()) == FrameOutcome::Stopped {
                        break;
                    }
                }
            }
        }

        self.unmount();
        Ok(())
    }

    /// User-triggered retry of the location request
    pub async fn request_location(&mut self) -> TrackingState {
        let state = self.tracker.request_location().await;
        if let Some(reading) = self.tracker.current_location().copied() {
            self.follow(&reading.coordinate);
        }
        state
    }

    /// Stop tracking and rendering and release the surface. Safe to call
    /// repeatedly.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.tracker.stop();
        self.renderer.release();
        self.mounted = false;
        log::info!(
            "overlay unmounted after {} rendered frames and {} recenters",
            self.renderer.stats().rendered,
            self.recenters
        );
    }

    fn follow(&mut self, location: &Coordinate) -> RecenterDecision {
        let decision = self.policy.on_location(location);
        if !decision.should_recenter {
            return decision;
        }

        if let Some(target) = decision.target {
            self.viewport.set_center(target);
            if let Some(zoom) = decision.zoom {
                self.viewport.set_zoom(zoom);
            }
            if let Some(change) = self.camera.apply_recenter(target, decision.zoom) {
                self.policy.on_camera_change(&change.params);
            }
            self.recenters += 1;
        }
        decision
    }

    pub fn subscribe_location<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LocationReading) + Send + Sync + 'static,
    {
        self.tracker.subscribe(listener)
    }

    pub fn on_location_error<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LocationError) + Send + Sync + 'static,
    {
        self.tracker.on_error(listener)
    }

    pub fn subscribe_camera<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CameraChange) + Send + Sync + 'static,
    {
        self.camera.subscribe(listener)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracker.state()
    }

    pub fn permission(&self) -> PermissionStatus {
        self.tracker.permission()
    }

    pub fn current_location(&self) -> Option<&LocationReading> {
        self.tracker.current_location()
    }

    pub fn last_error(&self) -> Option<&LocationError> {
        self.tracker.last_error()
    }

    pub fn camera(&self) -> &CameraParams {
        self.camera.params()
    }

    pub fn is_following(&self) -> bool {
        self.policy.is_following()
    }

    pub fn recenter_count(&self) -> u64 {
        self.recenters
    }

    pub fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }
}

impl Drop for OverlayEngine {
    fn drop(&mut self) {
        self.unmount();
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for OverlayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayEngine")
            .field("mounted", &self.mounted)
            .field("tracker", &self.tracker)
            .field("camera", &self.camera)
            .field("renderer", &self.renderer)
            .field("recenters", &self.recenters)
            .finish()
    }
}
