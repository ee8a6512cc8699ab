use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use geoanchor::{
    core::viewport::CameraChangeSource,
    rendering::{scene::SceneNode, HttpAssetLoader},
    sim::{HeadlessViewport, RecordingSurface, SimulatedLocationProvider, StaticAssetLoader, WalkPath},
    traits::AssetLoader,
    CameraParams, Coordinate, EngineParts, OverlayConfig, OverlayEngine, WebMercatorProjection,
};
use tokio::sync::oneshot;

const DEFAULT_RUN_SECONDS: u64 = 30;
const DISPLAY_INTERVAL: Duration = Duration::from_millis(16);
const FIX_INTERVAL: Duration = Duration::from_secs(1);

/// Headless overlay session: a simulated rider moving through San Francisco
///
/// Usage: `geoanchor-sim [config.json] [seconds]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    geoanchor::init_logging();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => OverlayConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => OverlayConfig::default(),
    };
    let seconds = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid duration {:?}", raw))?,
        None => DEFAULT_RUN_SECONDS,
    };

    let origin = Coordinate::new(37.7749, -122.4194);
    let path = WalkPath::new(origin, 45.0, 6.0);

    let provider = Arc::new(SimulatedLocationProvider::with_fix(path.reading_at(0)));
    let viewport = HeadlessViewport::new(CameraParams::new(origin, 17.0));
    let surface = RecordingSurface::new();
    let loader: Arc<dyn AssetLoader> = match &config.asset {
        Some(_) => Arc::new(HttpAssetLoader::new()),
        None => Arc::new(StaticAssetLoader::ok(SceneNode::new("avatar"))),
    };

    let mut engine = OverlayEngine::new(
        config.clone(),
        EngineParts {
            location: provider.clone(),
            viewport: Box::new(viewport.clone()),
            loader,
            surface: Box::new(surface.clone()),
            projection: Arc::new(WebMercatorProjection::new(config.viewport_size)),
        },
    )?;

    let _recenters = engine.subscribe_camera(|change| {
        if change.source == CameraChangeSource::Recenter {
            log::info!(
                "camera recentered to ({:.6}, {:.6})",
                change.params.center.lat,
                change.params.center.lng
            );
        }
    });
    let _errors = engine.on_location_error(|error| log::warn!("location error: {}", error));

    // device fixes arrive on their own cadence, independent of the display
    let feeder = {
        let provider = provider.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            let mut fixes = tokio::time::interval(FIX_INTERVAL);
            loop {
                fixes.tick().await;
                provider.push(path.reading_at(start.elapsed().as_millis() as u64));
            }
        })
    };

    let (stop, shutdown) = oneshot::channel();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
        }
        let _ = stop.send(());
    });

    log::info!("running overlay simulation for {} s", seconds);
    engine.run(DISPLAY_INTERVAL, shutdown).await?;
    feeder.abort();

    let tracker = engine.tracker().stats();
    let frames = engine.renderer().stats();
    log::info!(
        "fixes: {} received, {} accepted, {} inaccurate, {} insignificant",
        tracker.received,
        tracker.accepted,
        tracker.rejected_inaccurate,
        tracker.rejected_insignificant
    );
    log::info!(
        "frames: {} rendered, {} throttled, {} without projection; {} draws on surface",
        frames.rendered,
        frames.throttled,
        frames.projection_unavailable,
        surface.draw_count()
    );
    log::info!(
        "camera: {} recenters, {} viewport moves, final state {:?}",
        engine.recenter_count(),
        viewport.set_center_calls(),
        engine.tracking_state()
    );

    Ok(())
}
