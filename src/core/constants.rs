//! Core constants for geodesy, tracking and overlay rendering defaults.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Mean Earth radius in meters, used for great-circle math.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Spherical Web Mercator radius (EPSG:3857), used for projection only.
pub const WEB_MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Approximate meters per degree used by the planar fast-reject distance.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_8;

/// Tile size in pixels that map zoom levels are expressed against.
pub const TILE_SIZE: f64 = 256.0;

/// Readings are ignored below this movement (GPS noise floor).
pub const DEFAULT_MIN_DISTANCE_M: f64 = 5.0;

/// Readings reporting a worse accuracy radius than this are rejected.
pub const DEFAULT_MAX_ACCURACY_M: f64 = 50.0;

/// Camera recenters when the user drifts this far from the map center.
pub const DEFAULT_RECENTER_THRESHOLD_M: f64 = 100.0;

/// One-shot and watch request timeout handed to the location provider.
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 10_000;

/// Maximum cached position age accepted from the provider.
pub const DEFAULT_LOCATION_MAX_AGE_MS: u64 = 0;

/// Readings averaged by the smoothing window.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Recent readings retained by the tracker.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Render cap on phones and tablets.
pub const MOBILE_TARGET_FPS: u32 = 30;

/// Render cap on desktop browsers and native hosts.
pub const DESKTOP_TARGET_FPS: u32 = 60;

/// Time allowed for a 3D model to arrive before the fallback primitive is used.
pub const DEFAULT_ASSET_TIMEOUT_MS: u64 = 10_000;

/// Radius in meters of the fallback sphere placed at the anchor.
pub const FALLBACK_PRIMITIVE_RADIUS_M: f64 = 5.0;

/// Vertical field of view of the overlay camera, in degrees.
pub const OVERLAY_FOV_DEG: f64 = 36.87;

/// Highest tilt the map viewport supports, in degrees.
pub const MAX_TILT_DEG: f64 = 67.5;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
