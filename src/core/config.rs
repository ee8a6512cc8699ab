//! Configuration system for tracking, camera sync and overlay rendering
//!
//! Every section has defaults derived from [`crate::core::constants`] and can
//! be loaded from JSON. Rendering quality follows a device tier preset that
//! is resolved once, the same way a performance profile is.

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::{Error, Result};

/// Options for the device location subscription and its reading filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub max_age_ms: u64,
    /// Movements below this are treated as GPS noise
    pub min_distance_threshold_m: f64,
    /// Readings with a larger accuracy radius are rejected
    pub max_accuracy_m: f64,
    pub smoothing_window: usize,
    pub history_capacity: usize,
}

impl TrackerOptions {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("tracker timeout_ms must be positive".into()));
        }
        if !(self.min_distance_threshold_m > 0.0) {
            return Err(Error::Config(
                "min_distance_threshold_m must be positive".into(),
            ));
        }
        if !(self.max_accuracy_m > 0.0) {
            return Err(Error::Config("max_accuracy_m must be positive".into()));
        }
        if self.smoothing_window == 0 {
            return Err(Error::Config("smoothing_window must be at least 1".into()));
        }
        if self.history_capacity < self.smoothing_window {
            return Err(Error::Config(format!(
                "history_capacity ({}) must hold the smoothing window ({})",
                self.history_capacity, self.smoothing_window
            )));
        }
        Ok(())
    }
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            max_age_ms: DEFAULT_LOCATION_MAX_AGE_MS,
            min_distance_threshold_m: DEFAULT_MIN_DISTANCE_M,
            max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Camera/location synchronization policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub recenter_threshold_m: f64,
    /// Zoom applied together with the first recenter of a session
    pub recenter_zoom: Option<f64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recenter_threshold_m: DEFAULT_RECENTER_THRESHOLD_M,
            recenter_zoom: None,
        }
    }
}

/// Hardware class of the host, chosen once per renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Mobile,
    Desktop,
}

impl DeviceTier {
    /// Classify a browser user agent string
    pub fn from_user_agent(user_agent: &str) -> Self {
        const MOBILE_MARKERS: [&str; 7] = [
            "android",
            "iphone",
            "ipad",
            "ipod",
            "mobile",
            "blackberry",
            "opera mini",
        ];
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn resolve(&self) -> RenderProfile {
        match self {
            Self::Mobile => RenderProfile {
                target_fps: MOBILE_TARGET_FPS,
                sphere_segments: 16,
                light_count: 1,
                light_intensity: 0.75,
            },
            Self::Desktop => RenderProfile {
                target_fps: DESKTOP_TARGET_FPS,
                sphere_segments: 32,
                light_count: 2,
                light_intensity: 1.0,
            },
        }
    }
}

impl Default for DeviceTier {
    fn default() -> Self {
        Self::Desktop
    }
}

/// Geometry and frame budget derived from a [`DeviceTier`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProfile {
    pub target_fps: u32,
    pub sphere_segments: u32,
    pub light_count: usize,
    pub light_intensity: f32,
}

impl RenderProfile {
    pub fn target_frame_duration_ms(&self) -> u64 {
        1000 / self.target_fps.max(1) as u64
    }
}

/// Fixed orientation correction between a model's native axes and the map's
/// ground plane. Asset specific; never inferred from the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetOrientation {
    /// Axis treated as "up" by the scene
    pub up: [f64; 3],
    /// Euler rotation (x, y, z) in degrees applied to the model root
    pub rotation_deg: [f64; 3],
    pub scale: f64,
}

impl Default for AssetOrientation {
    fn default() -> Self {
        // glTF models are Y-up; the map ground plane is XY with Z up
        Self {
            up: [0.0, 0.0, 1.0],
            rotation_deg: [90.0, 0.0, 0.0],
            scale: 1.0,
        }
    }
}

/// The 3D model anchored at the user's location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOptions {
    pub url: String,
    #[serde(default = "default_asset_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub orientation: AssetOrientation,
}

fn default_asset_timeout_ms() -> u64 {
    DEFAULT_ASSET_TIMEOUT_MS
}

impl AssetOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: DEFAULT_ASSET_TIMEOUT_MS,
            orientation: AssetOrientation::default(),
        }
    }
}

/// Top-level configuration for an overlay session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub tracker: TrackerOptions,
    pub sync: SyncConfig,
    pub device_tier: DeviceTier,
    pub asset: Option<AssetOptions>,
    /// Viewport size in CSS pixels (width, height)
    pub viewport_size: (f64, f64),
    /// Overrides the device tier frame cap when set
    pub target_fps: Option<u32>,
}

impl OverlayConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;

        if !(self.sync.recenter_threshold_m > 0.0) {
            return Err(Error::Config("recenter_threshold_m must be positive".into()));
        }
        if self.sync.recenter_threshold_m < self.tracker.min_distance_threshold_m {
            return Err(Error::Config(format!(
                "recenter threshold ({} m) is smaller than the movement threshold ({} m)",
                self.sync.recenter_threshold_m, self.tracker.min_distance_threshold_m
            )));
        }
        if self.target_fps == Some(0) {
            return Err(Error::Config("target_fps must be positive".into()));
        }
        if self.viewport_size.0 <= 0.0 || self.viewport_size.1 <= 0.0 {
            return Err(Error::Config("viewport_size must be positive".into()));
        }
        if let Some(asset) = &self.asset {
            if asset.url.is_empty() {
                return Err(Error::Config("asset url is empty".into()));
            }
        }
        Ok(())
    }

    /// Resolved render profile, honoring the frame cap override
    pub fn render_profile(&self) -> RenderProfile {
        let mut profile = self.device_tier.resolve();
        if let Some(fps) = self.target_fps {
            profile.target_fps = fps;
        }
        profile
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerOptions::default(),
            sync: SyncConfig::default(),
            device_tier: DeviceTier::default(),
            asset: None,
            viewport_size: (1280.0, 720.0),
            target_fps: None,
        }
    }
}
