//! Scene graph handed to the render surface

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

use super::camera::OverlayCamera;
use crate::core::config::{AssetOrientation, DeviceTier, RenderProfile};
use crate::core::constants::FALLBACK_PRIMITIVE_RADIUS_M;

/// Fixed at initialization; the renderer never re-resolves it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub profile: RenderProfile,
    /// Viewport size in pixels (width, height)
    pub viewport_size: (f64, f64),
}

impl SceneConfig {
    pub fn new(profile: RenderProfile, viewport_size: (f64, f64)) -> Self {
        Self {
            profile,
            viewport_size,
        }
    }

    pub fn for_tier(tier: DeviceTier, viewport_size: (f64, f64)) -> Self {
        Self::new(tier.resolve(), viewport_size)
    }
}

/// Container format of an encoded model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Glb,
    Gltf,
    Obj,
    Unknown,
}

impl ModelFormat {
    /// Guess the format from the URL's file extension
    pub fn from_url(url: &str) -> Self {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
            Some("glb") => Self::Glb,
            Some("gltf") => Self::Gltf,
            Some("obj") => Self::Obj,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    Cuboid {
        size: [f64; 3],
    },
}

impl Primitive {
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Sphere {
                width_segments,
                height_segments,
                ..
            } => (*width_segments as usize + 1) * (*height_segments as usize + 1),
            Self::Cuboid { .. } => 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Empty,
    Primitive(Primitive),
    /// Raw model bytes decoded by the surface
    Encoded { format: ModelFormat, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTransform {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
    /// Axis the node treats as "up"
    pub up: Vector3<f64>,
}

impl NodeTransform {
    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply an asset's fixed axis correction
    pub fn orient(&mut self, orientation: &AssetOrientation) {
        let [rx, ry, rz] = orientation.rotation_deg;
        self.rotation =
            UnitQuaternion::from_euler_angles(rx.to_radians(), ry.to_radians(), rz.to_radians());
        self.scale = Vector3::repeat(orientation.scale);
        self.up = Vector3::from(orientation.up)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::z);
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
            up: Vector3::z(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub geometry: Geometry,
    pub transform: NodeTransform,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::Empty,
            transform: NodeTransform::default(),
            children: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    /// Simple sphere used when the real model cannot be loaded
    pub fn fallback_sphere(profile: &RenderProfile) -> Self {
        let segments = profile.sphere_segments.max(3);
        Self::new("fallback").with_geometry(Geometry::Primitive(Primitive::Sphere {
            radius: FALLBACK_PRIMITIVE_RADIUS_M,
            width_segments: segments,
            height_segments: (segments / 2).max(2),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { direction: [f64; 3] },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

fn lights_for(profile: &RenderProfile) -> Vec<Light> {
    let white = [1.0, 1.0, 1.0];
    let mut lights = vec![Light {
        kind: LightKind::Ambient,
        color: white,
        intensity: profile.light_intensity * 0.6,
    }];
    if profile.light_count > 1 {
        lights.push(Light {
            kind: LightKind::Directional {
                direction: [0.0, -70.0, 100.0],
            },
            color: white,
            intensity: profile.light_intensity,
        });
    }
    lights.truncate(profile.light_count.max(1));
    lights
}

/// The model that was installed in the scene
#[derive(Debug, Clone, PartialEq)]
pub enum AssetHandle {
    Model(SceneNode),
    Fallback(SceneNode),
}

impl AssetHandle {
    pub fn node(&self) -> &SceneNode {
        match self {
            Self::Model(node) | Self::Fallback(node) => node,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// One overlay scene: lights, the anchored model and the camera that
/// carries the per-frame projection
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    lights: Vec<Light>,
    camera: OverlayCamera,
    asset: Option<AssetHandle>,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            lights: lights_for(&config.profile),
            camera: OverlayCamera::new(config.viewport_size),
            asset: None,
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn profile(&self) -> &RenderProfile {
        &self.config.profile
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn camera(&self) -> &OverlayCamera {
        &self.camera
    }

    pub(crate) fn camera_mut(&mut self) -> &mut OverlayCamera {
        &mut self.camera
    }

    pub fn asset(&self) -> Option<&AssetHandle> {
        self.asset.as_ref()
    }

    /// Replace the installed model
    pub(crate) fn install(&mut self, handle: AssetHandle) {
        self.asset = Some(handle);
    }
}
