//! Plain data attached to scene objects.
//!
//! These are the payloads an adapter hands to the exporter. All of them are
//! serde-deserialisable so a [`SceneDocument`](super::SceneDocument) can be
//! loaded straight from JSON.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

// ============================================================================
// Mesh
// ============================================================================

/// One UV layer, holding one coordinate per polygon corner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

/// Polygon mesh in the object's local space.
///
/// Corners are numbered by walking `polygons` in order, so the n-th vertex
/// index of the whole polygon list is corner n. UV layers are indexed by corner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Per-vertex normals, parallel to `positions`.
    pub normals: Vec<Vec3>,
    pub polygons: Vec<Vec<u32>>,
    pub uv_layers: Vec<UvLayer>,
    pub active_uv_layer: usize,
}

impl MeshData {
    #[must_use]
    pub fn corner_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }
}

// ============================================================================
// Material
// ============================================================================

/// Where a texture's pixels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSource {
    #[default]
    Image,
    Procedural,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureRef {
    pub name: String,
    pub source: TextureSource,
    /// Raw image path as stored by the editor.
    pub image: Option<String>,
}

/// A named texture slot. The slot name suffix decides its role
/// (`-2d`, `-normal`, `-cube-up`, `-baked-front`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSlot {
    pub name: String,
    pub texture: TextureRef,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorData {
    pub enabled: bool,
    pub reflect_factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialData {
    pub name: String,
    pub shadeless: bool,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub specular_intensity: f32,
    pub mirror: MirrorData,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub texture_slots: Vec<TextureSlot>,
    /// Custom numeric properties (`cutoff`, `transparent`).
    pub properties: BTreeMap<String, f32>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: String::new(),
            shadeless: false,
            diffuse_color: Vec3::splat(0.8),
            specular_color: Vec3::ONE,
            specular_intensity: 0.0,
            mirror: MirrorData::default(),
            cast_shadows: false,
            receive_shadows: false,
            texture_slots: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Camera / Light / Speaker
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Projection {
    /// Full horizontal field of view in radians.
    Perspective { fov_x: f32 },
    Orthographic { scale: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_x: std::f32::consts::FRAC_PI_2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraData {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    #[default]
    Sun,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightData {
    pub kind: LightKind,
    pub color: Vec3,
    /// Shadow frustum for sun lights.
    pub near: f32,
    pub far: f32,
    pub size: f32,
    /// Attenuation range for point lights.
    pub range: f32,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            kind: LightKind::Sun,
            color: Vec3::ONE,
            near: 1.0,
            far: 100.0,
            size: 30.0,
            range: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerData {
    /// Raw sound file path.
    pub sound: String,
}

// ============================================================================
// Widgets / Constraints / Colliders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextData {
    pub text: String,
    /// Raw font file path.
    pub font: String,
    pub color: Vec4,
    pub size: f32,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: String::new(),
            color: Vec4::ONE,
            size: 1.0,
            horizontal_align: HorizontalAlign::default(),
            vertical_align: VerticalAlign::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

/// Screen placer constraint: keeps its children anchored to screen edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintData {
    pub anchors: Vec<Anchor>,
    /// Width / height ratio the layout was authored for.
    pub ratio: f32,
}

impl Default for ConstraintData {
    fn default() -> Self {
        Self {
            anchors: Vec::new(),
            ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ColliderData {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

/// Scene skybox, referencing the up face of a six-image cube set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyboxData {
    pub name: String,
    /// Raw path of the `-up.png` face image.
    pub texture: String,
}
