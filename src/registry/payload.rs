//! Kind-specific entity payloads.
//!
//! Payloads are built during discovery and consumed by the body writer. Every
//! payload knows the type discriminant that opens its body.

use glam::{Mat4, Vec3, Vec4};

use super::{EntityId, EntityKind};
use crate::mesh::{BoundingSphere, MeshBuffer};
use crate::scene::{
    Anchor, CameraData, ColliderData, HorizontalAlign, LightData, LightKind, Projection, SceneKind,
    VerticalAlign,
};
use crate::shading::{ClassifiedMaterial, Shading};

/// Declares a `u64`-valued discriminant enum.
macro_rules! type_ids {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub const fn type_id(self) -> u64 {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }
    };
}

type_ids! { CameraType { Perspective = 1, Orthographic = 2 } }
type_ids! { AudioType { Music = 10, Object = 20 } }
type_ids! { LightType { Sun = 10, Point = 20 } }
type_ids! { TextureType { D2 = 10, Cube = 20, D3 = 30 } }
type_ids! { ModelType { Static = 10, Dynamic = 20, Widget = 30 } }
type_ids! { SceneType { Game = 10, Ui = 20 } }

pub const FONT_TYPE_TRUETYPE: u64 = 10;
pub const MESH_TYPE_BASIC: u64 = 10;
pub const SKYBOX_TYPE_BASIC: u64 = 10;
pub const CONSTRAINT_TYPE_PLACER: u64 = 10;
pub const COLLIDER_TYPE_NONE: u64 = 0;
pub const COLLIDER_TYPE_SPHERE: u64 = 10;
pub const COLLIDER_TYPE_AABB: u64 = 20;

impl From<SceneKind> for SceneType {
    fn from(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Game => Self::Game,
            SceneKind::Ui => Self::Ui,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPayload {
    pub shading: Shading,
    /// Compiled stage binaries, empty when no backend is configured.
    pub stages: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraPayload {
    pub matrix: Mat4,
    pub data: CameraData,
}

impl CameraPayload {
    #[must_use]
    pub fn camera_type(&self) -> CameraType {
        match self.data.projection {
            Projection::Perspective { .. } => CameraType::Perspective,
            Projection::Orthographic { .. } => CameraType::Orthographic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub audio_type: AudioType,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightPayload {
    pub matrix: Mat4,
    pub data: LightData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TexturePayload {
    pub texture_type: TextureType,
    /// One image for 2D and 3D textures, six faces for cube textures.
    pub blobs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontPayload {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    pub buffer: MeshBuffer,
}

/// How a parent, constraint or scene points at a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelRef {
    Model(EntityId),
    /// Placement of a copy; the id is the origin's.
    Instance { matrix: Mat4, origin: EntityId },
}

impl ModelRef {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Model(id) | Self::Instance { origin: id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderablePayload {
    pub material: ClassifiedMaterial,
    pub mesh: EntityId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetPayload {
    pub text: String,
    pub font: EntityId,
    pub color: Vec4,
    pub size: f32,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPayload {
    pub model_type: ModelType,
    /// Pre-composed placement for static models, world matrix for dynamic ones.
    pub matrix: Mat4,
    pub occlusion: BoundingSphere,
    pub renderable: Option<RenderablePayload>,
    pub widget: Option<WidgetPayload>,
    pub collider: Option<ColliderData>,
    pub audios: Vec<EntityId>,
    pub children: Vec<ModelRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkyboxPayload {
    pub texture: EntityId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintPayload {
    pub anchors: Vec<Anchor>,
    pub ratio: f32,
    pub children: Vec<ModelRef>,
}

impl ConstraintPayload {
    /// Anchor set packed into one byte: left, right, top, bottom, center.
    #[must_use]
    pub fn anchor_flags(&self) -> u8 {
        self.anchors.iter().fold(0, |flags, anchor| {
            flags
                | match anchor {
                    Anchor::Left => 1,
                    Anchor::Right => 1 << 1,
                    Anchor::Top => 1 << 2,
                    Anchor::Bottom => 1 << 3,
                    Anchor::Center => 1 << 4,
                }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenePayload {
    pub scene_type: SceneType,
    pub cameras: Vec<EntityId>,
    pub audios: Vec<EntityId>,
    pub lights: Vec<EntityId>,
    pub models: Vec<ModelRef>,
    pub constraints: Vec<EntityId>,
    pub skybox: Option<EntityId>,
    pub ambient: Vec3,
}

/// Tagged payload, one variant per entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Shader(ShaderPayload),
    Camera(CameraPayload),
    Audio(AudioPayload),
    Light(LightPayload),
    Texture(TexturePayload),
    Font(FontPayload),
    Mesh(MeshPayload),
    Model(ModelPayload),
    Skybox(SkyboxPayload),
    Constraint(ConstraintPayload),
    Scene(ScenePayload),
}

impl Payload {
    /// The discriminant written at the start of the body.
    #[must_use]
    pub fn type_id(&self) -> u64 {
        match self {
            Self::Shader(p) => p.shading.code(),
            Self::Camera(p) => p.camera_type().type_id(),
            Self::Audio(p) => p.audio_type.type_id(),
            Self::Light(p) => match p.data.kind {
                LightKind::Sun => LightType::Sun.type_id(),
                LightKind::Point => LightType::Point.type_id(),
            },
            Self::Texture(p) => p.texture_type.type_id(),
            Self::Font(_) => FONT_TYPE_TRUETYPE,
            Self::Mesh(_) => MESH_TYPE_BASIC,
            Self::Model(p) => p.model_type.type_id(),
            Self::Skybox(_) => SKYBOX_TYPE_BASIC,
            Self::Constraint(_) => CONSTRAINT_TYPE_PLACER,
            Self::Scene(p) => p.scene_type.type_id(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Shader(_) => EntityKind::Shader,
            Self::Camera(_) => EntityKind::Camera,
            Self::Audio(_) => EntityKind::Audio,
            Self::Light(_) => EntityKind::Light,
            Self::Texture(_) => EntityKind::Texture,
            Self::Font(_) => EntityKind::Font,
            Self::Mesh(_) => EntityKind::Mesh,
            Self::Model(_) => EntityKind::Model,
            Self::Skybox(_) => EntityKind::Skybox,
            Self::Constraint(_) => EntityKind::Constraint,
            Self::Scene(_) => EntityKind::Scene,
        }
    }

    /// Ids this payload embeds, grouped by the kind they belong to.
    #[must_use]
    pub fn references(&self) -> Vec<(EntityKind, EntityId)> {
        let models = |refs: &[ModelRef]| refs.iter().map(|r| (EntityKind::Model, r.id())).collect::<Vec<_>>();
        match self {
            Self::Model(p) => {
                let mut out = Vec::new();
                if let Some(r) = &p.renderable {
                    out.push((EntityKind::Shader, EntityId(r.material.shading.code())));
                    out.extend(r.material.texture_ids().map(|id| (EntityKind::Texture, id)));
                    out.push((EntityKind::Mesh, r.mesh));
                }
                if let Some(w) = &p.widget {
                    out.push((EntityKind::Font, w.font));
                }
                out.extend(p.audios.iter().map(|&id| (EntityKind::Audio, id)));
                out.extend(models(&p.children));
                out
            }
            Self::Skybox(p) => vec![(EntityKind::Texture, p.texture)],
            Self::Constraint(p) => models(&p.children),
            Self::Scene(p) => {
                let mut out = Vec::new();
                out.extend(p.cameras.iter().map(|&id| (EntityKind::Camera, id)));
                out.extend(p.audios.iter().map(|&id| (EntityKind::Audio, id)));
                out.extend(p.lights.iter().map(|&id| (EntityKind::Light, id)));
                out.extend(models(&p.models));
                out.extend(p.constraints.iter().map(|&id| (EntityKind::Constraint, id)));
                out.extend(p.skybox.map(|id| (EntityKind::Skybox, id)));
                out
            }
            Self::Shader(_)
            | Self::Camera(_)
            | Self::Audio(_)
            | Self::Light(_)
            | Self::Texture(_)
            | Self::Font(_)
            | Self::Mesh(_) => Vec::new(),
        }
    }
}
