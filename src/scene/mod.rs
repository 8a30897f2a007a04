//! Scene Graph Adapter
//!
//! The exporter never walks an editor's data directly. It consumes a scene
//! through the read-only [`SceneGraph`] trait:
//! - Scenes: name, kind, ambient colour, root objects, optional skybox
//! - Objects: name, kind tag, hierarchy, world transform, custom properties
//! - Attached data: mesh, materials, camera, light, speaker, text, constraint, collider
//! - Files: path resolution and byte access for textures, fonts and audio
//!
//! [`SceneDocument`] is the in-memory implementation used by the CLI and tests.

pub mod data;
pub mod document;

use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub use data::{
    Anchor, CameraData, ColliderData, ConstraintData, HorizontalAlign, LightData, LightKind,
    MaterialData, MeshData, MirrorData, Projection, SkyboxData, SpeakerData, TextData,
    TextureRef, TextureSlot, TextureSource, UvLayer, VerticalAlign,
};
pub use document::{DocumentDesc, ObjectDesc, ObjectKey, SceneDesc, SceneDocument};

/// Custom property marking an object as a dynamic (independently moving) part.
pub const PROPERTY_DYNAMIC_PART: &str = "dynamic-part";
/// Custom property marking an object whose subtree contains a dynamic part.
pub const PROPERTY_DYNAMIC_PARTED: &str = "dynamic-parted";

/// Kind tag of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
    Speaker,
    Text,
    Constraint,
    #[default]
    Empty,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Camera => "camera",
            Self::Light => "light",
            Self::Speaker => "speaker",
            Self::Text => "text",
            Self::Constraint => "constraint",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Scene flavour, written as the scene body's type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    #[default]
    Game,
    Ui,
}

/// One scene as seen by the exporter.
#[derive(Debug, Clone)]
pub struct SceneRecord<O> {
    pub name: String,
    pub kind: SceneKind,
    pub ambient: Vec3,
    /// Root-level objects in declaration order.
    pub objects: Vec<O>,
    pub skybox: Option<SkyboxData>,
}

/// Read-only query interface over a source scene graph.
pub trait SceneGraph {
    /// Opaque, cheap object handle.
    type Object: Copy + Eq + Hash + fmt::Debug;

    fn scenes(&self) -> Vec<SceneRecord<Self::Object>>;

    /// Looks an object up by its unique name.
    fn find_object(&self, name: &str) -> Option<Self::Object>;

    fn name(&self, object: Self::Object) -> &str;

    fn kind(&self, object: Self::Object) -> ObjectKind;

    fn parent(&self, object: Self::Object) -> Option<Self::Object>;

    fn children(&self, object: Self::Object) -> Vec<Self::Object>;

    fn world_matrix(&self, object: Self::Object) -> Mat4;

    /// Numeric custom property attached to the object.
    fn property(&self, object: Self::Object, key: &str) -> Option<f32>;

    fn mesh(&self, object: Self::Object) -> Option<&MeshData>;

    fn materials(&self, object: Self::Object) -> &[MaterialData];

    fn camera(&self, object: Self::Object) -> Option<&CameraData>;

    fn light(&self, object: Self::Object) -> Option<&LightData>;

    fn speaker(&self, object: Self::Object) -> Option<&SpeakerData>;

    fn text(&self, object: Self::Object) -> Option<&TextData>;

    fn constraint(&self, object: Self::Object) -> Option<&ConstraintData>;

    fn collider(&self, object: Self::Object) -> Option<&ColliderData>;

    /// Turns a raw (possibly document-relative) reference into an absolute path.
    fn resolve_path(&self, raw: &str) -> PathBuf;

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// A flag property counts as set when present and non-zero.
    fn has_flag(&self, object: Self::Object, key: &str) -> bool {
        self.property(object, key).is_some_and(|v| v != 0.0)
    }

    fn is_root(&self, object: Self::Object) -> bool {
        self.parent(object).is_none()
    }
}
