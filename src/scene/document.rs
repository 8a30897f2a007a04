use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::data::{
    CameraData, ColliderData, ConstraintData, LightData, MaterialData, MeshData, SkyboxData,
    SpeakerData, TextData,
};
use super::{ObjectKind, SceneGraph, SceneKind, SceneRecord};
use crate::errors::{ExportError, Result};

new_key_type! {
    pub struct ObjectKey;
}

/// Serialised form of an object and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDesc {
    pub name: String,
    pub kind: ObjectKind,
    /// Local transform relative to the parent, column-major.
    pub transform: Mat4,
    pub properties: BTreeMap<String, f32>,
    pub mesh: Option<MeshData>,
    pub materials: Vec<MaterialData>,
    pub camera: Option<CameraData>,
    pub light: Option<LightData>,
    pub speaker: Option<SpeakerData>,
    pub text: Option<TextData>,
    pub constraint: Option<ConstraintData>,
    pub collider: Option<ColliderData>,
    pub children: Vec<ObjectDesc>,
}

impl ObjectDesc {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: f32) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialData) -> Self {
        self.materials.push(material);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: ObjectDesc) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub name: String,
    pub kind: SceneKind,
    pub ambient: Vec3,
    /// Names of root objects belonging to this scene.
    pub objects: Vec<String>,
    pub skybox: Option<SkyboxData>,
}

/// Top-level JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDesc {
    /// Base directory for `//`-relative and relative paths.
    pub root_dir: Option<PathBuf>,
    pub objects: Vec<ObjectDesc>,
    pub scenes: Vec<SceneDesc>,
}

#[derive(Debug, Clone)]
struct ObjectNode {
    name: String,
    kind: ObjectKind,
    parent: Option<ObjectKey>,
    children: Vec<ObjectKey>,
    world: Mat4,
    properties: BTreeMap<String, f32>,
    mesh: Option<MeshData>,
    materials: Vec<MaterialData>,
    camera: Option<CameraData>,
    light: Option<LightData>,
    speaker: Option<SpeakerData>,
    text: Option<TextData>,
    constraint: Option<ConstraintData>,
    collider: Option<ColliderData>,
}

/// In-memory scene graph.
///
/// Objects are stored flat in a slot map; names are unique across the
/// document, mirroring editor data blocks. File contents registered with
/// [`SceneDocument::insert_file`] shadow the filesystem.
#[derive(Debug, Default)]
pub struct SceneDocument {
    root_dir: PathBuf,
    objects: SlotMap<ObjectKey, ObjectNode>,
    names: FxHashMap<String, ObjectKey>,
    scenes: Vec<SceneDesc>,
    files: FxHashMap<PathBuf, Vec<u8>>,
}

impl SceneDocument {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_desc(desc: DocumentDesc, fallback_root: &Path) -> Result<Self> {
        let root = desc.root_dir.unwrap_or_else(|| fallback_root.to_path_buf());
        let mut document = Self::new(root);
        for object in desc.objects {
            document.add_object(object, None)?;
        }
        for scene in desc.scenes {
            document.add_scene(scene)?;
        }
        Ok(document)
    }

    pub fn from_json_str(json: &str, root_dir: &Path) -> Result<Self> {
        let desc: DocumentDesc = serde_json::from_str(json)?;
        Self::from_desc(desc, root_dir)
    }

    /// Loads a JSON document; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ExportError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let root = path.parent().unwrap_or(Path::new("."));
        Self::from_json_str(&json, root)
    }

    #[inline]
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Inserts an object subtree under `parent` (or as a root).
    pub fn add_object(&mut self, desc: ObjectDesc, parent: Option<ObjectKey>) -> Result<ObjectKey> {
        if self.names.contains_key(&desc.name) {
            return Err(ExportError::Naming {
                name: desc.name,
                reason: "object name is used more than once".to_string(),
            });
        }
        let parent_world = match parent {
            Some(p) => {
                self.objects
                    .get(p)
                    .ok_or_else(|| ExportError::Internal(format!("unknown parent of '{}'", desc.name)))?
                    .world
            }
            None => Mat4::IDENTITY,
        };

        let ObjectDesc {
            name,
            kind,
            transform,
            properties,
            mesh,
            materials,
            camera,
            light,
            speaker,
            text,
            constraint,
            collider,
            children,
        } = desc;

        let key = self.objects.insert(ObjectNode {
            name: name.clone(),
            kind,
            parent,
            children: Vec::new(),
            world: parent_world * transform,
            properties,
            mesh,
            materials,
            camera,
            light,
            speaker,
            text,
            constraint,
            collider,
        });
        self.names.insert(name, key);
        if let Some(p) = parent
            && let Some(node) = self.objects.get_mut(p)
        {
            node.children.push(key);
        }

        for child in children {
            self.add_object(child, Some(key))?;
        }
        Ok(key)
    }

    /// Adds a scene; every listed object must exist and be a root.
    pub fn add_scene(&mut self, scene: SceneDesc) -> Result<()> {
        for name in &scene.objects {
            let Some(&key) = self.names.get(name) else {
                return Err(ExportError::scene(&scene.name, format!("unknown object '{name}'")));
            };
            if self.objects[key].parent.is_some() {
                return Err(ExportError::scene(
                    &scene.name,
                    format!("object '{name}' is not a root object"),
                ));
            }
        }
        self.scenes.push(scene);
        Ok(())
    }

    /// Registers in-memory contents for a path, as it would be resolved.
    pub fn insert_file(&mut self, raw_path: &str, bytes: Vec<u8>) {
        let path = self.resolve_path(raw_path);
        self.files.insert(path, bytes);
    }

    #[must_use]
    pub fn key(&self, name: &str) -> Option<ObjectKey> {
        self.names.get(name).copied()
    }

    fn node(&self, key: ObjectKey) -> &ObjectNode {
        &self.objects[key]
    }
}

impl SceneGraph for SceneDocument {
    type Object = ObjectKey;

    fn scenes(&self) -> Vec<SceneRecord<ObjectKey>> {
        self.scenes
            .iter()
            .map(|scene| SceneRecord {
                name: scene.name.clone(),
                kind: scene.kind,
                ambient: scene.ambient,
                objects: scene.objects.iter().filter_map(|n| self.key(n)).collect(),
                skybox: scene.skybox.clone(),
            })
            .collect()
    }

    fn find_object(&self, name: &str) -> Option<ObjectKey> {
        self.key(name)
    }

    fn name(&self, object: ObjectKey) -> &str {
        &self.node(object).name
    }

    fn kind(&self, object: ObjectKey) -> ObjectKind {
        self.node(object).kind
    }

    fn parent(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.node(object).parent
    }

    fn children(&self, object: ObjectKey) -> Vec<ObjectKey> {
        self.node(object).children.clone()
    }

    fn world_matrix(&self, object: ObjectKey) -> Mat4 {
        self.node(object).world
    }

    fn property(&self, object: ObjectKey, key: &str) -> Option<f32> {
        self.node(object).properties.get(key).copied()
    }

    fn mesh(&self, object: ObjectKey) -> Option<&MeshData> {
        self.node(object).mesh.as_ref()
    }

    fn materials(&self, object: ObjectKey) -> &[MaterialData] {
        &self.node(object).materials
    }

    fn camera(&self, object: ObjectKey) -> Option<&CameraData> {
        self.node(object).camera.as_ref()
    }

    fn light(&self, object: ObjectKey) -> Option<&LightData> {
        self.node(object).light.as_ref()
    }

    fn speaker(&self, object: ObjectKey) -> Option<&SpeakerData> {
        self.node(object).speaker.as_ref()
    }

    fn text(&self, object: ObjectKey) -> Option<&TextData> {
        self.node(object).text.as_ref()
    }

    fn constraint(&self, object: ObjectKey) -> Option<&ConstraintData> {
        self.node(object).constraint.as_ref()
    }

    fn collider(&self, object: ObjectKey) -> Option<&ColliderData> {
        self.node(object).collider.as_ref()
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let raw = raw.trim();
        let joined = if let Some(relative) = raw.strip_prefix("//") {
            self.root_dir.join(relative)
        } else {
            let path = Path::new(raw);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root_dir.join(path)
            }
        };
        normalize_path(&joined)
    }

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        if let Some(bytes) = self.files.get(path) {
            return Ok(bytes.clone());
        }
        std::fs::read(path)
    }
}

/// Lexically removes `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_matrix_composes_parent() {
        let mut doc = SceneDocument::new("/assets");
        let parent = ObjectDesc::new("root", ObjectKind::Mesh)
            .with_transform(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .with_child(
                ObjectDesc::new("child", ObjectKind::Mesh)
                    .with_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
            );
        doc.add_object(parent, None).unwrap();

        let child = doc.key("child").unwrap();
        let world = doc.world_matrix(child);
        assert_eq!(world.w_axis.truncate(), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(doc.parent(child), doc.key("root"));
    }

    #[test]
    fn test_duplicate_object_name_rejected() {
        let mut doc = SceneDocument::new("/assets");
        doc.add_object(ObjectDesc::new("a", ObjectKind::Camera), None).unwrap();
        let err = doc.add_object(ObjectDesc::new("a", ObjectKind::Light), None);
        assert!(matches!(err, Err(ExportError::Naming { .. })));
    }

    #[test]
    fn test_resolve_path_variants() {
        let doc = SceneDocument::new("/assets/level");
        assert_eq!(doc.resolve_path("//tex/a.png"), PathBuf::from("/assets/level/tex/a.png"));
        assert_eq!(doc.resolve_path("../shared/b.png"), PathBuf::from("/assets/shared/b.png"));
        assert_eq!(doc.resolve_path("/abs/./c.png"), PathBuf::from("/abs/c.png"));
    }

    #[test]
    fn test_in_memory_file_shadows_disk() {
        let mut doc = SceneDocument::new("/nonexistent");
        doc.insert_file("//a.ogg", vec![1, 2, 3]);
        let path = doc.resolve_path("//a.ogg");
        assert_eq!(doc.read_file(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_scene_requires_root_objects() {
        let mut doc = SceneDocument::new("/assets");
        doc.add_object(
            ObjectDesc::new("root", ObjectKind::Mesh).with_child(ObjectDesc::new("leaf", ObjectKind::Mesh)),
            None,
        )
        .unwrap();
        let scene = SceneDesc {
            name: "main".into(),
            objects: vec!["leaf".into()],
            ..Default::default()
        };
        assert!(matches!(doc.add_scene(scene), Err(ExportError::Scene { .. })));
    }
}
