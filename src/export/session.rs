//! Discovery pass.
//!
//! Walks every scene depth-first and registers each entity before anything
//! that references it, so every payload embeds final ids.

use glam::Mat4;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use super::shader::ShaderCompiler;
use crate::config::ExportOptions;
use crate::errors::{ExportError, Result};
use crate::mesh::{BoundingSphere, content_digest, encode_mesh};
use crate::registry::payload::{
    AudioPayload, AudioType, CONSTRAINT_TYPE_PLACER, CameraPayload, ConstraintPayload,
    FONT_TYPE_TRUETYPE, FontPayload, LightPayload, LightType, MESH_TYPE_BASIC, MeshPayload,
    ModelPayload, ModelType, RenderablePayload, SKYBOX_TYPE_BASIC, ScenePayload, SceneType,
    ShaderPayload, SkyboxPayload, WidgetPayload,
};
use crate::registry::{
    EntityId, EntityKind, EntityRegistry, ModelRef, OriginState, Payload, split_copy_name,
};
use crate::scene::{
    LightKind, MaterialData, MeshData, ObjectKind, PROPERTY_DYNAMIC_PART, PROPERTY_DYNAMIC_PARTED,
    SceneGraph, SceneRecord, SkyboxData,
};
use crate::shading::{Shading, classify};

/// Tolerance for treating an origin's world matrix as identity.
const IDENTITY_EPSILON: f32 = 1e-5;

/// Owns all per-export state. Nothing outlives one export call.
pub struct ExportSession<'g, G: SceneGraph> {
    pub(super) graph: &'g G,
    pub(super) registry: EntityRegistry,
    pub(super) basis: Mat4,
    basis_inverse: Mat4,
    discovered: FxHashMap<G::Object, EntityId>,
}

impl<'g, G: SceneGraph> ExportSession<'g, G> {
    pub fn new(graph: &'g G, options: &ExportOptions) -> Self {
        let basis = options.basis();
        Self {
            graph,
            registry: EntityRegistry::new(options.enforce_name_prefixes),
            basis,
            basis_inverse: basis.inverse(),
            discovered: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn into_registry(self) -> EntityRegistry {
        self.registry
    }

    /// Registers every entity reachable from the graph's scenes.
    pub fn discover(&mut self) -> Result<()> {
        let scenes = self.graph.scenes();
        if scenes.is_empty() {
            warn!("The scene graph has no scenes, only bootstrap shaders will be exported");
        }
        for scene in &scenes {
            self.discover_scene(scene)?;
        }
        info!(
            "Discovery complete: {} entities, {} instances",
            self.registry.len(),
            self.registry.instances().len()
        );
        Ok(())
    }

    /// Fills every shader entity with its compiled stages.
    pub fn compile_shaders(&mut self, compiler: &mut dyn ShaderCompiler) -> Result<()> {
        let pending: Vec<EntityId> = self
            .registry
            .entities(EntityKind::Shader)
            .into_iter()
            .filter(|e| e.payload.is_none())
            .map(|e| e.id)
            .collect();
        for id in pending {
            let shading = Shading::from_code(id.0)
                .ok_or_else(|| ExportError::Internal(format!("shader id {id} is not a shading code")))?;
            let stages = compiler.compile(&shading)?;
            self.registry
                .set_payload(id, Payload::Shader(ShaderPayload { shading, stages }))?;
        }
        Ok(())
    }

    /// Source matrix expressed in the target basis.
    fn convert(&self, matrix: Mat4) -> Mat4 {
        self.basis * matrix * self.basis_inverse
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    fn discover_scene(&mut self, scene: &SceneRecord<G::Object>) -> Result<()> {
        let graph = self.graph;
        let scene_type = SceneType::from(scene.kind);
        let id = self
            .registry
            .register(EntityKind::Scene, &scene.name, scene_type.type_id())?;

        let mut payload = ScenePayload {
            scene_type,
            cameras: Vec::new(),
            audios: Vec::new(),
            lights: Vec::new(),
            models: Vec::new(),
            constraints: Vec::new(),
            skybox: None,
            ambient: scene.ambient,
        };

        for &object in &scene.objects {
            match graph.kind(object) {
                ObjectKind::Camera => payload.cameras.push(self.camera(object)?),
                ObjectKind::Light => payload.lights.push(self.light(object)?),
                ObjectKind::Speaker => payload.audios.push(self.audio(object, AudioType::Music)?),
                ObjectKind::Constraint => payload.constraints.push(self.constraint(object)?),
                ObjectKind::Mesh | ObjectKind::Text | ObjectKind::Empty => {
                    payload.models.push(self.model_ref(object, Mat4::IDENTITY)?);
                }
            }
        }

        if payload.cameras.is_empty() {
            return Err(ExportError::scene(&scene.name, "a scene needs at least one camera"));
        }
        if let Some(skybox) = &scene.skybox {
            payload.skybox = Some(self.skybox(skybox)?);
        }

        debug!(
            "Scene '{}': {} cameras, {} lights, {} models",
            scene.name,
            payload.cameras.len(),
            payload.lights.len(),
            payload.models.len()
        );
        self.registry.set_payload(id, Payload::Scene(payload))
    }

    fn skybox(&mut self, skybox: &SkyboxData) -> Result<EntityId> {
        let faces = self.cube_faces_from_up(&skybox.name, &skybox.texture)?;
        let texture = self.cube_texture(faces)?;
        let id = self
            .registry
            .register(EntityKind::Skybox, &skybox.name, SKYBOX_TYPE_BASIC)?;
        self.registry
            .set_payload(id, Payload::Skybox(SkyboxPayload { texture }))?;
        Ok(id)
    }

    // ========================================================================
    // Cameras / Lights / Audio / Constraints
    // ========================================================================

    fn camera(&mut self, object: G::Object) -> Result<EntityId> {
        if let Some(&id) = self.discovered.get(&object) {
            return Ok(id);
        }
        let graph = self.graph;
        let name = graph.name(object);
        let data = *graph
            .camera(object)
            .ok_or_else(|| ExportError::model(name, "camera object carries no camera data"))?;
        let payload = CameraPayload {
            matrix: self.convert(graph.world_matrix(object)),
            data,
        };
        let id = self
            .registry
            .register(EntityKind::Camera, name, payload.camera_type().type_id())?;
        self.registry.set_payload(id, Payload::Camera(payload))?;
        self.discovered.insert(object, id);
        Ok(id)
    }

    fn light(&mut self, object: G::Object) -> Result<EntityId> {
        if let Some(&id) = self.discovered.get(&object) {
            return Ok(id);
        }
        let graph = self.graph;
        let name = graph.name(object);
        let data = *graph
            .light(object)
            .ok_or_else(|| ExportError::model(name, "light object carries no light data"))?;
        let light_type = match data.kind {
            LightKind::Sun => LightType::Sun,
            LightKind::Point => LightType::Point,
        };
        let id = self
            .registry
            .register(EntityKind::Light, name, light_type.type_id())?;
        let payload = LightPayload {
            matrix: self.convert(graph.world_matrix(object)),
            data,
        };
        self.registry.set_payload(id, Payload::Light(payload))?;
        self.discovered.insert(object, id);
        Ok(id)
    }

    /// Root speakers play music; parented speakers are positional.
    fn audio(&mut self, object: G::Object, audio_type: AudioType) -> Result<EntityId> {
        let graph = self.graph;
        let name = graph.name(object);
        let speaker = graph
            .speaker(object)
            .ok_or_else(|| ExportError::model(name, "speaker object carries no speaker data"))?;
        if speaker.sound.trim().is_empty() {
            return Err(ExportError::model(name, "speaker has no sound file"));
        }
        let path = graph.resolve_path(speaker.sound.trim());
        let registration = self.registry.lookup_or_create(
            EntityKind::Audio,
            &path.to_string_lossy(),
            name,
            audio_type.type_id(),
        )?;
        if registration.is_created() {
            let bytes = self.read(&path)?;
            self.registry.set_payload(
                registration.id(),
                Payload::Audio(AudioPayload { audio_type, bytes }),
            )?;
        }
        Ok(registration.id())
    }

    fn constraint(&mut self, object: G::Object) -> Result<EntityId> {
        if let Some(&id) = self.discovered.get(&object) {
            return Ok(id);
        }
        let graph = self.graph;
        let name = graph.name(object);
        let data = graph
            .constraint(object)
            .ok_or_else(|| ExportError::model(name, "constraint object carries no constraint data"))?;
        let id = self
            .registry
            .register(EntityKind::Constraint, name, CONSTRAINT_TYPE_PLACER)?;
        self.discovered.insert(object, id);

        let mut children = Vec::new();
        for child in graph.children(object) {
            match graph.kind(child) {
                ObjectKind::Mesh | ObjectKind::Text | ObjectKind::Empty => {
                    children.push(self.model_ref(child, Mat4::IDENTITY)?);
                }
                other => {
                    return Err(ExportError::model(
                        name,
                        format!("{other} '{}' cannot be placed by a constraint", graph.name(child)),
                    ));
                }
            }
        }

        self.registry.set_payload(
            id,
            Payload::Constraint(ConstraintPayload {
                anchors: data.anchors.clone(),
                ratio: data.ratio,
                children,
            }),
        )?;
        Ok(id)
    }

    // ========================================================================
    // Models
    // ========================================================================

    /// Reference to `object` as a model, resolving `<origin>.NNN` copies.
    fn model_ref(&mut self, object: G::Object, parent_inverse: Mat4) -> Result<ModelRef> {
        let graph = self.graph;
        let name = graph.name(object);
        let Some(origin_name) = split_copy_name(name) else {
            return Ok(ModelRef::Model(self.model(object, parent_inverse)?));
        };

        let origin = graph
            .find_object(origin_name)
            .ok_or_else(|| ExportError::instance(name, format!("origin '{origin_name}' does not exist")))?;
        let state = OriginState {
            is_root: graph.is_root(origin),
            identity_transform: graph
                .world_matrix(origin)
                .abs_diff_eq(Mat4::IDENTITY, IDENTITY_EPSILON),
            dynamic_parted: graph.has_flag(origin, PROPERTY_DYNAMIC_PARTED),
        };
        if !graph.children(object).is_empty() {
            return Err(ExportError::instance(name, "a copy cannot have children of its own"));
        }
        let origin_id = self.model(origin, Mat4::IDENTITY)?;
        self.registry.register_instance(name, origin_id, state)?;

        Ok(ModelRef::Instance {
            matrix: parent_inverse * self.convert(graph.world_matrix(object)),
            origin: origin_id,
        })
    }

    fn model(&mut self, object: G::Object, parent_inverse: Mat4) -> Result<EntityId> {
        if let Some(&id) = self.discovered.get(&object) {
            return Ok(id);
        }
        let graph = self.graph;
        let name = graph.name(object);
        let kind = graph.kind(object);
        if !matches!(kind, ObjectKind::Mesh | ObjectKind::Text | ObjectKind::Empty) {
            return Err(ExportError::model(name, format!("a {kind} object cannot be a model")));
        }
        self.check_dynamism(object)?;

        let model_type = if kind == ObjectKind::Text {
            ModelType::Widget
        } else if graph.has_flag(object, PROPERTY_DYNAMIC_PART) {
            ModelType::Dynamic
        } else {
            ModelType::Static
        };
        let dynamic = model_type == ModelType::Dynamic;

        let id = self
            .registry
            .register(EntityKind::Model, name, model_type.type_id())?;
        self.discovered.insert(object, id);

        let world = self.convert(graph.world_matrix(object));
        let (matrix, children_inverse) = if dynamic {
            (world, world.inverse())
        } else {
            (parent_inverse * world, parent_inverse)
        };

        let mut occlusion = BoundingSphere::EMPTY;
        let mut renderable = None;
        if kind == ObjectKind::Mesh {
            let mesh = graph
                .mesh(object)
                .ok_or_else(|| ExportError::model(name, "mesh object carries no mesh data"))?;
            let basis = self.basis;
            occlusion = BoundingSphere::from_points(mesh.positions.iter().map(move |&p| basis.transform_point3(p)));

            let materials = graph.materials(object);
            if graph.is_root(object) || dynamic {
                if !materials.is_empty() {
                    return Err(ExportError::model(
                        name,
                        "root and dynamic models carry a material-less occlusion mesh",
                    ));
                }
            } else {
                let [material] = materials else {
                    return Err(ExportError::model(
                        name,
                        format!("expected exactly one material, found {}", materials.len()),
                    ));
                };
                renderable = Some(self.renderable(name, mesh, material)?);
            }
        }

        let widget = if kind == ObjectKind::Text {
            Some(self.widget(object)?)
        } else {
            None
        };

        let mut audios = Vec::new();
        let mut children = Vec::new();
        for child in graph.children(object) {
            match graph.kind(child) {
                ObjectKind::Speaker => audios.push(self.audio(child, AudioType::Object)?),
                ObjectKind::Mesh | ObjectKind::Text | ObjectKind::Empty => {
                    children.push(self.model_ref(child, children_inverse)?);
                }
                other @ (ObjectKind::Camera | ObjectKind::Light | ObjectKind::Constraint) => {
                    return Err(ExportError::model(
                        name,
                        format!("{other} '{}' cannot be a model child", graph.name(child)),
                    ));
                }
            }
        }

        if renderable.is_none() && children.is_empty() && widget.is_none() {
            return Err(ExportError::model(name, "a model needs a renderable mesh or a model child"));
        }

        self.registry.set_payload(
            id,
            Payload::Model(ModelPayload {
                model_type,
                matrix,
                occlusion,
                renderable,
                widget,
                collider: graph.collider(object).copied(),
                audios,
                children,
            }),
        )?;
        Ok(id)
    }

    fn renderable(&mut self, object: &str, mesh: &MeshData, material: &MaterialData) -> Result<RenderablePayload> {
        let classified = classify(material, self)?;
        self.registry.register_shader(classified.shading);

        let attributes = classified.shading.requirements();
        let mesh_name = if mesh.name.is_empty() { object } else { mesh.name.as_str() };
        let key = format!("{mesh_name}#{}#{:016x}", attributes.bits(), content_digest(mesh));
        let registration = self
            .registry
            .lookup_or_create(EntityKind::Mesh, &key, mesh_name, MESH_TYPE_BASIC)?;
        if registration.is_created() {
            let buffer = encode_mesh(object, mesh, attributes, self.basis)?;
            debug!(
                "Mesh '{mesh_name}': {} vertices, {} indices",
                buffer.vertex_count(),
                buffer.indices.len()
            );
            self.registry
                .set_payload(registration.id(), Payload::Mesh(MeshPayload { buffer }))?;
        }

        Ok(RenderablePayload {
            material: classified,
            mesh: registration.id(),
        })
    }

    fn widget(&mut self, object: G::Object) -> Result<WidgetPayload> {
        let graph = self.graph;
        let name = graph.name(object);
        let text = graph
            .text(object)
            .ok_or_else(|| ExportError::model(name, "text object carries no text data"))?;
        if text.font.trim().is_empty() {
            return Err(ExportError::model(name, "text has no font file"));
        }
        let path = graph.resolve_path(text.font.trim());
        let font_name = path
            .file_stem()
            .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
        let registration =
            self.registry
                .lookup_or_create(EntityKind::Font, &path.to_string_lossy(), &font_name, FONT_TYPE_TRUETYPE)?;
        if registration.is_created() {
            let bytes = self.read(&path)?;
            self.registry
                .set_payload(registration.id(), Payload::Font(FontPayload { bytes }))?;
        }
        Ok(WidgetPayload {
            text: text.text.clone(),
            font: registration.id(),
            color: text.color,
            size: text.size,
            horizontal_align: text.horizontal_align,
            vertical_align: text.vertical_align,
        })
    }

    /// `dynamic-parted` must be set exactly on objects whose subtree holds a `dynamic-part`.
    fn check_dynamism(&self, object: G::Object) -> Result<()> {
        let graph = self.graph;
        let parted = graph.has_flag(object, PROPERTY_DYNAMIC_PARTED);
        match (parted, self.has_dynamic_part(object)) {
            (true, false) => Err(ExportError::model(
                graph.name(object),
                format!("has '{PROPERTY_DYNAMIC_PARTED}' but no '{PROPERTY_DYNAMIC_PART}' in its subtree"),
            )),
            (false, true) => Err(ExportError::model(
                graph.name(object),
                format!("has a '{PROPERTY_DYNAMIC_PART}' in its subtree but no '{PROPERTY_DYNAMIC_PARTED}'"),
            )),
            _ => Ok(()),
        }
    }

    fn has_dynamic_part(&self, object: G::Object) -> bool {
        self.graph.has_flag(object, PROPERTY_DYNAMIC_PART)
            || self
                .graph
                .children(object)
                .into_iter()
                .any(|child| self.has_dynamic_part(child))
    }
}
