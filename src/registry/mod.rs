//! Entity Registry
//!
//! Assigns ids to every exportable entity and owns their payloads until the
//! writer consumes them.
//!
//! Three dedup disciplines coexist, selected per [`EntityKind`]:
//! - [`Dedup::None`]: every registration is a new entity; names must be unique
//! - [`Dedup::UniqueOrigin`]: like `None`, plus copies named `<origin>.NNN`
//!   resolve to the origin's id without owning a body
//! - [`Dedup::ContentAddressed`]: a lookup key (usually a resolved file path)
//!   maps to exactly one id, shared by every user of that key
//!
//! Shader ids are their shading codes. All other ids come from one counter
//! starting at [`FIRST_USER_ID`], above the whole shading code space.

pub mod payload;

use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

pub use payload::{ModelRef, Payload};

use crate::errors::{ExportError, Result};
use crate::shading::{self, Reserved, Shading};

/// First id handed out to non-shader entities.
pub const FIRST_USER_ID: u64 = 1024;

const _: () = assert!(shading::CODE_COUNT <= FIRST_USER_ID);

/// Process-unique entity identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedup {
    None,
    UniqueOrigin,
    ContentAddressed,
}

/// Entity kinds, declared in file write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Shader,
    Camera,
    Audio,
    Light,
    Texture,
    Font,
    Mesh,
    Model,
    Skybox,
    Constraint,
    Scene,
}

impl EntityKind {
    /// Table and body order of the file.
    pub const ALL: [EntityKind; 11] = [
        Self::Shader,
        Self::Camera,
        Self::Audio,
        Self::Light,
        Self::Texture,
        Self::Font,
        Self::Mesh,
        Self::Model,
        Self::Skybox,
        Self::Constraint,
        Self::Scene,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shader => "shader",
            Self::Camera => "camera",
            Self::Audio => "audio",
            Self::Light => "light",
            Self::Texture => "texture",
            Self::Font => "font",
            Self::Mesh => "mesh",
            Self::Model => "model",
            Self::Skybox => "skybox",
            Self::Constraint => "constraint",
            Self::Scene => "scene",
        }
    }

    #[must_use]
    pub const fn dedup(self) -> Dedup {
        match self {
            Self::Model => Dedup::UniqueOrigin,
            Self::Shader | Self::Audio | Self::Texture | Self::Font | Self::Mesh => Dedup::ContentAddressed,
            Self::Camera | Self::Light | Self::Skybox | Self::Constraint | Self::Scene => Dedup::None,
        }
    }

    /// Accepted name prefixes when prefix enforcement is on. Empty means unchecked.
    #[must_use]
    pub const fn name_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Camera => &["camera-"],
            Self::Light => &["light-"],
            Self::Audio => &["speaker-"],
            Self::Model => &["model-", "widget-"],
            Self::Constraint => &["constraint-"],
            Self::Scene => &["scene-"],
            Self::Shader | Self::Texture | Self::Font | Self::Mesh | Self::Skybox => &[],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Splits a copy name `<origin>.NNN` into its origin name.
#[must_use]
pub fn split_copy_name(name: &str) -> Option<&str> {
    let (origin, suffix) = name.rsplit_once('.')?;
    (!origin.is_empty() && suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit())).then_some(origin)
}

/// A registered entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    /// Lookup key of content-addressed entities.
    pub key: Option<String>,
    pub type_id: u64,
    /// Body position, known once pass 1 wrote it.
    pub offset: Option<u64>,
    pub payload: Option<Payload>,
}

/// Result of a content-addressed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(EntityId),
    Existing(EntityId),
}

impl Registration {
    #[must_use]
    pub fn id(self) -> EntityId {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }

    #[must_use]
    pub fn is_created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Facts about an origin object that decide whether it may be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginState {
    pub is_root: bool,
    pub identity_transform: bool,
    pub dynamic_parted: bool,
}

/// A placement of an origin model under another name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub origin: EntityId,
}

#[derive(Debug)]
pub struct EntityRegistry {
    enforce_prefixes: bool,
    next_id: u64,
    entities: Vec<Entity>,
    index: FxHashMap<EntityId, usize>,
    keys: FxHashMap<(EntityKind, String), EntityId>,
    names: FxHashMap<(EntityKind, String), EntityId>,
    instances: Vec<Instance>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}

impl EntityRegistry {
    /// Creates a registry with the bootstrap shaders already registered.
    #[must_use]
    pub fn new(enforce_prefixes: bool) -> Self {
        let mut registry = Self {
            enforce_prefixes,
            next_id: FIRST_USER_ID,
            entities: Vec::new(),
            index: FxHashMap::default(),
            keys: FxHashMap::default(),
            names: FxHashMap::default(),
            instances: Vec::new(),
        };
        for &reserved in Reserved::ALL {
            registry.register_shader(Shading::Reserved(reserved));
        }
        registry
    }

    /// Registers an entity that is not content-addressed. Names are unique per kind.
    pub fn register(&mut self, kind: EntityKind, name: &str, type_id: u64) -> Result<EntityId> {
        if kind.dedup() == Dedup::ContentAddressed {
            return Err(ExportError::Internal(format!(
                "{kind} entities are content-addressed, use lookup_or_create"
            )));
        }
        self.check_prefix(kind, name)?;
        if self.names.contains_key(&(kind, name.to_string())) {
            return Err(ExportError::DuplicateEntity {
                kind,
                name: name.to_string(),
            });
        }
        let id = self.allocate();
        self.names.insert((kind, name.to_string()), id);
        self.push(Entity {
            id,
            kind,
            name: name.to_string(),
            key: None,
            type_id,
            offset: None,
            payload: None,
        });
        Ok(id)
    }

    /// Returns the id bound to `key`, creating the entity on first use.
    pub fn lookup_or_create(&mut self, kind: EntityKind, key: &str, name: &str, type_id: u64) -> Result<Registration> {
        if let Some(&id) = self.keys.get(&(kind, key.to_string())) {
            let found = self.entity(id)?.type_id;
            if found != type_id {
                return Err(ExportError::KindMismatch {
                    key: key.to_string(),
                    expected: type_id,
                    found,
                });
            }
            return Ok(Registration::Existing(id));
        }
        self.check_prefix(kind, name)?;
        let id = self.allocate();
        self.keys.insert((kind, key.to_string()), id);
        self.push(Entity {
            id,
            kind,
            name: name.to_string(),
            key: Some(key.to_string()),
            type_id,
            offset: None,
            payload: None,
        });
        Ok(Registration::Created(id))
    }

    /// Registers a shading; its id is its code.
    pub fn register_shader(&mut self, shading: Shading) -> EntityId {
        let id = EntityId(shading.code());
        if self.index.contains_key(&id) {
            return id;
        }
        let name = shading.enum_name();
        self.keys.insert((EntityKind::Shader, name.clone()), id);
        self.push(Entity {
            id,
            kind: EntityKind::Shader,
            key: Some(name.clone()),
            name,
            type_id: id.0,
            offset: None,
            payload: None,
        });
        id
    }

    /// Records a copy of `origin` named `name` and returns the origin's id.
    pub fn register_instance(&mut self, name: &str, origin: EntityId, state: OriginState) -> Result<EntityId> {
        self.check_prefix(EntityKind::Model, name)?;
        let origin_entity = self.entity(origin)?;
        if origin_entity.kind != EntityKind::Model {
            return Err(ExportError::instance(
                name,
                format!("origin '{}' is a {}, not a model", origin_entity.name, origin_entity.kind),
            ));
        }
        let origin_name = origin_entity.name.clone();
        if !state.is_root {
            return Err(ExportError::instance(
                name,
                format!("origin '{origin_name}' must be a root object"),
            ));
        }
        if !state.identity_transform {
            return Err(ExportError::instance(
                name,
                format!("origin '{origin_name}' must not have any transformation"),
            ));
        }
        if state.dynamic_parted {
            return Err(ExportError::instance(
                name,
                format!("origin '{origin_name}' must not have any dynamic part"),
            ));
        }
        if !self.instances.iter().any(|i| i.name == name) {
            debug!("Instance '{name}' -> model {origin}");
            self.instances.push(Instance {
                name: name.to_string(),
                origin,
            });
        }
        Ok(origin)
    }

    pub fn set_payload(&mut self, id: EntityId, payload: Payload) -> Result<()> {
        let entity = self.entity_mut(id)?;
        if payload.kind() != entity.kind || payload.type_id() != entity.type_id {
            return Err(ExportError::Internal(format!(
                "payload {:?}/{} does not fit {} entity {} of type {}",
                payload.kind(),
                payload.type_id(),
                entity.kind,
                id,
                entity.type_id
            )));
        }
        entity.payload = Some(payload);
        Ok(())
    }

    pub fn set_offset(&mut self, id: EntityId, offset: u64) -> Result<()> {
        let entity = self.entity_mut(id)?;
        if let Some(previous) = entity.offset {
            return Err(ExportError::Internal(format!(
                "{} {} written twice (at {previous} and {offset})",
                entity.kind, id
            )));
        }
        entity.offset = Some(offset);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&i| &self.entities[i])
    }

    /// Id bound to a content key.
    #[must_use]
    pub fn id_for_key(&self, kind: EntityKind, key: &str) -> Option<EntityId> {
        self.keys.get(&(kind, key.to_string())).copied()
    }

    /// Entities of one kind, sorted by id.
    #[must_use]
    pub fn entities(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut out: Vec<&Entity> = self.entities.iter().filter(|e| e.kind == kind).collect();
        out.sort_by_key(|e| e.id);
        out
    }

    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// `(id, offset)` pairs of one kind, sorted by id.
    pub fn offset_table(&self, kind: EntityKind) -> Result<Vec<(EntityId, u64)>> {
        self.entities(kind)
            .into_iter()
            .map(|e| {
                e.offset
                    .map(|offset| (e.id, offset))
                    .ok_or_else(|| ExportError::Internal(format!("{} {} has no offset", e.kind, e.id)))
            })
            .collect()
    }

    /// Checks that every entity has a payload and every embedded id is registered
    /// under the kind it is used as.
    pub fn validate(&self) -> Result<()> {
        for entity in &self.entities {
            let Some(payload) = &entity.payload else {
                return Err(ExportError::Internal(format!(
                    "{} '{}' ({}) has no payload",
                    entity.kind, entity.name, entity.id
                )));
            };
            for (kind, id) in payload.references() {
                match self.get(id) {
                    Some(target) if target.kind == kind => {}
                    _ => {
                        return Err(ExportError::Internal(format!(
                            "{} '{}' references missing {kind} {id}",
                            entity.kind, entity.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, entity: Entity) {
        debug!("Registered {} '{}' as {}", entity.kind, entity.name, entity.id);
        self.index.insert(entity.id, self.entities.len());
        self.entities.push(entity);
    }

    fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.get(id)
            .ok_or_else(|| ExportError::Internal(format!("unknown entity id {id}")))
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.entities[i]),
            None => Err(ExportError::Internal(format!("unknown entity id {id}"))),
        }
    }

    fn check_prefix(&self, kind: EntityKind, name: &str) -> Result<()> {
        let prefixes = kind.name_prefixes();
        if !self.enforce_prefixes || prefixes.is_empty() || prefixes.iter().any(|p| name.starts_with(p)) {
            return Ok(());
        }
        Err(ExportError::Naming {
            name: name.to_string(),
            reason: format!("{kind} names must start with {}", prefixes.join(" or ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN_OK: OriginState = OriginState {
        is_root: true,
        identity_transform: true,
        dynamic_parted: false,
    };

    #[test]
    fn test_reserved_shaders_preregistered() {
        let registry = EntityRegistry::default();
        let shaders = registry.entities(EntityKind::Shader);
        let ids: Vec<u64> = shaders.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(shaders[1].name, "WHITE_POS_NRM");
    }

    #[test]
    fn test_counter_starts_above_shader_space() {
        let mut registry = EntityRegistry::default();
        let a = registry.register(EntityKind::Camera, "cam", 1).unwrap();
        let b = registry.register(EntityKind::Light, "sun", 10).unwrap();
        assert_eq!(a, EntityId(FIRST_USER_ID));
        assert_eq!(b, EntityId(FIRST_USER_ID + 1));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = EntityRegistry::default();
        registry.register(EntityKind::Camera, "cam", 1).unwrap();
        let err = registry.register(EntityKind::Camera, "cam", 1).unwrap_err();
        assert!(matches!(err, ExportError::DuplicateEntity { kind: EntityKind::Camera, .. }));
        // Same name in another kind is fine.
        registry.register(EntityKind::Light, "cam", 10).unwrap();
    }

    #[test]
    fn test_content_addressed_is_idempotent() {
        let mut registry = EntityRegistry::default();
        let first = registry.lookup_or_create(EntityKind::Texture, "/t/a.png", "a", 10).unwrap();
        let second = registry.lookup_or_create(EntityKind::Texture, "/t/a.png", "other", 10).unwrap();
        assert!(first.is_created());
        assert_eq!(second, Registration::Existing(first.id()));
        assert_eq!(registry.count(EntityKind::Texture), 1);
    }

    #[test]
    fn test_kind_mismatch_on_same_key() {
        let mut registry = EntityRegistry::default();
        registry.lookup_or_create(EntityKind::Texture, "/t/a.png", "a", 10).unwrap();
        let err = registry.lookup_or_create(EntityKind::Texture, "/t/a.png", "a", 20).unwrap_err();
        assert!(matches!(err, ExportError::KindMismatch { expected: 20, found: 10, .. }));
    }

    #[test]
    fn test_instance_resolves_to_origin() {
        let mut registry = EntityRegistry::default();
        let origin = registry.register(EntityKind::Model, "rock", 10).unwrap();
        let id = registry.register_instance("rock.001", origin, ORIGIN_OK).unwrap();
        assert_eq!(id, origin);
        assert_eq!(registry.count(EntityKind::Model), 1);
        assert_eq!(registry.instances().len(), 1);
    }

    #[test]
    fn test_instance_origin_rules() {
        let mut registry = EntityRegistry::default();
        let origin = registry.register(EntityKind::Model, "rock", 10).unwrap();
        let moved = OriginState {
            identity_transform: false,
            ..ORIGIN_OK
        };
        let err = registry.register_instance("rock.002", origin, moved).unwrap_err();
        assert!(matches!(err, ExportError::Instance { .. }));
        assert!(err.to_string().contains("rock.002"));

        let parted = OriginState {
            dynamic_parted: true,
            ..ORIGIN_OK
        };
        assert!(registry.register_instance("rock.003", origin, parted).is_err());

        let camera = registry.register(EntityKind::Camera, "cam", 1).unwrap();
        assert!(registry.register_instance("cam.001", camera, ORIGIN_OK).is_err());
    }

    #[test]
    fn test_split_copy_name() {
        assert_eq!(split_copy_name("rock.001"), Some("rock"));
        assert_eq!(split_copy_name("a.b.042"), Some("a.b"));
        assert_eq!(split_copy_name("rock.01"), None);
        assert_eq!(split_copy_name("rock.0001"), None);
        assert_eq!(split_copy_name("rock.0a1"), None);
        assert_eq!(split_copy_name(".001"), None);
        assert_eq!(split_copy_name("rock"), None);
    }

    #[test]
    fn test_prefix_enforcement() {
        let mut registry = EntityRegistry::new(true);
        assert!(matches!(
            registry.register(EntityKind::Camera, "main", 1),
            Err(ExportError::Naming { .. })
        ));
        registry.register(EntityKind::Camera, "camera-main", 1).unwrap();
        registry.register(EntityKind::Model, "widget-title", 30).unwrap();
        registry.lookup_or_create(EntityKind::Texture, "/a.png", "a", 10).unwrap();
    }

    #[test]
    fn test_offsets_written_once() {
        let mut registry = EntityRegistry::default();
        let id = registry.register(EntityKind::Camera, "cam", 1).unwrap();
        registry.set_offset(id, 40).unwrap();
        assert!(registry.set_offset(id, 80).is_err());
        assert!(registry.offset_table(EntityKind::Shader).is_err());
        assert_eq!(registry.offset_table(EntityKind::Camera).unwrap(), vec![(id, 40)]);
    }

    #[test]
    fn test_validate_reports_dangling_reference() {
        let mut registry = EntityRegistry::default();
        for &r in Reserved::ALL {
            let id = EntityId(r.ordinal());
            registry
                .set_payload(
                    id,
                    Payload::Shader(payload::ShaderPayload {
                        shading: Shading::Reserved(r),
                        stages: Vec::new(),
                    }),
                )
                .unwrap();
        }
        let sky = registry.register(EntityKind::Skybox, "sky", 10).unwrap();
        registry
            .set_payload(sky, Payload::Skybox(payload::SkyboxPayload { texture: EntityId(5000) }))
            .unwrap();
        assert!(registry.validate().is_err());
    }
}
