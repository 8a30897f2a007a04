//! Table Codegen
//!
//! Projects the registry's id assignment into named-constant listings, one
//! block per entity kind, so host code can refer to assets by name.
//!
//! Constant names are derived from entity names:
//! 1. Strip the longest prefix shared by every name of the kind, backed off to
//!    the last separator so no word is cut. Skipped for single-entity kinds,
//!    when a name would become empty, and for shaders (already canonical).
//! 2. Upper-case, replace runs of non-alphanumerics with `_`, prefix the kind
//!    label when the result starts with a digit.
//! 3. Append `_<id>` to names that still collide, until none do.

mod templates;

use log::debug;
use minijinja::context;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::errors::Result;
use crate::registry::{EntityKind, EntityRegistry};

const SEPARATORS: [char; 6] = ['-', '_', '.', ' ', '/', '\\'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindConstants {
    /// Kind label, used as the inner module or namespace name.
    pub name: &'static str,
    pub constants: Vec<Constant>,
}

/// Every kind's constants, sorted by id within each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantTable {
    pub kinds: Vec<KindConstants>,
}

impl ConstantTable {
    #[must_use]
    pub fn from_registry(registry: &EntityRegistry) -> Self {
        let kinds = EntityKind::ALL
            .iter()
            .map(|&kind| {
                let entities = registry.entities(kind);
                let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
                let ids: Vec<u64> = entities.iter().map(|e| e.id.0).collect();
                let constants = derive_names(kind, &names, &ids)
                    .into_iter()
                    .zip(ids)
                    .map(|(name, id)| Constant { name, id })
                    .collect();
                KindConstants {
                    name: kind.label(),
                    constants,
                }
            })
            .collect();
        Self { kinds }
    }

    #[must_use]
    pub fn kind(&self, kind: EntityKind) -> Option<&KindConstants> {
        self.kinds.iter().find(|k| k.name == kind.label())
    }

    /// Looks a constant's id up by kind and generated name.
    #[must_use]
    pub fn id_of(&self, kind: EntityKind, name: &str) -> Option<u64> {
        self.kind(kind)?
            .constants
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }

    pub fn render_rust(&self, module: &str, source: &str) -> Result<String> {
        self.render("rust", context! { module => module, source => source, kinds => &self.kinds })
    }

    pub fn render_cpp(&self, namespace: &str, source: &str) -> Result<String> {
        self.render(
            "cpp",
            context! { namespace => namespace, source => source, kinds => &self.kinds },
        )
    }

    fn render(&self, template: &str, ctx: minijinja::Value) -> Result<String> {
        let env = templates::environment()?;
        let output = env.get_template(template)?.render(ctx)?;
        debug!("Rendered {template} listing, {} bytes", output.len());
        Ok(output)
    }
}

/// Generated constant names for one kind, parallel to `names`.
#[must_use]
pub fn derive_names(kind: EntityKind, names: &[&str], ids: &[u64]) -> Vec<String> {
    let strip = if kind == EntityKind::Shader { 0 } else { strip_len(names) };
    let label = kind.label().to_uppercase();
    let mut out: Vec<String> = names
        .iter()
        .zip(ids)
        .map(|(name, id)| {
            let ident = normalize_identifier(&name[strip..]);
            if ident.is_empty() {
                format!("{label}_{id}")
            } else if ident.starts_with(|c: char| c.is_ascii_digit()) {
                format!("{label}_{ident}")
            } else {
                ident
            }
        })
        .collect();

    // Suffixing can create new collisions; repeat until every name is unique.
    loop {
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        for name in &out {
            *seen.entry(name.clone()).or_default() += 1;
        }
        let mut changed = false;
        for (name, id) in out.iter_mut().zip(ids) {
            if seen.get(name.as_str()).copied().unwrap_or_default() > 1 {
                name.push_str(&format!("_{id}"));
                changed = true;
            }
        }
        if !changed {
            return out;
        }
    }
}

/// Byte length of the shared prefix to strip, ending on a separator.
fn strip_len(names: &[&str]) -> usize {
    let [first, rest @ ..] = names else {
        return 0;
    };
    if rest.is_empty() {
        return 0;
    }
    let mut common = first.len();
    for name in rest {
        common = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8())
            .min(common);
    }
    let Some(cut) = first[..common].rfind(SEPARATORS).map(|i| i + 1) else {
        return 0;
    };
    if names.iter().any(|n| n.len() <= cut) {
        return 0;
    }
    cut
}

/// Upper-case identifier made of `[A-Z0-9_]`.
#[must_use]
pub fn normalize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_underscore && !out.is_empty() {
                out.push('_');
            }
            pending_underscore = false;
            out.push(c.to_ascii_uppercase());
        } else {
            pending_underscore = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("rock-big.v2"), "ROCK_BIG_V2");
        assert_eq!(normalize_identifier("--a  b--"), "A_B");
        assert_eq!(normalize_identifier("3d-logo"), "3D_LOGO");
        assert_eq!(normalize_identifier("-_-"), "");
    }

    #[test]
    fn test_common_prefix_backs_off_to_separator() {
        let names = derive_names(EntityKind::Model, &["model-rock", "model-rose"], &[1024, 1025]);
        assert_eq!(names, vec!["ROCK", "ROSE"]);
    }

    #[test]
    fn test_single_entity_keeps_prefix() {
        let names = derive_names(EntityKind::Camera, &["camera-main"], &[1024]);
        assert_eq!(names, vec!["CAMERA_MAIN"]);
    }

    #[test]
    fn test_prefix_kept_when_a_name_would_vanish() {
        let names = derive_names(EntityKind::Model, &["tree-", "tree-oak"], &[1, 2]);
        assert_eq!(names, vec!["TREE", "TREE_OAK"]);
    }

    #[test]
    fn test_collisions_get_id_suffix() {
        let names = derive_names(EntityKind::Texture, &["x/a-b", "x/a_b", "x/c"], &[1030, 1031, 1032]);
        assert_eq!(names, vec!["A_B_1030", "A_B_1031", "C"]);
    }

    #[test]
    fn test_suffixed_name_never_shadows_natural_one() {
        let names = derive_names(EntityKind::Texture, &["a-b", "a_b", "a-b-1030"], &[1030, 1031, 1032]);
        assert_eq!(names, vec!["A_B_1030_1030", "A_B_1031", "A_B_1030_1032"]);
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_leading_digit_gets_kind_label() {
        let names = derive_names(EntityKind::Texture, &["3d-logo"], &[1024]);
        assert_eq!(names, vec!["TEXTURE_3D_LOGO"]);
    }

    #[test]
    fn test_table_and_listings() {
        let mut registry = EntityRegistry::default();
        registry.register(EntityKind::Camera, "camera-main", 1).unwrap();
        registry.register(EntityKind::Model, "model-rock", 10).unwrap();
        registry.register(EntityKind::Model, "model-tree", 10).unwrap();
        let table = ConstantTable::from_registry(&registry);
        assert_eq!(table.kinds.len(), EntityKind::ALL.len());
        assert_eq!(table.id_of(EntityKind::Camera, "CAMERA_MAIN"), Some(1024));
        assert_eq!(table.id_of(EntityKind::Model, "TREE"), Some(1026));
        assert_eq!(table.id_of(EntityKind::Shader, "WHITE_POS_NRM_UV"), Some(3));

        let rust = table.render_rust("gx3d", "scene.gx3d").unwrap();
        assert!(rust.contains("pub mod gx3d {"));
        assert!(rust.contains("pub mod model {"));
        assert!(rust.contains("pub const ROCK: u64 = 1025;"));

        let cpp = table.render_cpp("assets", "scene.gx3d").unwrap();
        assert!(cpp.contains("#pragma once"));
        assert!(cpp.contains("namespace assets::camera {"));
        assert!(cpp.contains("constexpr std::uint64_t CAMERA_MAIN = 1024;"));
    }
}
