//! Texture registration for the classifier.
//!
//! Textures are content-addressed by resolved image path. Cube textures are
//! keyed by their up face; the other five faces must sit next to it as
//! `<base>-<face>.png`.

use std::path::{Path, PathBuf};

use log::debug;

use super::session::ExportSession;
use crate::errors::{ExportError, Result};
use crate::registry::payload::{TexturePayload, TextureType};
use crate::registry::{EntityId, EntityKind, Payload};
use crate::scene::{SceneGraph, TextureSlot, TextureSource};
use crate::shading::{CUBE_FACES, TextureResolver};

const PNG_EXTENSION: &str = "png";

impl<G: SceneGraph> TextureResolver for ExportSession<'_, G> {
    fn texture_2d(&mut self, slot: &TextureSlot) -> Result<EntityId> {
        let path = self.image_path(slot, true)?;
        self.single_texture(&path, TextureType::D2)
    }

    fn texture_3d(&mut self, slot: &TextureSlot) -> Result<EntityId> {
        let path = self.image_path(slot, false)?;
        self.single_texture(&path, TextureType::D3)
    }

    fn texture_cube(&mut self, faces: [&TextureSlot; 6]) -> Result<EntityId> {
        let up = self.image_path(faces[0], true)?;
        let expected = cube_face_paths(&up).ok_or_else(|| {
            ExportError::texture(&faces[0].name, format!("up face image must end with '-up.{PNG_EXTENSION}'"))
        })?;
        for (slot, expected) in faces.iter().zip(&expected).skip(1) {
            let path = self.image_path(slot, true)?;
            if path != *expected {
                return Err(ExportError::texture(
                    &slot.name,
                    format!("cube face image must be '{}'", expected.display()),
                ));
            }
        }
        self.cube_texture(expected)
    }
}

impl<G: SceneGraph> ExportSession<'_, G> {
    /// The six face paths of a cube set, given the raw path of its up face.
    pub(super) fn cube_faces_from_up(&self, owner: &str, raw_up: &str) -> Result<[PathBuf; 6]> {
        if raw_up.trim().is_empty() {
            return Err(ExportError::texture(owner, "no cube image set"));
        }
        let up = self.graph.resolve_path(raw_up);
        cube_face_paths(&up).ok_or_else(|| {
            ExportError::texture(owner, format!("up face image must end with '-up.{PNG_EXTENSION}'"))
        })
    }

    pub(super) fn cube_texture(&mut self, faces: [PathBuf; 6]) -> Result<EntityId> {
        let [up, ..] = &faces;
        let name = up
            .file_stem()
            .map(|s| s.to_string_lossy())
            .and_then(|s| s.strip_suffix("-up").map(str::to_string))
            .unwrap_or_default();
        let registration = self.registry.lookup_or_create(
            EntityKind::Texture,
            &up.to_string_lossy(),
            &name,
            TextureType::Cube.type_id(),
        )?;
        if registration.is_created() {
            let blobs = faces
                .iter()
                .map(|face| self.read(face))
                .collect::<Result<Vec<_>>>()?;
            debug!("Cube texture '{name}': {} faces", blobs.len());
            self.registry.set_payload(
                registration.id(),
                Payload::Texture(TexturePayload {
                    texture_type: TextureType::Cube,
                    blobs,
                }),
            )?;
        }
        Ok(registration.id())
    }

    pub(super) fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.graph
            .read_file(path)
            .map_err(|source| ExportError::FileUnavailable {
                path: path.to_path_buf(),
                source,
            })
    }

    fn single_texture(&mut self, path: &Path, texture_type: TextureType) -> Result<EntityId> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let registration = self.registry.lookup_or_create(
            EntityKind::Texture,
            &path.to_string_lossy(),
            &name,
            texture_type.type_id(),
        )?;
        if registration.is_created() {
            let blob = self.read(path)?;
            self.registry.set_payload(
                registration.id(),
                Payload::Texture(TexturePayload {
                    texture_type,
                    blobs: vec![blob],
                }),
            )?;
        }
        Ok(registration.id())
    }

    fn image_path(&self, slot: &TextureSlot, require_png: bool) -> Result<PathBuf> {
        let texture = &slot.texture;
        if texture.source != TextureSource::Image {
            return Err(ExportError::texture(&slot.name, "only image textures are supported"));
        }
        let raw = texture
            .image
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| ExportError::texture(&slot.name, "no image set"))?;
        let path = self.graph.resolve_path(raw);
        if require_png && !has_png_extension(&path) {
            return Err(ExportError::texture(
                &slot.name,
                format!("use a PNG image instead of '{}'", path.display()),
            ));
        }
        Ok(path)
    }
}

fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PNG_EXTENSION))
}

/// Face paths in [`CUBE_FACES`] order, derived from `<base>-up.png`.
fn cube_face_paths(up: &Path) -> Option<[PathBuf; 6]> {
    if !has_png_extension(up) {
        return None;
    }
    let stem = up.file_stem()?.to_str()?;
    let base = stem.strip_suffix("-up")?;
    if base.is_empty() {
        return None;
    }
    let dir = up.parent().unwrap_or_else(|| Path::new(""));
    Some(CUBE_FACES.map(|face| dir.join(format!("{base}-{face}.{PNG_EXTENSION}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_face_paths() {
        let faces = cube_face_paths(Path::new("/sky/day-up.png")).unwrap();
        assert_eq!(faces[0], PathBuf::from("/sky/day-up.png"));
        assert_eq!(faces[1], PathBuf::from("/sky/day-down.png"));
        assert_eq!(faces[5], PathBuf::from("/sky/day-back.png"));
    }

    #[test]
    fn test_cube_face_paths_rejects_other_names() {
        assert!(cube_face_paths(Path::new("/sky/day-down.png")).is_none());
        assert!(cube_face_paths(Path::new("/sky/day-up.jpg")).is_none());
        assert!(cube_face_paths(Path::new("/sky/-up.png")).is_none());
    }

    #[test]
    fn test_png_extension_is_case_insensitive() {
        assert!(has_png_extension(Path::new("a.PNG")));
        assert!(!has_png_extension(Path::new("a.tga")));
        assert!(!has_png_extension(Path::new("a")));
    }
}
