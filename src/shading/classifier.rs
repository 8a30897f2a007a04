//! Material to shading classification.
//!
//! Each axis inspects the material independently. Texture slots are matched by
//! their name suffix:
//!
//! - `-normal`: normal map (lighting axis)
//! - `-2d`, `-3d`, `-cube-<face>`: colour texture (texturing axis)
//! - `-spectxt`: specular texture (specular axis)
//! - `-baked-<face>`: baked environment cube (environment axis)
//!
//! Textures selected by an axis are resolved through a [`TextureResolver`],
//! which registers them and hands back their entity id.

use glam::Vec3;
use log::warn;

use super::{
    EnvironmentMapping, Lighting, Shading, ShadingAxes, Shadowing, Specular, Texturing,
    Transparency,
};
use crate::errors::{ExportError, Result};
use crate::registry::EntityId;
use crate::scene::{MaterialData, TextureSlot};

/// Cube faces in the order they are embedded in the file.
pub const CUBE_FACES: [&str; 6] = ["up", "down", "left", "right", "front", "back"];

pub const SUFFIX_NORMAL: &str = "-normal";
pub const SUFFIX_2D: &str = "-2d";
pub const SUFFIX_3D: &str = "-3d";
pub const SUFFIX_CUBE: &str = "-cube";
pub const SUFFIX_SPECULAR: &str = "-spectxt";
pub const SUFFIX_BAKED: &str = "-baked";

/// Material property holding the transparency factor.
pub const PROPERTY_TRANSPARENT: &str = "transparent";
/// Material property holding the alpha cutoff.
pub const PROPERTY_CUTOFF: &str = "cutoff";

pub const SPECULAR_THRESHOLD: f32 = 0.01;
pub const REFLECT_THRESHOLD: f32 = 0.001;

/// Registers textures on behalf of the classifier.
pub trait TextureResolver {
    fn texture_2d(&mut self, slot: &TextureSlot) -> Result<EntityId>;

    fn texture_3d(&mut self, slot: &TextureSlot) -> Result<EntityId>;

    /// Faces arrive in [`CUBE_FACES`] order.
    fn texture_cube(&mut self, faces: [&TextureSlot; 6]) -> Result<EntityId>;
}

/// Outcome of classifying one material.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMaterial {
    pub shading: Shading,
    pub normal_map: Option<EntityId>,
    pub color_texture: Option<EntityId>,
    pub specular_texture: Option<EntityId>,
    pub baked_environment: Option<EntityId>,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub specular_intensity: f32,
    pub reflect_factor: f32,
    /// Transparency or cutoff factor, depending on the transparency axis.
    pub transparency_factor: Option<f32>,
}

impl ClassifiedMaterial {
    /// Texture ids in material block order.
    pub fn texture_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        [
            self.normal_map,
            self.color_texture,
            self.specular_texture,
            self.baked_environment,
        ]
        .into_iter()
        .flatten()
    }

    /// Axes of a classified material. Reserved shadings never come out of [`classify`].
    #[must_use]
    pub fn axes(&self) -> Option<&ShadingAxes> {
        match &self.shading {
            Shading::Classified(axes) => Some(axes),
            Shading::Reserved(_) => None,
        }
    }
}

/// Classifies `material`, registering every texture a chosen axis needs.
pub fn classify(material: &MaterialData, resolver: &mut dyn TextureResolver) -> Result<ClassifiedMaterial> {
    let slots = SlotIndex::build(material)?;

    let (lighting, normal_map) = classify_lighting(material, &slots, resolver)?;
    let (texturing, color_texture) = classify_texturing(material, &slots, resolver)?;
    let (specular, specular_texture) = classify_specular(material, &slots, resolver)?;
    let (environment, baked_environment) = classify_environment(material, &slots, resolver)?;
    let shadowing = classify_shadowing(material)?;
    let (transparency, transparency_factor) = classify_transparency(material)?;

    Ok(ClassifiedMaterial {
        shading: Shading::Classified(ShadingAxes {
            lighting,
            texturing,
            specular,
            environment,
            shadowing,
            transparency,
        }),
        normal_map,
        color_texture,
        specular_texture,
        baked_environment,
        diffuse_color: material.diffuse_color,
        specular_color: material.specular_color,
        specular_intensity: material.specular_intensity,
        reflect_factor: material.mirror.reflect_factor,
        transparency_factor,
    })
}

// ============================================================================
// Slot indexing
// ============================================================================

/// A six-face set collected from `<base>-<set>-<face>` slots.
#[derive(Default)]
struct FaceSet<'a> {
    base: Option<&'a str>,
    faces: [Vec<&'a TextureSlot>; 6],
}

impl<'a> FaceSet<'a> {
    fn is_empty(&self) -> bool {
        self.faces.iter().all(Vec::is_empty)
    }

    fn push(&mut self, material: &str, base: &'a str, face: usize, slot: &'a TextureSlot) -> Result<()> {
        match self.base {
            Some(existing) if existing != base => {
                return Err(ExportError::shading(
                    material,
                    format!("two cube texture sets '{existing}' and '{base}' in one axis"),
                ));
            }
            _ => self.base = Some(base),
        }
        self.faces[face].push(slot);
        Ok(())
    }

    /// Returns the complete face list, or `None` when the set is empty.
    fn complete(&self, material: &str, what: &str) -> Result<Option<[&'a TextureSlot; 6]>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(6);
        for (face, slots) in CUBE_FACES.iter().zip(&self.faces) {
            match slots.as_slice() {
                [slot] => out.push(*slot),
                [] => {
                    return Err(ExportError::shading(
                        material,
                        format!("incomplete {what} texture, face '{face}' is missing"),
                    ));
                }
                _ => {
                    return Err(ExportError::shading(
                        material,
                        format!("{what} texture face '{face}' is attached more than once"),
                    ));
                }
            }
        }
        out.try_into()
            .map(Some)
            .map_err(|_| ExportError::Internal("cube face count".to_string()))
    }
}

#[derive(Default)]
struct SlotIndex<'a> {
    normal: Vec<&'a TextureSlot>,
    d2: Vec<&'a TextureSlot>,
    d3: Vec<&'a TextureSlot>,
    specular: Vec<&'a TextureSlot>,
    cube: FaceSet<'a>,
    baked: FaceSet<'a>,
}

impl<'a> SlotIndex<'a> {
    fn build(material: &'a MaterialData) -> Result<Self> {
        let mut index = SlotIndex::default();
        for slot in &material.texture_slots {
            let name = slot.name.as_str();
            if name.ends_with(SUFFIX_NORMAL) {
                index.normal.push(slot);
            } else if name.ends_with(SUFFIX_2D) {
                index.d2.push(slot);
            } else if name.ends_with(SUFFIX_3D) {
                index.d3.push(slot);
            } else if name.ends_with(SUFFIX_SPECULAR) {
                index.specular.push(slot);
            } else if let Some((base, face)) = split_face(name, SUFFIX_CUBE) {
                index.cube.push(&material.name, base, face, slot)?;
            } else if let Some((base, face)) = split_face(name, SUFFIX_BAKED) {
                index.baked.push(&material.name, base, face, slot)?;
            } else {
                warn!("Ignoring texture slot '{}' of material '{}'", name, material.name);
            }
        }
        Ok(index)
    }
}

/// Splits `<base><set>-<face>` into `(base, face index)`.
fn split_face<'n>(name: &'n str, set: &str) -> Option<(&'n str, usize)> {
    CUBE_FACES.iter().enumerate().find_map(|(i, face)| {
        let rest = name.strip_suffix(face)?.strip_suffix('-')?;
        let base = rest.strip_suffix(set)?;
        Some((base, i))
    })
}

fn single<'a>(material: &str, slots: &[&'a TextureSlot], what: &str) -> Result<Option<&'a TextureSlot>> {
    match slots {
        [] => Ok(None),
        [slot] => Ok(Some(*slot)),
        _ => Err(ExportError::shading(
            material,
            format!("{} {what} textures attached, at most one allowed", slots.len()),
        )),
    }
}

// ============================================================================
// Axes
// ============================================================================

fn classify_lighting(
    material: &MaterialData,
    slots: &SlotIndex<'_>,
    resolver: &mut dyn TextureResolver,
) -> Result<(Lighting, Option<EntityId>)> {
    let normal = single(&material.name, &slots.normal, "normal-map")?;
    match (material.shadeless, normal) {
        (true, Some(_)) => Err(ExportError::shading(
            &material.name,
            "a shadeless material cannot have a normal-map texture",
        )),
        (true, None) => Ok((Lighting::Shadeless, None)),
        (false, None) => Ok((Lighting::Directional, None)),
        (false, Some(slot)) => Ok((Lighting::NormalMapped, Some(resolver.texture_2d(slot)?))),
    }
}

fn classify_texturing(
    material: &MaterialData,
    slots: &SlotIndex<'_>,
    resolver: &mut dyn TextureResolver,
) -> Result<(Texturing, Option<EntityId>)> {
    let d2 = single(&material.name, &slots.d2, "2D")?;
    let d3 = single(&material.name, &slots.d3, "3D")?;
    let cube = slots.cube.complete(&material.name, "cube")?;

    let attached = usize::from(d2.is_some()) + usize::from(d3.is_some()) + usize::from(cube.is_some());
    if attached > 1 {
        return Err(ExportError::shading(
            &material.name,
            "only one of 2D, 3D or cube textures may be attached",
        ));
    }

    if let Some(slot) = d2 {
        return Ok((Texturing::D2, Some(resolver.texture_2d(slot)?)));
    }
    if let Some(slot) = d3 {
        return Ok((Texturing::D3, Some(resolver.texture_3d(slot)?)));
    }
    if let Some(faces) = cube {
        return Ok((Texturing::Cube, Some(resolver.texture_cube(faces)?)));
    }
    Ok((Texturing::Colored, None))
}

fn classify_specular(
    material: &MaterialData,
    slots: &SlotIndex<'_>,
    resolver: &mut dyn TextureResolver,
) -> Result<(Specular, Option<EntityId>)> {
    if let Some(slot) = single(&material.name, &slots.specular, "specular")? {
        return Ok((Specular::SpecTextured, Some(resolver.texture_2d(slot)?)));
    }
    if material.specular_intensity > SPECULAR_THRESHOLD {
        Ok((Specular::Specular, None))
    } else {
        Ok((Specular::Matte, None))
    }
}

fn classify_environment(
    material: &MaterialData,
    slots: &SlotIndex<'_>,
    resolver: &mut dyn TextureResolver,
) -> Result<(EnvironmentMapping, Option<EntityId>)> {
    let reflective = material.mirror.enabled && material.mirror.reflect_factor > REFLECT_THRESHOLD;
    match slots.baked.complete(&material.name, "baked environment")? {
        Some(_) if !reflective => Err(ExportError::shading(
            &material.name,
            "a baked environment texture requires reflectivity to be enabled",
        )),
        Some(faces) => Ok((EnvironmentMapping::Baked, Some(resolver.texture_cube(faces)?))),
        None if reflective => Ok((EnvironmentMapping::Realtime, None)),
        None => Ok((EnvironmentMapping::None, None)),
    }
}

fn classify_shadowing(material: &MaterialData) -> Result<Shadowing> {
    match (material.cast_shadows, material.receive_shadows) {
        (false, true) => Err(ExportError::shading(
            &material.name,
            "a material cannot receive shadows without casting them",
        )),
        (false, false) => Ok(Shadowing::Shadowless),
        (true, false) => Ok(Shadowing::Caster),
        (true, true) => Ok(Shadowing::Full),
    }
}

fn classify_transparency(material: &MaterialData) -> Result<(Transparency, Option<f32>)> {
    let transparent = material.properties.get(PROPERTY_TRANSPARENT).copied();
    let cutoff = material.properties.get(PROPERTY_CUTOFF).copied();
    match (transparent, cutoff) {
        (Some(_), Some(_)) => Err(ExportError::shading(
            &material.name,
            "a material cannot be transparent and cutoff at the same time",
        )),
        (Some(v), None) => Ok((Transparency::Transparent, Some(v))),
        (None, Some(v)) => Ok((Transparency::Cutoff, Some(v))),
        (None, None) => Ok((Transparency::Opaque, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TextureRef;

    #[derive(Default)]
    struct Recorder {
        next: u64,
        calls: Vec<String>,
    }

    impl Recorder {
        fn id(&mut self, call: String) -> EntityId {
            self.calls.push(call);
            self.next += 1;
            EntityId(1000 + self.next)
        }
    }

    impl TextureResolver for Recorder {
        fn texture_2d(&mut self, slot: &TextureSlot) -> Result<EntityId> {
            Ok(self.id(format!("2d:{}", slot.name)))
        }

        fn texture_3d(&mut self, slot: &TextureSlot) -> Result<EntityId> {
            Ok(self.id(format!("3d:{}", slot.name)))
        }

        fn texture_cube(&mut self, faces: [&TextureSlot; 6]) -> Result<EntityId> {
            Ok(self.id(format!("cube:{}", faces[0].name)))
        }
    }

    fn slot(name: &str) -> TextureSlot {
        TextureSlot {
            name: name.to_string(),
            texture: TextureRef {
                name: name.to_string(),
                image: Some(format!("//{name}.png")),
                ..Default::default()
            },
        }
    }

    fn material(name: &str) -> MaterialData {
        MaterialData {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn axes(m: &ClassifiedMaterial) -> ShadingAxes {
        *m.axes().expect("classified")
    }

    #[test]
    fn test_default_material() {
        let mut r = Recorder::default();
        let m = classify(&material("plain"), &mut r).unwrap();
        let a = axes(&m);
        assert_eq!(a.lighting, Lighting::Directional);
        assert_eq!(a.texturing, Texturing::Colored);
        assert_eq!(a.specular, Specular::Matte);
        assert_eq!(a.environment, EnvironmentMapping::None);
        assert_eq!(a.shadowing, Shadowing::Shadowless);
        assert_eq!(a.transparency, Transparency::Opaque);
        assert_eq!(m.texture_ids().count(), 0);
        assert!(r.calls.is_empty());
    }

    #[test]
    fn test_cube_slots_resolve_once() {
        let mut mat = material("sky");
        for face in CUBE_FACES {
            mat.texture_slots.push(slot(&format!("sky-cube-{face}")));
        }
        let mut r = Recorder::default();
        let m = classify(&mat, &mut r).unwrap();
        assert_eq!(axes(&m).texturing, Texturing::Cube);
        assert_eq!(r.calls, vec!["cube:sky-cube-up".to_string()]);
    }

    #[test]
    fn test_incomplete_cube_rejected() {
        let mut mat = material("broken");
        for face in &CUBE_FACES[..5] {
            mat.texture_slots.push(slot(&format!("b-cube-{face}")));
        }
        let err = classify(&mat, &mut Recorder::default()).unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("back"));
    }

    #[test]
    fn test_two_texturing_kinds_rejected() {
        let mut mat = material("mixed");
        mat.texture_slots.push(slot("a-2d"));
        mat.texture_slots.push(slot("a-3d"));
        assert!(classify(&mat, &mut Recorder::default()).is_err());
    }

    #[test]
    fn test_shadeless_normal_map_rejected() {
        let mut mat = material("flat");
        mat.shadeless = true;
        mat.texture_slots.push(slot("flat-normal"));
        assert!(classify(&mat, &mut Recorder::default()).is_err());
    }

    #[test]
    fn test_texture_ids_follow_axis_order() {
        let mut mat = material("rich");
        mat.texture_slots.push(slot("rich-spectxt"));
        mat.texture_slots.push(slot("rich-2d"));
        mat.texture_slots.push(slot("rich-normal"));
        let mut r = Recorder::default();
        let m = classify(&mat, &mut r).unwrap();
        assert_eq!(axes(&m).lighting, Lighting::NormalMapped);
        assert_eq!(axes(&m).specular, Specular::SpecTextured);
        let ids: Vec<u64> = m.texture_ids().map(|id| id.0).collect();
        assert_eq!(ids, vec![1001, 1002, 1003]);
        assert_eq!(r.calls[0], "2d:rich-normal");
    }

    #[test]
    fn test_baked_requires_reflectivity() {
        let mut mat = material("shiny");
        for face in CUBE_FACES {
            mat.texture_slots.push(slot(&format!("env-baked-{face}")));
        }
        assert!(classify(&mat, &mut Recorder::default()).is_err());

        mat.mirror.enabled = true;
        mat.mirror.reflect_factor = 0.5;
        let m = classify(&mat, &mut Recorder::default()).unwrap();
        assert_eq!(axes(&m).environment, EnvironmentMapping::Baked);
    }

    #[test]
    fn test_realtime_threshold() {
        let mut mat = material("mirror");
        mat.mirror.enabled = true;
        mat.mirror.reflect_factor = 0.0005;
        let m = classify(&mat, &mut Recorder::default()).unwrap();
        assert_eq!(axes(&m).environment, EnvironmentMapping::None);
        mat.mirror.reflect_factor = 0.2;
        let m = classify(&mat, &mut Recorder::default()).unwrap();
        assert_eq!(axes(&m).environment, EnvironmentMapping::Realtime);
    }

    #[test]
    fn test_shadow_and_transparency_rules() {
        let mut mat = material("ghost");
        mat.receive_shadows = true;
        assert!(classify(&mat, &mut Recorder::default()).is_err());

        mat.cast_shadows = true;
        mat.properties.insert(PROPERTY_CUTOFF.to_string(), 0.5);
        let m = classify(&mat, &mut Recorder::default()).unwrap();
        assert_eq!(axes(&m).shadowing, Shadowing::Full);
        assert_eq!(axes(&m).transparency, Transparency::Cutoff);
        assert_eq!(m.transparency_factor, Some(0.5));

        mat.properties.insert(PROPERTY_TRANSPARENT.to_string(), 0.3);
        let err = classify(&mat, &mut Recorder::default()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_specular_threshold() {
        let mut mat = material("gloss");
        mat.specular_intensity = 0.01;
        assert_eq!(axes(&classify(&mat, &mut Recorder::default()).unwrap()).specular, Specular::Matte);
        mat.specular_intensity = 0.5;
        assert_eq!(
            axes(&classify(&mat, &mut Recorder::default()).unwrap()).specular,
            Specular::Specular
        );
    }
}
