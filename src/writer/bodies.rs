//! Per-kind entity bodies. Every body opens with its u64 type discriminant.

use std::io::{Seek, Write};

use super::stream::OStream;
use crate::errors::Result;
use crate::registry::payload::{
    AudioPayload, COLLIDER_TYPE_AABB, COLLIDER_TYPE_NONE, COLLIDER_TYPE_SPHERE, CameraPayload,
    ConstraintPayload, FontPayload, LightPayload, MeshPayload, ModelPayload, ModelType,
    ScenePayload, ShaderPayload, SkyboxPayload, TexturePayload,
};
use crate::registry::{EntityId, ModelRef, Payload};
use crate::scene::{ColliderData, HorizontalAlign, LightKind, Projection, VerticalAlign};
use crate::shading::{ClassifiedMaterial, EnvironmentMapping, Specular, Texturing, Transparency};

pub fn write_body<W: Write + Seek>(out: &mut OStream<W>, payload: &Payload) -> Result<()> {
    out.write_u64(payload.type_id())?;
    match payload {
        Payload::Shader(p) => write_shader(out, p),
        Payload::Camera(p) => write_camera(out, p),
        Payload::Audio(p) => write_audio(out, p),
        Payload::Light(p) => write_light(out, p),
        Payload::Texture(p) => write_texture(out, p),
        Payload::Font(p) => write_font(out, p),
        Payload::Mesh(p) => write_mesh(out, p),
        Payload::Model(p) => write_model(out, p),
        Payload::Skybox(p) => write_skybox(out, p),
        Payload::Constraint(p) => write_constraint(out, p),
        Payload::Scene(p) => write_scene(out, p),
    }
}

fn write_ids<W: Write + Seek>(out: &mut OStream<W>, ids: &[EntityId]) -> Result<()> {
    out.write_count(ids.len())?;
    for id in ids {
        out.write_u64(id.0)?;
    }
    Ok(())
}

fn write_shader<W: Write + Seek>(out: &mut OStream<W>, p: &ShaderPayload) -> Result<()> {
    out.write_count(p.stages.len())?;
    for stage in &p.stages {
        out.write_blob(stage)?;
    }
    Ok(())
}

fn write_camera<W: Write + Seek>(out: &mut OStream<W>, p: &CameraPayload) -> Result<()> {
    out.write_matrix(&p.matrix)?;
    out.write_f32(p.data.near)?;
    out.write_f32(p.data.far)?;
    match p.data.projection {
        Projection::Perspective { fov_x } => out.write_f32(fov_x * 0.5),
        Projection::Orthographic { scale } => out.write_f32(scale),
    }
}

fn write_audio<W: Write + Seek>(out: &mut OStream<W>, p: &AudioPayload) -> Result<()> {
    out.write_blob(&p.bytes)
}

fn write_light<W: Write + Seek>(out: &mut OStream<W>, p: &LightPayload) -> Result<()> {
    out.write_matrix(&p.matrix)?;
    out.write_vec3(p.data.color)?;
    match p.data.kind {
        LightKind::Sun => {
            out.write_f32(p.data.near)?;
            out.write_f32(p.data.far)?;
            out.write_f32(p.data.size)
        }
        LightKind::Point => out.write_f32(p.data.range),
    }
}

fn write_texture<W: Write + Seek>(out: &mut OStream<W>, p: &TexturePayload) -> Result<()> {
    for blob in &p.blobs {
        out.write_blob(blob)?;
    }
    Ok(())
}

fn write_font<W: Write + Seek>(out: &mut OStream<W>, p: &FontPayload) -> Result<()> {
    out.write_blob(&p.bytes)
}

fn write_mesh<W: Write + Seek>(out: &mut OStream<W>, p: &MeshPayload) -> Result<()> {
    let buffer = &p.buffer;
    out.write_u8(buffer.attributes.bits())?;
    out.write_count(buffer.vertex_count())?;
    out.write_f32_slice(&buffer.vertices)?;
    out.write_count(buffer.indices.len())?;
    for &index in &buffer.indices {
        out.write_u32(index)?;
    }
    Ok(())
}

/// Shading code, texture ids, then the scalars the shading consumes.
pub fn write_material<W: Write + Seek>(out: &mut OStream<W>, m: &ClassifiedMaterial) -> Result<()> {
    out.write_u64(m.shading.code())?;
    for id in m.texture_ids() {
        out.write_u64(id.0)?;
    }
    let Some(axes) = m.axes() else {
        return Ok(());
    };
    if axes.texturing == Texturing::Colored {
        out.write_vec3(m.diffuse_color)?;
    }
    if axes.specular == Specular::Specular {
        out.write_vec3(m.specular_color)?;
        out.write_f32(m.specular_intensity)?;
    }
    if axes.environment != EnvironmentMapping::None {
        out.write_f32(m.reflect_factor)?;
    }
    if matches!(axes.transparency, Transparency::Transparent | Transparency::Cutoff) {
        out.write_f32(m.transparency_factor.unwrap_or_default())?;
    }
    Ok(())
}

pub fn write_model_ref<W: Write + Seek>(out: &mut OStream<W>, r: &ModelRef) -> Result<()> {
    match r {
        ModelRef::Model(id) => {
            out.write_bool(false)?;
            out.write_u64(id.0)
        }
        ModelRef::Instance { matrix, origin } => {
            out.write_bool(true)?;
            out.write_matrix(matrix)?;
            out.write_u64(origin.0)
        }
    }
}

fn write_model_refs<W: Write + Seek>(out: &mut OStream<W>, refs: &[ModelRef]) -> Result<()> {
    out.write_count(refs.len())?;
    for r in refs {
        write_model_ref(out, r)?;
    }
    Ok(())
}

fn write_collider<W: Write + Seek>(out: &mut OStream<W>, collider: Option<&ColliderData>) -> Result<()> {
    match collider {
        None => out.write_u64(COLLIDER_TYPE_NONE),
        Some(ColliderData::Sphere { center, radius }) => {
            out.write_u64(COLLIDER_TYPE_SPHERE)?;
            out.write_vec3(*center)?;
            out.write_f32(*radius)
        }
        Some(ColliderData::Aabb { min, max }) => {
            out.write_u64(COLLIDER_TYPE_AABB)?;
            out.write_vec3(*min)?;
            out.write_vec3(*max)
        }
    }
}

fn horizontal_code(align: HorizontalAlign) -> u8 {
    match align {
        HorizontalAlign::Left => 1,
        HorizontalAlign::Center => 2,
        HorizontalAlign::Right => 3,
    }
}

fn vertical_code(align: VerticalAlign) -> u8 {
    match align {
        VerticalAlign::Top => 1,
        VerticalAlign::Center => 2,
        VerticalAlign::Bottom => 3,
    }
}

fn write_model<W: Write + Seek>(out: &mut OStream<W>, p: &ModelPayload) -> Result<()> {
    out.write_matrix(&p.matrix)?;
    if p.model_type == ModelType::Dynamic {
        out.write_matrix(&p.matrix.inverse())?;
    }
    out.write_vec3(p.occlusion.center)?;
    out.write_f32(p.occlusion.radius)?;

    out.write_bool(p.renderable.is_some())?;
    if let Some(renderable) = &p.renderable {
        write_material(out, &renderable.material)?;
        out.write_u64(renderable.mesh.0)?;
    }

    if let Some(widget) = &p.widget {
        out.write_string(&widget.text)?;
        out.write_u64(widget.font.0)?;
        out.write_vec4(widget.color)?;
        out.write_f32(widget.size)?;
        out.write_u8(horizontal_code(widget.horizontal_align))?;
        out.write_u8(vertical_code(widget.vertical_align))?;
    }

    write_collider(out, p.collider.as_ref())?;
    write_ids(out, &p.audios)?;
    write_model_refs(out, &p.children)
}

fn write_skybox<W: Write + Seek>(out: &mut OStream<W>, p: &SkyboxPayload) -> Result<()> {
    out.write_u64(p.texture.0)
}

fn write_constraint<W: Write + Seek>(out: &mut OStream<W>, p: &ConstraintPayload) -> Result<()> {
    out.write_u8(p.anchor_flags())?;
    out.write_f32(p.ratio)?;
    write_model_refs(out, &p.children)
}

fn write_scene<W: Write + Seek>(out: &mut OStream<W>, p: &ScenePayload) -> Result<()> {
    write_ids(out, &p.cameras)?;
    write_ids(out, &p.audios)?;
    write_ids(out, &p.lights)?;
    write_model_refs(out, &p.models)?;
    write_ids(out, &p.constraints)?;
    out.write_bool(p.skybox.is_some())?;
    if let Some(skybox) = p.skybox {
        out.write_u64(skybox.0)?;
    }
    out.write_vec3(p.ambient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::{Lighting, Shading, ShadingAxes, Shadowing};
    use glam::Vec3;
    use std::io::Cursor;

    fn colored(transparency: Transparency, factor: Option<f32>) -> ClassifiedMaterial {
        ClassifiedMaterial {
            shading: Shading::Classified(ShadingAxes {
                lighting: Lighting::Directional,
                texturing: Texturing::Colored,
                specular: Specular::Matte,
                environment: EnvironmentMapping::None,
                shadowing: Shadowing::Caster,
                transparency,
            }),
            normal_map: None,
            color_texture: None,
            specular_texture: None,
            baked_environment: None,
            diffuse_color: Vec3::new(0.25, 0.5, 0.75),
            specular_color: Vec3::ONE,
            specular_intensity: 0.0,
            reflect_factor: 0.0,
            transparency_factor: factor,
        }
    }

    fn bytes_of(f: impl FnOnce(&mut OStream<Cursor<Vec<u8>>>) -> Result<()>) -> Vec<u8> {
        let mut out = OStream::new(Cursor::new(Vec::new())).unwrap();
        f(&mut out).unwrap();
        out.into_inner().into_inner()
    }

    #[test]
    fn test_colored_material_block() {
        let m = colored(Transparency::Opaque, None);
        let bytes = bytes_of(|out| write_material(out, &m));
        assert_eq!(bytes.len(), 8 + 12);
        assert_eq!(u64::from_le_bytes(bytes[..8].try_into().unwrap()), m.shading.code());
        assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 0.25);
    }

    #[test]
    fn test_cutoff_factor_follows_colour() {
        let m = colored(Transparency::Cutoff, Some(0.4));
        let bytes = bytes_of(|out| write_material(out, &m));
        assert_eq!(bytes.len(), 8 + 12 + 4);
        assert_eq!(f32::from_le_bytes(bytes[20..24].try_into().unwrap()), 0.4);
    }

    #[test]
    fn test_model_ref_layouts() {
        let plain = bytes_of(|out| write_model_ref(out, &ModelRef::Model(EntityId(1030))));
        assert_eq!(plain.len(), 1 + 8);
        assert_eq!(plain[0], 0);

        let instance = bytes_of(|out| {
            write_model_ref(
                out,
                &ModelRef::Instance {
                    matrix: glam::Mat4::IDENTITY,
                    origin: EntityId(1030),
                },
            )
        });
        assert_eq!(instance.len(), 1 + 64 + 8);
        assert_eq!(instance[0], 1);
        assert_eq!(u64::from_le_bytes(instance[65..].try_into().unwrap()), 1030);
    }
}
