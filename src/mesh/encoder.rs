use glam::{Mat3, Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use super::VertexAttributes;
use crate::errors::{ExportError, Result};
use crate::scene::MeshData;

/// Welded vertex buffer plus triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    pub attributes: VertexAttributes,
    /// Interleaved vertex floats, [`VertexAttributes::stride`] per vertex.
    pub vertices: Vec<f32>,
    /// One entry per polygon corner.
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.attributes.stride()
    }

    /// Position of vertex `index`.
    #[must_use]
    pub fn position(&self, index: usize) -> Vec3 {
        let start = index * self.attributes.stride();
        Vec3::from_slice(&self.vertices[start..start + 3])
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + Clone + '_ {
        (0..self.vertex_count()).map(|i| self.position(i))
    }
}

/// Corner attributes gathered before welding.
struct Corner {
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
}

/// Welds `mesh` into a [`MeshBuffer`] carrying `attributes`.
///
/// `basis` maps the mesh's local space into the target space. Normals go
/// through its inverse transpose and are renormalised. V coordinates are
/// flipped so that the texture origin sits at the top-left corner.
pub fn encode_mesh(object: &str, mesh: &MeshData, attributes: VertexAttributes, basis: Mat4) -> Result<MeshBuffer> {
    let want_normal = attributes.intersects(VertexAttributes::NORMAL | VertexAttributes::TANGENT);
    let want_uv = attributes.intersects(VertexAttributes::UV | VertexAttributes::TANGENT);

    if want_normal && mesh.normals.len() != mesh.positions.len() {
        return Err(ExportError::mesh(
            object,
            format!(
                "{} normals for {} vertices",
                mesh.normals.len(),
                mesh.positions.len()
            ),
        ));
    }

    let uvs = if want_uv {
        if mesh.uv_layers.len() != 1 {
            return Err(ExportError::mesh(
                object,
                format!("expected exactly one UV layer, found {}", mesh.uv_layers.len()),
            ));
        }
        let layer = &mesh.uv_layers[mesh.active_uv_layer.min(mesh.uv_layers.len() - 1)];
        if layer.uvs.len() < mesh.corner_count() {
            return Err(ExportError::mesh(
                object,
                format!("UV layer '{}' does not cover every polygon corner", layer.name),
            ));
        }
        Some(layer.uvs.as_slice())
    } else {
        None
    };

    let normal_matrix = Mat3::from_mat4(basis).inverse().transpose();

    let mut welder = Welder::new(attributes);
    let mut corner_index = 0usize;
    let mut key = Vec::with_capacity(attributes.stride());

    for (p, polygon) in mesh.polygons.iter().enumerate() {
        if polygon.len() != 3 {
            return Err(ExportError::mesh(
                object,
                format!("polygon {p} has {} vertices, only triangles are accepted", polygon.len()),
            ));
        }

        let mut corners = Vec::with_capacity(3);
        for &vertex in polygon {
            let v = vertex as usize;
            let Some(&local) = mesh.positions.get(v) else {
                return Err(ExportError::mesh(
                    object,
                    format!("polygon {p} references missing vertex {vertex}"),
                ));
            };
            let normal = if want_normal {
                (normal_matrix * mesh.normals[v]).normalize_or_zero()
            } else {
                Vec3::ZERO
            };
            let uv = uvs.map_or(Vec2::ZERO, |uvs| {
                let raw = uvs[corner_index];
                Vec2::new(raw.x, 1.0 - raw.y)
            });
            corners.push(Corner {
                position: basis.transform_point3(local),
                normal,
                uv,
            });
            corner_index += 1;
        }

        let face_tangent = attributes
            .contains(VertexAttributes::TANGENT)
            .then(|| face_tangent(&corners));

        for corner in &corners {
            key.clear();
            key.extend_from_slice(&corner.position.to_array());
            if attributes.contains(VertexAttributes::NORMAL) {
                key.extend_from_slice(&corner.normal.to_array());
            }
            if let Some((tangent, bitangent)) = face_tangent {
                key.extend_from_slice(&corner_tangent(corner.normal, tangent, bitangent));
            }
            if attributes.contains(VertexAttributes::UV) {
                key.extend_from_slice(&corner.uv.to_array());
            }
            welder.push(&key);
        }
    }

    Ok(welder.finish())
}

/// Insertion-ordered map from bit-exact vertex tuples to buffer slots.
struct Welder {
    attributes: VertexAttributes,
    slots: FxHashMap<Vec<u32>, u32>,
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl Welder {
    fn new(attributes: VertexAttributes) -> Self {
        Self {
            attributes,
            slots: FxHashMap::default(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn push(&mut self, vertex: &[f32]) {
        let bits: &[u32] = bytemuck::cast_slice(vertex);
        let next = self.slots.len() as u32;
        let slot = *self.slots.entry(bits.to_vec()).or_insert_with(|| {
            self.vertices.extend_from_slice(vertex);
            next
        });
        self.indices.push(slot);
    }

    fn finish(self) -> MeshBuffer {
        MeshBuffer {
            attributes: self.attributes,
            vertices: self.vertices,
            indices: self.indices,
        }
    }
}

/// Triangle tangent and bitangent from the UV gradient.
fn face_tangent(corners: &[Corner]) -> (Vec3, Vec3) {
    let e1 = corners[1].position - corners[0].position;
    let e2 = corners[2].position - corners[0].position;
    let d1 = corners[1].uv - corners[0].uv;
    let d2 = corners[2].uv - corners[0].uv;
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() <= f32::EPSILON {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let r = det.recip();
    ((e1 * d2.y - e2 * d1.y) * r, (e2 * d1.x - e1 * d2.x) * r)
}

/// Tangent orthogonalised against the corner normal, `w` holds handedness.
fn corner_tangent(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> [f32; 4] {
    let t = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
    let t = if t == Vec3::ZERO { normal.any_orthonormal_vector() } else { t };
    let w = if normal.cross(t).dot(bitangent) < 0.0 { -1.0 } else { 1.0 };
    [t.x, t.y, t.z, w]
}
