//! Mesh Encoding
//!
//! Turns editor polygon meshes into welded GPU buffers:
//! - [`VertexAttributes`]: which optional attributes a vertex carries
//! - [`encode_mesh`]: vertex welding and triangle indexing
//! - [`BoundingSphere`]: occlusion volume derived from mesh positions
//! - [`content_digest`]: geometry hash used as the mesh dedup key

mod encoder;

pub use encoder::{MeshBuffer, encode_mesh};

use std::hash::Hasher;

use bitflags::bitflags;
use glam::Vec3;
use rustc_hash::FxHasher;

use crate::scene::MeshData;

bitflags! {
    /// Optional vertex attributes. Position is always present.
    ///
    /// Interleaved vertex layout, in this order:
    /// position `xyz`, normal `xyz`, tangent `xyzw`, uv `xy`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VertexAttributes: u8 {
        const NORMAL  = 1 << 0;
        const UV      = 1 << 1;
        const TANGENT = 1 << 2;
    }
}

impl VertexAttributes {
    /// Number of `f32` components per vertex.
    #[must_use]
    pub fn stride(self) -> usize {
        let mut stride = 3;
        if self.contains(Self::NORMAL) {
            stride += 3;
        }
        if self.contains(Self::TANGENT) {
            stride += 4;
        }
        if self.contains(Self::UV) {
            stride += 2;
        }
        stride
    }
}

/// Sphere enclosing a set of points, written as the model's occlusion volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: 0.0,
    };

    /// Centre of the axis-aligned bounds, radius to the farthest point.
    pub fn from_points(points: impl IntoIterator<Item = Vec3> + Clone) -> Self {
        let mut iter = points.clone().into_iter();
        let Some(first) = iter.next() else {
            return Self::EMPTY;
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .into_iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }
}

/// Hash of the bit patterns of everything [`encode_mesh`] reads.
///
/// Two meshes with equal digests encode to the same buffer for any attribute set.
#[must_use]
pub fn content_digest(mesh: &MeshData) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(mesh.positions.len());
    hasher.write(bytemuck::cast_slice(&mesh.positions));
    hasher.write_usize(mesh.normals.len());
    hasher.write(bytemuck::cast_slice(&mesh.normals));
    hasher.write_usize(mesh.polygons.len());
    for polygon in &mesh.polygons {
        hasher.write_usize(polygon.len());
        hasher.write(bytemuck::cast_slice(polygon));
    }
    hasher.write_usize(mesh.uv_layers.len());
    for layer in &mesh.uv_layers {
        hasher.write_usize(layer.uvs.len());
        hasher.write(bytemuck::cast_slice(&layer.uvs));
    }
    hasher.write_usize(mesh.active_uv_layer);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride() {
        assert_eq!(VertexAttributes::empty().stride(), 3);
        assert_eq!(VertexAttributes::NORMAL.stride(), 6);
        assert_eq!((VertexAttributes::NORMAL | VertexAttributes::UV).stride(), 8);
        assert_eq!(VertexAttributes::all().stride(), 12);
    }

    #[test]
    fn test_bounding_sphere() {
        let points = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)];
        let sphere = BoundingSphere::from_points(points);
        assert_eq!(sphere.center, Vec3::new(1.0, 0.5, 0.0));
        assert!((sphere.radius - Vec3::new(2.0, 0.5, 0.0).length()).abs() < 1e-6);
        assert_eq!(BoundingSphere::from_points(Vec::<Vec3>::new()), BoundingSphere::EMPTY);
    }

    fn triangle(name: &str, offset: f32) -> MeshData {
        MeshData {
            name: name.to_string(),
            positions: vec![
                Vec3::new(offset, 0.0, 0.0),
                Vec3::new(offset + 1.0, 0.0, 0.0),
                Vec3::new(offset, 1.0, 0.0),
            ],
            polygons: vec![vec![0, 1, 2]],
            ..MeshData::default()
        }
    }

    #[test]
    fn test_content_digest_ignores_name_only() {
        assert_eq!(content_digest(&triangle("a", 0.0)), content_digest(&triangle("b", 0.0)));
        assert_ne!(content_digest(&triangle("a", 0.0)), content_digest(&triangle("a", 100.0)));

        let mut split = triangle("a", 0.0);
        split.polygons = vec![vec![0, 1], vec![2]];
        assert_ne!(content_digest(&split), content_digest(&triangle("a", 0.0)));
    }
}
