//! Vertex arena construction and index correction.
//!
//! Turns the raw vertex stream and fan-encoded index stream into a vertex
//! arena plus a flat 0-based triangle list. Normals are assigned per
//! triangle to the triangle's last vertex only; other corners keep whatever
//! an earlier primitive wrote. This is not smoothing; facet normals are read
//! back from this arena.

use glam::Vec3;
use tracing::debug;

use super::fan::FanDecoder;
use super::vertex::{parse_vertices, Vertex};
use crate::util::Result;

/// Output of [`index`].
#[derive(Debug, Clone, Default)]
pub struct IndexedGeometry {
    /// Vertex arena, addressed by the entries of `indices`.
    pub vertices: Vec<Vertex>,
    /// 0-based triangle list (3 per triangle, 6 per quad).
    pub indices: Vec<u32>,
    /// Number of primitives decoded.
    pub primitive_count: usize,
    /// How many of those primitives were quads.
    pub quad_count: usize,
}

impl IndexedGeometry {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex positions, e.g. for building a render mesh.
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }
}

/// Unit normal of triangle `(p1, p2, p3)`; zero when degenerate.
#[inline]
pub fn facet_normal(p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    (p2 - p1).cross(p3 - p1).normalize_or_zero()
}

/// Build the vertex arena and corrected index list.
///
/// Fails with [`crate::Error::IndexRange`] if the index stream references a
/// vertex that does not exist.
#[tracing::instrument(skip_all, fields(vertex_floats = vertex_stream.len(), index_count = index_stream.len()))]
pub fn index(vertex_stream: &[f32], index_stream: &[u32]) -> Result<IndexedGeometry> {
    let mut geometry = IndexedGeometry {
        vertices: parse_vertices(vertex_stream),
        indices: Vec::with_capacity(index_stream.len() / 4 * 6),
        ..Default::default()
    };

    for fan in FanDecoder::new(index_stream, geometry.vertices.len()) {
        let fan = fan?;
        for tri in fan.triangles() {
            geometry.push_triangle(tri);
        }
        geometry.primitive_count += 1;
        if fan.is_quad() {
            geometry.quad_count += 1;
        }
    }

    debug!(
        "Indexed {} primitives ({} quads), {} triangles over {} vertices",
        geometry.primitive_count,
        geometry.quad_count,
        geometry.triangle_count(),
        geometry.vertices.len()
    );

    Ok(geometry)
}

impl IndexedGeometry {
    /// Append a triangle and give its last vertex the triangle normal.
    fn push_triangle(&mut self, [a, b, c]: [u32; 3]) {
        self.indices.extend_from_slice(&[a, b, c]);
        let p = |i: u32| self.vertices[i as usize].position;
        let normal = facet_normal(p(a), p(b), p(c));
        self.vertices[c as usize].normal = normal;
    }
}
