//! Scene vertices.

use glam::Vec3;
use tracing::warn;

/// Auxiliary scalar above which a vertex is drawn with [`HOT_COLOR`].
pub const HOT_THRESHOLD: f32 = 300.0;
/// Color of vertices whose auxiliary scalar exceeds [`HOT_THRESHOLD`].
pub const HOT_COLOR: Vec3 = Vec3::new(0.2, 0.2, 1.0);
/// Color of every other vertex.
pub const COLD_COLOR: Vec3 = Vec3::new(0.3, 0.3, 0.3);

/// Floats per vertex in the raw stream: x, y, z, auxiliary scalar.
pub const VERTEX_STRIDE: usize = 4;

/// A vertex of the scene arena.
///
/// `normal` is written by the indexer, one primitive at a time; a vertex
/// shared by several primitives keeps the normal of the last one that
/// assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    /// Build a vertex from one `[x, y, z, aux]` group.
    pub fn from_raw(raw: &[f32; VERTEX_STRIDE]) -> Self {
        let [x, y, z, aux] = *raw;
        Self {
            position: Vec3::new(x, y, z),
            color: if aux > HOT_THRESHOLD { HOT_COLOR } else { COLD_COLOR },
            normal: Vec3::ZERO,
        }
    }
}

/// Parse the raw vertex stream into the vertex arena.
pub fn parse_vertices(stream: &[f32]) -> Vec<Vertex> {
    let chunks = stream.chunks_exact(VERTEX_STRIDE);
    if !chunks.remainder().is_empty() {
        warn!(
            "Vertex stream length {} is not a multiple of {}; dropping {} floats",
            stream.len(),
            VERTEX_STRIDE,
            chunks.remainder().len()
        );
    }

    chunks
        .map(|c| Vertex::from_raw(&[c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_and_colors() {
        let stream = [
            1.0, 2.0, 3.0, 301.0, //
            4.0, 5.0, 6.0, 300.0, //
            7.0, 8.0, 9.0, -5.0,
        ];
        let vertices = parse_vertices(&stream);

        assert_eq!(vertices.len(), 3);
        for (i, v) in vertices.iter().enumerate() {
            let base = i * 4;
            assert_eq!(v.position, Vec3::new(stream[base], stream[base + 1], stream[base + 2]));
            let expected = if stream[base + 3] > 300.0 { HOT_COLOR } else { COLD_COLOR };
            assert_eq!(v.color, expected);
            assert_eq!(v.normal, Vec3::ZERO);
        }
        // Exactly 300 is not hot
        assert_eq!(vertices[1].color, COLD_COLOR);
    }

    #[test]
    fn test_remainder_dropped() {
        let stream = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        assert_eq!(parse_vertices(&stream).len(), 1);
    }
}
