//! Facet extraction.
//!
//! A facet is one primitive of the index stream (triangle or quad) with its
//! corner positions resolved, a single normal and a material tag. Facets are
//! what the trace kernel intersects rays against.

use glam::Vec3;
use tracing::{debug, warn};

use super::fan::{decode_fans, Fan};
use super::vertex::Vertex;
use crate::util::{Error, Result};

/// Fourth corner of a triangle facet.
pub const P4_SENTINEL: Vec3 = Vec3::splat(-1.0);

/// A triangle or quad ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    /// Emission order, also the id reported in hit results.
    pub id: u32,
    pub p1: Vec3,
    pub p2: Vec3,
    pub p3: Vec3,
    /// Fourth corner, or [`P4_SENTINEL`] for triangles.
    pub p4: Vec3,
    pub normal: Vec3,
    /// Material tag (specular/diffuse), copied from the material stream.
    pub specular: u32,
}

impl Facet {
    fn from_fan(id: u32, fan: &Fan, vertices: &[Vertex], specular: u32) -> Self {
        let pos = |i: u32| vertices[i as usize].position;
        let [a, b, c] = fan.primary();
        let p4 = match *fan {
            Fan::Triangle(_) => P4_SENTINEL,
            Fan::Quad([.., d]) => pos(d),
        };

        Self {
            id,
            p1: pos(a),
            p2: pos(b),
            p3: pos(c),
            p4,
            // Arena normal of the third corner, as left by the indexer
            normal: vertices[c as usize].normal,
            specular,
        }
    }
}

/// Extract facets from the raw index stream.
///
/// `vertices` must be the arena produced by [`super::index`] over the same
/// stream. Fails with [`Error::FormatMismatch`] when the material stream is
/// shorter than the number of decoded primitives; surplus materials are
/// ignored.
#[tracing::instrument(skip_all, fields(index_count = index_stream.len(), materials = materials.len()))]
pub fn extract_facets(vertices: &[Vertex], index_stream: &[u32], materials: &[u32]) -> Result<Vec<Facet>> {
    let fans = decode_fans(index_stream, vertices.len())?;

    if materials.len() < fans.len() {
        return Err(Error::format(format!(
            "material stream has {} entries but {} facets were decoded",
            materials.len(),
            fans.len()
        )));
    }
    if materials.len() > fans.len() {
        warn!(
            "Material stream has {} entries for {} facets; ignoring the rest",
            materials.len(),
            fans.len()
        );
    }

    let facets: Vec<Facet> = fans
        .iter()
        .zip(materials)
        .enumerate()
        .map(|(id, (fan, &specular))| Facet::from_fan(id as u32, fan, vertices, specular))
        .collect();

    debug!("Extracted {} facets", facets.len());
    Ok(facets)
}
