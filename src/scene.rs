//! Scene assembly: raw streams to vertices, facets and rays.

use std::fmt;

use tracing::info;

use crate::assets::AssetStreams;
use crate::config::Settings;
use crate::geom::{build_rays, extract_facets, index, Facet, IndexedGeometry, Ray};
use crate::util::Result;

/// Everything the simulation needs from disk, decoded.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Vertex arena and corrected triangle list (for rendering).
    pub geometry: IndexedGeometry,
    /// Facets in emission order; `facets[i].id == i`.
    pub facets: Vec<Facet>,
    /// Initial rays, origins only.
    pub rays: Vec<Ray>,
}

impl Scene {
    /// Decode already-loaded streams.
    #[tracing::instrument(skip_all)]
    pub fn from_streams(streams: &AssetStreams) -> Result<Self> {
        let geometry = index(&streams.vertices, &streams.indices)?;
        let facets = extract_facets(&geometry.vertices, &streams.indices, &streams.materials)?;
        let rays = build_rays(&streams.rays);

        let scene = Self { geometry, facets, rays };
        info!("Scene ready: {}", scene.stats());
        Ok(scene)
    }

    /// Load and decode the assets named in `settings`.
    pub fn load(settings: &Settings) -> Result<Self> {
        let streams = AssetStreams::load_opts(&settings.assets, settings.use_mmap)?;
        Self::from_streams(&streams)
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            vertices: self.geometry.vertices.len(),
            indices: self.geometry.indices.len(),
            facets: self.facets.len(),
            quads: self.geometry.quad_count,
            rays: self.rays.len(),
        }
    }
}

/// Element counts of a loaded scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStats {
    pub vertices: usize,
    pub indices: usize,
    pub facets: usize,
    pub quads: usize,
    pub rays: usize,
}

impl fmt::Display for SceneStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} indices, {} facets ({} quads), {} rays",
            self.vertices, self.indices, self.facets, self.quads, self.rays
        )
    }
}
