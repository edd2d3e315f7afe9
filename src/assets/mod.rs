//! Scene asset streams.
//!
//! Four raw files make up a scene: ray origins (`f32` x3), vertices
//! (`f32` x4: position + auxiliary scalar), fan-encoded indices (`u32`) and
//! per-facet materials (`u32`).

mod loader;

pub use loader::{load_typed, load_typed_opts};

use tracing::info;

use crate::config::AssetPaths;
use crate::util::Result;

/// Flat streams as read from disk, before any decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetStreams {
    pub rays: Vec<f32>,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub materials: Vec<u32>,
}

impl AssetStreams {
    /// Load all four streams. Fails on the first unreadable file.
    pub fn load(paths: &AssetPaths) -> Result<Self> {
        Self::load_opts(paths, true)
    }

    /// Load all four streams, optionally memory-mapped.
    #[tracing::instrument(skip_all)]
    pub fn load_opts(paths: &AssetPaths, use_mmap: bool) -> Result<Self> {
        let streams = Self {
            rays: load_typed_opts(&paths.rays, use_mmap)?,
            vertices: load_typed_opts(&paths.vertices, use_mmap)?,
            indices: load_typed_opts(&paths.indices, use_mmap)?,
            materials: load_typed_opts(&paths.materials, use_mmap)?,
        };

        info!(
            "Loaded assets: {} ray floats, {} vertex floats, {} indices, {} materials",
            streams.rays.len(),
            streams.vertices.len(),
            streams.indices.len(),
            streams.materials.len()
        );

        Ok(streams)
    }
}
