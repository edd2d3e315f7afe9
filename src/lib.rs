//! # TMRT
//!
//! Ray-tracing core for mean radiant temperature studies: decodes a
//! fan-encoded building mesh into renderable geometry and per-facet
//! records, builds a ray set, and traces it on a compute device.
//!
//! ## Modules
//!
//! - [`util`] - Error type
//! - [`assets`] - Raw typed-array loading
//! - [`geom`] - Fan decoding, vertex indexing, facets and rays
//! - [`scene`] - Assembled scene
//! - [`sim`] - Device buffers, kernel sequencing, compute backends
//! - [`export`] - Result file and summary
//! - [`driver`] - Command-driven lifecycle
//! - [`config`] - Settings
//!
//! ## Example
//!
//! ```ignore
//! use tmrt::prelude::*;
//!
//! let settings = Settings::load();
//! let scene = Scene::load(&settings)?;
//! let sources = KernelSources::load(&settings.kernels)?;
//! let backend = WgpuBackend::new(&sources, settings.workgroup_size)?;
//!
//! let mut sim = Simulation::new(
//!     ComputePipeline::new(backend, &scene, settings.origin())?,
//!     &settings.export_path,
//! );
//! sim.on_attach()?;
//! sim.on_event(&Command::Run)?;
//! sim.on_event(&Command::Save(None))?;
//! ```

pub mod util;
pub mod assets;
pub mod geom;
pub mod config;
pub mod scene;
pub mod sim;
pub mod export;
pub mod driver;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::config::Settings;
    pub use crate::scene::{Scene, SceneStats};
    pub use crate::geom::{Facet, Ray, Vertex};
    pub use crate::sim::{ComputeBackend, ComputePipeline, Kernel, PipelineState, Slot};
    pub use crate::export::{HitRecord, ResultSummary};
    pub use crate::driver::{Command, Driver, Outcome, Simulation};

    #[cfg(feature = "gpu")]
    pub use crate::sim::{KernelSources, WgpuBackend};
}
