//! Simulation settings.
//!
//! Settings are JSON. Without an explicit file they are read from
//! `<config_dir>/tmrt/settings.json`, falling back to defaults. Relative
//! paths in a settings file are resolved against the file's directory.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Largest workgroup size accepted by every wgpu backend.
const MAX_WORKGROUP_SIZE: u32 = 256;

/// Locations of the four raw scene streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub rays: PathBuf,
    pub vertices: PathBuf,
    pub indices: PathBuf,
    pub materials: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            rays: "assets/geometry/rayons.12800.float3".into(),
            vertices: "assets/geometry/vertices.float3".into(),
            indices: "assets/geometry/indices.uint".into(),
            materials: "assets/geometry/materials.uint".into(),
        }
    }
}

/// WGSL sources of the two kernels (entry point `main`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelPaths {
    pub init: PathBuf,
    pub trace: PathBuf,
}

impl Default for KernelPaths {
    fn default() -> Self {
        Self {
            init: "assets/shaders/init.cs.wgsl".into(),
            trace: "assets/shaders/raytracing.cs.wgsl".into(),
        }
    }
}

/// Settings for one simulation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assets: AssetPaths,
    pub kernels: KernelPaths,

    /// Fixed point the kernels trace from
    pub origin: [f32; 3],

    /// Invocations per workgroup (must match @workgroup_size in the kernels)
    pub workgroup_size: u32,

    /// Default destination of `save` when no path is given
    pub export_path: PathBuf,

    /// Memory-map assets instead of buffered reads
    pub use_mmap: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            kernels: KernelPaths::default(),
            origin: [30.5, 10.5, 1.5],
            workgroup_size: 128,
            export_path: "file.bin".into(),
            use_mmap: true,
        }
    }
}

impl Settings {
    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("tmrt");
            p.push("settings.json");
            p
        })
    }

    /// Load from the default location, or defaults if absent or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::default_path().filter(|p| p.exists()) else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from an explicit file. Errors are reported, not swallowed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::asset(path, e))?;
        let mut settings: Self = serde_json::from_str(&json)?;

        if let Some(base) = path.parent() {
            settings.resolve_relative(base);
        }
        settings.validate()?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save to an explicit file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Save to the default location, ignoring failures.
    pub fn save(&self) {
        if let Some(path) = Self::default_path() {
            if let Err(e) = self.save_to(&path) {
                warn!("Could not save settings to {}: {}", path.display(), e);
            }
        }
    }

    /// Check values the backend cannot recover from.
    pub fn validate(&self) -> Result<()> {
        if self.workgroup_size == 0 || self.workgroup_size > MAX_WORKGROUP_SIZE {
            return Err(Error::Config(format!(
                "workgroup_size must be in 1..={}, got {}",
                MAX_WORKGROUP_SIZE, self.workgroup_size
            )));
        }
        if !self.origin.iter().all(|c| c.is_finite()) {
            return Err(Error::Config(format!("origin must be finite, got {:?}", self.origin)));
        }
        Ok(())
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_relative(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.assets.rays);
        fix(&mut self.assets.vertices);
        fix(&mut self.assets.indices);
        fix(&mut self.assets.materials);
        fix(&mut self.kernels.init);
        fix(&mut self.kernels.trace);
        fix(&mut self.export_path);
    }
}
