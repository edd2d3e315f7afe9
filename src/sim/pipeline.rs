//! Kernel sequencing over the simulation buffers.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use glam::Vec3;
use tracing::{info, warn};

use super::backend::{ComputeBackend, Kernel};
use super::buffers::SimulationBuffers;
use super::layout::TraceUniforms;
use crate::export::{self, ResultSummary};
use crate::geom::Ray;
use crate::scene::Scene;
use crate::util::{Error, Result};

/// Lifecycle of the ray buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Buffers hold the uploaded rays; no kernel has run.
    #[default]
    Idle,
    /// "init" has run; rays are ready to trace.
    Initialized,
    /// "trace" has run at least once since the last init.
    Traced,
}

impl PipelineState {
    pub const fn name(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Initialized => "initialized",
            PipelineState::Traced => "traced",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs "init" and "trace" against one scene.
pub struct ComputePipeline<B> {
    buffers: SimulationBuffers<B>,
    origin: Vec3,
    state: PipelineState,
}

impl<B: ComputeBackend> ComputePipeline<B> {
    /// Upload `scene` to `backend`. The pipeline starts `Idle`.
    pub fn new(backend: B, scene: &Scene, origin: Vec3) -> Result<Self> {
        let buffers = SimulationBuffers::new(backend, &scene.rays, &scene.facets)?;
        Ok(Self {
            buffers,
            origin,
            state: PipelineState::Idle,
        })
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn buffers(&self) -> &SimulationBuffers<B> {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut SimulationBuffers<B> {
        &mut self.buffers
    }

    fn uniforms(&self, kernel: Kernel) -> Result<TraceUniforms> {
        let size = match kernel {
            Kernel::Init => 0,
            Kernel::Trace => count_u32(self.buffers.facet_count(), "facets")?,
        };
        Ok(TraceUniforms::new(self.origin, size))
    }

    /// Run one kernel over every ray and wait for it to finish.
    pub fn execute(&mut self, kernel: Kernel) -> Result<()> {
        if kernel == Kernel::Trace && self.state == PipelineState::Idle {
            return Err(Error::PipelineState { op: "trace", state: self.state.name() });
        }

        let uniforms = self.uniforms(kernel)?;
        let invocations = count_u32(self.buffers.ray_count(), "rays")?;

        let start = Instant::now();
        self.buffers.backend_mut().dispatch(kernel, &uniforms, invocations)?;
        let elapsed = start.elapsed();

        self.state = match kernel {
            Kernel::Init => PipelineState::Initialized,
            Kernel::Trace => PipelineState::Traced,
        };

        info!(
            "Kernel \"{}\" finished in {:.3}s ({:.1} ms) over {} rays",
            kernel,
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() * 1000.0,
            invocations
        );
        Ok(())
    }

    /// Restore the original rays and re-run "init".
    pub fn reset(&mut self) -> Result<()> {
        self.buffers.reset()?;
        self.execute(Kernel::Init)
    }

    /// Current ray buffer contents.
    pub fn rays(&mut self) -> Result<Vec<Ray>> {
        self.buffers.readback()
    }

    /// Write the current results to `path` and summarize them.
    pub fn export(&mut self, path: impl AsRef<Path>) -> Result<ResultSummary> {
        if self.state == PipelineState::Idle {
            warn!("Exporting before any kernel ran; results are all zero");
        }
        let rays = self.buffers.readback()?;
        export::write_results(path, &rays)?;
        Ok(ResultSummary::from_rays(&rays))
    }
}

/// Element counts reach the kernels as u32.
fn count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::format(format!("{count} {what} exceed the kernel limit of {}", u32::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Facet, P4_SENTINEL};
    use crate::sim::Slot;

    /// Records dispatches; "init" stamps a marker into every ray.
    #[derive(Default)]
    struct RecordingBackend {
        rays: Vec<u8>,
        facets: Vec<u8>,
        dispatches: Vec<(Kernel, TraceUniforms, u32)>,
    }

    impl ComputeBackend for RecordingBackend {
        fn create_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
            match slot {
                Slot::Rays => self.rays = contents.to_vec(),
                Slot::Facets => self.facets = contents.to_vec(),
                Slot::Uniforms => {}
            }
            Ok(())
        }

        fn write_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
            assert_eq!(slot, Slot::Rays);
            assert_eq!(contents.len(), self.rays.len());
            self.rays = contents.to_vec();
            Ok(())
        }

        fn read_buffer(&mut self, _slot: Slot) -> Result<Vec<u8>> {
            Ok(self.rays.clone())
        }

        fn dispatch(&mut self, kernel: Kernel, uniforms: &TraceUniforms, invocations: u32) -> Result<()> {
            self.dispatches.push((kernel, *uniforms, invocations));
            let mut rays: Vec<crate::sim::GpuRay> = bytemuck::pod_collect_to_vec(&self.rays);
            for r in &mut rays {
                match kernel {
                    Kernel::Init => r.direction = uniforms.origin,
                    Kernel::Trace => r.bounce += 1,
                }
            }
            self.rays = bytemuck::cast_slice(&rays).to_vec();
            Ok(())
        }

        fn wait_idle(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn scene() -> Scene {
        let facet = Facet {
            id: 0,
            p1: Vec3::ZERO,
            p2: Vec3::X,
            p3: Vec3::Y,
            p4: P4_SENTINEL,
            normal: Vec3::Z,
            specular: 0,
        };
        Scene {
            facets: vec![facet],
            rays: crate::geom::build_rays(&[0.0, 0.0, 1.0, 2.0, 2.0, 2.0]),
            ..Default::default()
        }
    }

    fn pipeline() -> ComputePipeline<RecordingBackend> {
        ComputePipeline::new(RecordingBackend::default(), &scene(), Vec3::new(30.5, 10.5, 1.5)).unwrap()
    }

    #[test]
    fn test_trace_before_init_fails() {
        let mut p = pipeline();
        let err = p.execute(Kernel::Trace).unwrap_err();
        assert!(matches!(err, Error::PipelineState { op: "trace", state: "idle" }));
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.buffers().backend().dispatches.is_empty());
    }

    #[test]
    fn test_uniforms_per_kernel() {
        let mut p = pipeline();
        p.execute(Kernel::Init).unwrap();
        p.execute(Kernel::Trace).unwrap();
        assert_eq!(p.state(), PipelineState::Traced);

        let d = &p.buffers().backend().dispatches;
        assert_eq!(d[0].0, Kernel::Init);
        assert_eq!(d[0].1.origin, [30.5, 10.5, 1.5]);
        assert_eq!(d[0].2, 2);
        assert_eq!(d[1].0, Kernel::Trace);
        assert_eq!(d[1].1.size, 1);
    }

    #[test]
    fn test_counts_fit_kernel_range() {
        assert_eq!(count_u32(0, "rays").unwrap(), 0);
        assert_eq!(count_u32(u32::MAX as usize, "rays").unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_count_is_rejected() {
        let err = count_u32(u32::MAX as usize + 1, "rays").unwrap_err();
        assert!(matches!(err, Error::FormatMismatch(_)), "got {err}");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut p = pipeline();
        p.execute(Kernel::Init).unwrap();
        p.execute(Kernel::Trace).unwrap();
        p.execute(Kernel::Trace).unwrap();

        p.reset().unwrap();
        let once = p.rays().unwrap();
        p.reset().unwrap();
        let twice = p.rays().unwrap();

        assert_eq!(once, twice);
        assert_eq!(p.state(), PipelineState::Initialized);
        assert!(once.iter().all(|r| r.bounce_count == 0));
    }

    #[test]
    fn test_export_before_execute_writes_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");

        let mut p = pipeline();
        let summary = p.export(&path).unwrap();
        assert_eq!(summary.rays, 2);
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 24]);
        assert_eq!(p.state(), PipelineState::Idle);
    }
}
