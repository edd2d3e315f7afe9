//! Device mirrors of the ray and facet arrays.

use std::{any, mem};

use tracing::{debug, info};

use super::backend::{ComputeBackend, Slot};
use super::layout::{GpuFacet, GpuRay};
use crate::geom::{Facet, Ray};
use crate::util::{Error, Result};

/// Ray buffer (slot 1) and facet buffer (slot 2) on a compute backend.
///
/// Both lengths are fixed at creation. The original ray array is kept on
/// the host so [`reset`](Self::reset) can restore it.
pub struct SimulationBuffers<B> {
    backend: B,
    initial_rays: Vec<GpuRay>,
    facet_count: usize,
}

impl<B: ComputeBackend> SimulationBuffers<B> {
    /// Allocate both buffers and upload the initial contents.
    pub fn new(mut backend: B, rays: &[Ray], facets: &[Facet]) -> Result<Self> {
        let initial_rays: Vec<GpuRay> = rays.iter().map(GpuRay::from).collect();
        let gpu_facets: Vec<GpuFacet> = facets.iter().map(GpuFacet::from).collect();

        info!(
            "Allocating ray buffer ({} x {}) and facet buffer ({} x {})",
            initial_rays.len(),
            any::type_name::<GpuRay>(),
            gpu_facets.len(),
            any::type_name::<GpuFacet>(),
        );

        backend.create_buffer(Slot::Rays, bytemuck::cast_slice(&initial_rays))?;
        backend.create_buffer(Slot::Facets, bytemuck::cast_slice(&gpu_facets))?;

        Ok(Self {
            backend,
            initial_rays,
            facet_count: gpu_facets.len(),
        })
    }

    #[inline]
    pub fn ray_count(&self) -> usize {
        self.initial_rays.len()
    }

    #[inline]
    pub fn facet_count(&self) -> usize {
        self.facet_count
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Overwrite the whole ray buffer.
    pub fn upload(&mut self, rays: &[Ray]) -> Result<()> {
        if rays.len() != self.ray_count() {
            return Err(Error::format(format!(
                "ray buffer holds {} rays, got {}",
                self.ray_count(),
                rays.len()
            )));
        }
        let gpu: Vec<GpuRay> = rays.iter().map(GpuRay::from).collect();
        self.write_rays(&gpu)
    }

    /// Restore the ray array the buffers were created with.
    pub fn reset(&mut self) -> Result<()> {
        self.backend.wait_idle()?;
        self.backend.write_buffer(Slot::Rays, bytemuck::cast_slice(&self.initial_rays))?;
        debug!("Ray buffer reset to {} initial rays", self.initial_rays.len());
        Ok(())
    }

    fn write_rays(&mut self, rays: &[GpuRay]) -> Result<()> {
        self.backend.wait_idle()?;
        self.backend.write_buffer(Slot::Rays, bytemuck::cast_slice(rays))
    }

    /// Blocking copy of the current ray buffer to the host.
    pub fn readback(&mut self) -> Result<Vec<Ray>> {
        self.backend.wait_idle()?;
        let bytes = self.backend.read_buffer(Slot::Rays)?;

        let expected = self.ray_count() * mem::size_of::<GpuRay>();
        if bytes.len() != expected {
            return Err(Error::format(format!(
                "ray buffer readback returned {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }

        let gpu: Vec<GpuRay> = bytemuck::pod_collect_to_vec(&bytes);
        Ok(gpu.iter().map(Ray::from).collect())
    }
}
