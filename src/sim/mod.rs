//! Device-side simulation: buffers, kernel sequencing and backends.

mod backend;
mod buffers;
mod layout;
mod pipeline;

#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use backend::{ComputeBackend, Kernel, Slot};
pub use buffers::SimulationBuffers;
pub use layout::{GpuFacet, GpuRay, TraceUniforms};
pub use pipeline::{ComputePipeline, PipelineState};

#[cfg(feature = "gpu")]
pub use wgpu_backend::{KernelSources, WgpuBackend};
