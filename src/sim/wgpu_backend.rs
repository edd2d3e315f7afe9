//! wgpu implementation of [`ComputeBackend`].
//!
//! Both kernels share one bind group layout:
//!
//! | Binding | Type | Buffer |
//! |---------|------|--------|
//! | 0 | Uniform | `TraceUniforms` |
//! | 1 | Storage (read_write) | rays |
//! | 2 | Storage (read) | facets |
//!
//! Kernel sources are WGSL with entry point `main`; their `@workgroup_size`
//! must match the configured workgroup size.

use std::{fs, mem, path::Path, sync::mpsc};

use tracing::{debug, info};

use super::backend::{ComputeBackend, Kernel, Slot};
use super::layout::{GpuFacet, GpuRay, TraceUniforms};
use crate::config::KernelPaths;
use crate::util::{Error, Result};

/// WGSL sources of both kernels.
#[derive(Debug, Clone)]
pub struct KernelSources {
    pub init: String,
    pub trace: String,
}

impl KernelSources {
    pub fn load(paths: &KernelPaths) -> Result<Self> {
        Ok(Self {
            init: read_source(&paths.init)?,
            trace: read_source(&paths.trace)?,
        })
    }

    fn get(&self, kernel: Kernel) -> &str {
        match kernel {
            Kernel::Init => &self.init,
            Kernel::Trace => &self.trace,
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::asset(path, e))
}

/// Device buffer plus the byte length the caller asked for.
///
/// wgpu rejects zero-sized bindings, so empty arrays get one zeroed element
/// while `len` stays 0.
struct SlotBuffer {
    buffer: wgpu::Buffer,
    len: u64,
}

/// Compute backend on a wgpu device and queue.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    init_pipeline: wgpu::ComputePipeline,
    trace_pipeline: wgpu::ComputePipeline,
    uniforms: wgpu::Buffer,
    rays: Option<SlotBuffer>,
    facets: Option<SlotBuffer>,
    bind_group: Option<wgpu::BindGroup>,
    workgroup_size: u32,
}

impl WgpuBackend {
    /// Create a headless device on the default high-performance adapter.
    pub fn new(sources: &KernelSources, workgroup_size: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::backend(format!("no compute adapter: {e}")))?;

        let adapter_info = adapter.get_info();
        info!("Using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tmrt_device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| Error::backend(format!("device request failed: {e}")))?;

        Self::from_device(device, queue, sources, workgroup_size)
    }

    /// Build the kernels on an existing device.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        sources: &KernelSources,
        workgroup_size: u32,
    ) -> Result<Self> {
        if workgroup_size == 0 {
            return Err(Error::backend("workgroup size must be positive"));
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tmrt_bind_group_layout"),
            entries: &[
                layout_entry(Slot::Uniforms, wgpu::BufferBindingType::Uniform),
                layout_entry(Slot::Rays, wgpu::BufferBindingType::Storage { read_only: false }),
                layout_entry(Slot::Facets, wgpu::BufferBindingType::Storage { read_only: true }),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tmrt_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let init_pipeline = create_kernel(&device, &pipeline_layout, sources, Kernel::Init)?;
        let trace_pipeline = create_kernel(&device, &pipeline_layout, sources, Kernel::Trace)?;

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tmrt_uniforms"),
            size: mem::size_of::<TraceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            layout,
            init_pipeline,
            trace_pipeline,
            uniforms,
            rays: None,
            facets: None,
            bind_group: None,
            workgroup_size,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn slot(&self, slot: Slot) -> Result<&SlotBuffer> {
        let buffer = match slot {
            Slot::Rays => self.rays.as_ref(),
            Slot::Facets => self.facets.as_ref(),
            Slot::Uniforms => return Err(Error::backend("uniform slot is managed by dispatch")),
        };
        buffer.ok_or_else(|| Error::backend(format!("buffer at binding {} not created", slot.binding())))
    }

    fn rebuild_bind_group(&mut self) {
        let (Some(rays), Some(facets)) = (&self.rays, &self.facets) else {
            self.bind_group = None;
            return;
        };

        self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tmrt_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: Slot::Uniforms.binding(),
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: Slot::Rays.binding(),
                    resource: rays.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: Slot::Facets.binding(),
                    resource: facets.buffer.as_entire_binding(),
                },
            ],
        }));
    }

    fn poll(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| Error::backend(format!("device poll failed: {e}")))
    }
}

/// Size of one element bound at `slot`.
fn element_size(slot: Slot) -> u64 {
    match slot {
        Slot::Uniforms => mem::size_of::<TraceUniforms>() as u64,
        Slot::Rays => mem::size_of::<GpuRay>() as u64,
        Slot::Facets => mem::size_of::<GpuFacet>() as u64,
    }
}

/// Device size for `len` bytes at `slot`: at least one element, copy aligned.
fn padded_size(slot: Slot, len: u64) -> u64 {
    len.max(element_size(slot)).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// `ceil(invocations / workgroup_size)`, rejected above the device limit.
fn workgroup_count(invocations: u32, workgroup_size: u32, max: u32) -> Result<u32> {
    let groups = invocations.div_ceil(workgroup_size);
    if groups > max {
        return Err(Error::backend(format!(
            "{invocations} invocations need {groups} workgroups, device allows {max}"
        )));
    }
    Ok(groups)
}

fn layout_entry(slot: Slot, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: slot.binding(),
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(element_size(slot)),
        },
        count: None,
    }
}

fn create_kernel(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    sources: &KernelSources,
    kernel: Kernel,
) -> Result<wgpu::ComputePipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kernel.name()),
        source: wgpu::ShaderSource::Wgsl(sources.get(kernel).into()),
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(kernel.name()),
        layout: Some(layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(Error::backend(format!("kernel \"{kernel}\" failed to build: {err}")));
    }
    debug!("Built kernel \"{}\"", kernel);
    Ok(pipeline)
}

impl ComputeBackend for WgpuBackend {
    fn create_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        let usage = match slot {
            Slot::Rays => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC
            }
            Slot::Facets => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            Slot::Uniforms => return Err(Error::backend("uniform slot is managed by dispatch")),
        };

        let len = contents.len() as u64;
        let size = padded_size(slot, len);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(match slot {
                Slot::Rays => "tmrt_rays",
                _ => "tmrt_facets",
            }),
            size,
            usage,
            mapped_at_creation: false,
        });
        if !contents.is_empty() {
            self.queue.write_buffer(&buffer, 0, contents);
        }

        let entry = Some(SlotBuffer { buffer, len });
        match slot {
            Slot::Rays => self.rays = entry,
            _ => self.facets = entry,
        }
        self.rebuild_bind_group();
        Ok(())
    }

    fn write_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        let target = self.slot(slot)?;
        if contents.len() as u64 != target.len {
            return Err(Error::format(format!(
                "buffer at binding {} holds {} bytes, got {}",
                slot.binding(),
                target.len,
                contents.len()
            )));
        }
        if !contents.is_empty() {
            self.queue.write_buffer(&target.buffer, 0, contents);
            self.queue.submit(None);
        }
        Ok(())
    }

    fn read_buffer(&mut self, slot: Slot) -> Result<Vec<u8>> {
        let source = self.slot(slot)?;
        if source.len == 0 {
            return Ok(Vec::new());
        }
        let size = source.len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tmrt_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tmrt_readback_encoder"),
        });
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.poll()?;
        rx.recv()
            .map_err(|_| Error::backend("readback callback dropped"))?
            .map_err(|e| Error::backend(format!("buffer map failed: {e}")))?;

        let bytes = {
            let data = slice.get_mapped_range();
            data[..source.len as usize].to_vec()
        };
        staging.unmap();
        Ok(bytes)
    }

    fn dispatch(&mut self, kernel: Kernel, uniforms: &TraceUniforms, invocations: u32) -> Result<()> {
        let Some(bind_group) = &self.bind_group else {
            return Err(Error::backend("dispatch before ray and facet buffers exist"));
        };
        let max = self.device.limits().max_compute_workgroups_per_dimension;
        let groups = workgroup_count(invocations, self.workgroup_size, max)?;

        self.queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(uniforms));

        let pipeline = match kernel {
            Kernel::Init => &self.init_pipeline,
            Kernel::Trace => &self.trace_pipeline,
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.name()),
        });
        if groups > 0 {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.name()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));

        debug!("Dispatched \"{}\": {} workgroups of {}", kernel, groups, self.workgroup_size);
        self.poll()
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.poll()
    }
}
