//! Shared fixtures: a CPU compute backend and on-disk scene assets.

#![allow(dead_code)]

use std::path::Path;

use glam::Vec3;
use tmrt::config::{AssetPaths, Settings};
use tmrt::geom::SENTINEL;
use tmrt::sim::{ComputeBackend, GpuFacet, GpuRay, Kernel, Slot, TraceUniforms};
use tmrt::{Error, Result};

/// Bounce cap of the CPU trace kernel.
pub const MAX_BOUNCES: u32 = 8;

const EPSILON: f32 = 1e-5;

/// Runs both kernels on the host over the same byte buffers a device would hold.
#[derive(Default)]
pub struct CpuBackend {
    rays: Vec<u8>,
    facets: Vec<u8>,
    pub dispatches: Vec<Kernel>,
    pub barriers: usize,
}

impl CpuBackend {
    fn buffer_mut(&mut self, slot: Slot) -> Result<&mut Vec<u8>> {
        match slot {
            Slot::Rays => Ok(&mut self.rays),
            Slot::Facets => Ok(&mut self.facets),
            Slot::Uniforms => Err(Error::backend("uniforms are passed to dispatch")),
        }
    }

    fn init(&mut self, uniforms: &TraceUniforms) {
        let origin = Vec3::from_array(uniforms.origin);
        let mut rays: Vec<GpuRay> = bytemuck::pod_collect_to_vec(&self.rays);
        for r in &mut rays {
            let target = Vec3::from_array(r.origin);
            r.start = origin.to_array();
            r.end = target.to_array();
            r.direction = (target - origin).normalize_or_zero().to_array();
            r.first_hit_id = u32::MAX;
            r.last_hit_id = u32::MAX;
            r.bounce = 0;
            r.hit_sky = 0;
            r.hit_diffuse = 0;
        }
        self.rays = bytemuck::cast_slice(&rays).to_vec();
    }

    fn trace(&mut self, uniforms: &TraceUniforms) {
        let facets: Vec<GpuFacet> = bytemuck::pod_collect_to_vec(&self.facets);
        let facets = &facets[..(uniforms.size as usize).min(facets.len())];

        let mut rays: Vec<GpuRay> = bytemuck::pod_collect_to_vec(&self.rays);
        for r in &mut rays {
            trace_ray(r, facets);
        }
        self.rays = bytemuck::cast_slice(&rays).to_vec();
    }
}

fn trace_ray(r: &mut GpuRay, facets: &[GpuFacet]) {
    let mut pos = Vec3::from_array(r.start);
    let mut dir = Vec3::from_array(r.direction);

    while r.bounce < MAX_BOUNCES {
        let Some((t, facet)) = nearest_hit(pos, dir, facets) else {
            r.hit_sky = 1;
            break;
        };

        if r.bounce == 0 {
            r.first_hit_id = facet.id;
        }
        r.last_hit_id = facet.id;
        r.bounce += 1;
        pos += dir * t;
        r.end = pos.to_array();

        if facet.specular == 0 {
            r.hit_diffuse = 1;
            break;
        }
        let n = Vec3::from_array(facet.normal);
        dir = dir - 2.0 * dir.dot(n) * n;
        pos += dir * EPSILON * 10.0;
    }
    r.direction = dir.to_array();
}

fn nearest_hit(pos: Vec3, dir: Vec3, facets: &[GpuFacet]) -> Option<(f32, &GpuFacet)> {
    let mut best: Option<(f32, &GpuFacet)> = None;
    for f in facets {
        let p1 = Vec3::from_array(f.p1);
        let p2 = Vec3::from_array(f.p2);
        let p3 = Vec3::from_array(f.p3);
        let p4 = Vec3::from_array(f.p4);

        let mut t = intersect(pos, dir, p1, p2, p3);
        if p4 != tmrt::geom::P4_SENTINEL {
            t = match (t, intersect(pos, dir, p1, p3, p4)) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        if let Some(t) = t {
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, f));
            }
        }
    }
    best
}

/// Möller–Trumbore; distance along `dir` of a hit in front of `pos`.
fn intersect(pos: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = pos - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t > EPSILON).then_some(t)
}

impl ComputeBackend for CpuBackend {
    fn create_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        *self.buffer_mut(slot)? = contents.to_vec();
        Ok(())
    }

    fn write_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        let buf = self.buffer_mut(slot)?;
        if buf.len() != contents.len() {
            return Err(Error::format("buffer length is fixed at creation"));
        }
        buf.copy_from_slice(contents);
        Ok(())
    }

    fn read_buffer(&mut self, slot: Slot) -> Result<Vec<u8>> {
        Ok(self.buffer_mut(slot)?.clone())
    }

    fn dispatch(&mut self, kernel: Kernel, uniforms: &TraceUniforms, _invocations: u32) -> Result<()> {
        self.dispatches.push(kernel);
        match kernel {
            Kernel::Init => self.init(uniforms),
            Kernel::Trace => self.trace(uniforms),
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.barriers += 1;
        Ok(())
    }
}

/// Ground triangle (facet 0, diffuse) and a mirror wall quad (facet 1).
pub struct Fixture {
    pub rays: Vec<f32>,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub materials: Vec<u32>,
}

impl Fixture {
    /// One ray aimed at a point on the ground triangle.
    pub fn ground_and_wall() -> Self {
        Self {
            rays: vec![1.0, 1.0, 0.0],
            vertices: vec![
                // ground triangle, z = 0
                0.0, 0.0, 0.0, 310.0, //
                10.0, 0.0, 0.0, 0.0, //
                0.0, 10.0, 0.0, 0.0, //
                // wall quad, x = 20
                20.0, 0.0, 0.0, 0.0, //
                20.0, 10.0, 0.0, 0.0, //
                20.0, 10.0, 10.0, 0.0, //
                20.0, 0.0, 10.0, 0.0,
            ],
            indices: vec![1, 2, 3, SENTINEL, 4, 5, 6, 7],
            materials: vec![0, 1],
        }
    }

    /// Write the four streams under `dir` and return matching settings.
    pub fn write(&self, dir: &Path) -> Settings {
        let assets = AssetPaths {
            rays: dir.join("rays.float3"),
            vertices: dir.join("vertices.float3"),
            indices: dir.join("indices.uint"),
            materials: dir.join("materials.uint"),
        };
        std::fs::write(&assets.rays, bytemuck::cast_slice::<f32, u8>(&self.rays)).expect("write rays");
        std::fs::write(&assets.vertices, bytemuck::cast_slice::<f32, u8>(&self.vertices)).expect("write vertices");
        std::fs::write(&assets.indices, bytemuck::cast_slice::<u32, u8>(&self.indices)).expect("write indices");
        std::fs::write(&assets.materials, bytemuck::cast_slice::<u32, u8>(&self.materials)).expect("write materials");

        Settings {
            assets,
            origin: [1.0, 1.0, 5.0],
            export_path: dir.join("file.bin"),
            ..Default::default()
        }
    }
}
