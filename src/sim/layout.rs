//! GPU-side struct layouts.
//!
//! std430 layouts matching the kernel structs. Every `vec3<f32>` starts on a
//! 16-byte boundary and a following scalar packs into its last 4 bytes;
//! booleans are 32-bit (0/1).
//!
//! ```wgsl
//! struct Params { origin: vec3<f32>, size: u32 }          // binding 0
//! struct Ray {                                             // binding 1
//!     origin: vec3<f32>, direction: vec3<f32>,
//!     start: vec3<f32>, end: vec3<f32>,
//!     first_hit_id: u32, last_hit_id: u32, bounce: u32,
//!     hit_sky: u32, hit_diffuse: u32,
//! }
//! struct Facet {                                           // binding 2
//!     p1: vec3<f32>, p2: vec3<f32>, p3: vec3<f32>, p4: vec3<f32>,
//!     normal: vec3<f32>, id: u32, specular: u32,
//! }
//! ```

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::geom::{Facet, Ray};

/// Uniform block shared by both kernels (16 bytes).
///
/// "init" reads `origin` only; "trace" also reads `size`, the facet count.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TraceUniforms {
    pub origin: [f32; 3],
    pub size: u32,
}

impl TraceUniforms {
    pub fn new(origin: Vec3, facet_count: u32) -> Self {
        Self { origin: origin.to_array(), size: facet_count }
    }
}

/// Ray as stored in the ray buffer (80 bytes).
///
/// `first_hit_id` packs into the tail of `end`, as std430 does.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuRay {
    pub origin: [f32; 3],
    pub _pad0: u32,
    pub direction: [f32; 3],
    pub _pad1: u32,
    pub start: [f32; 3],
    pub _pad2: u32,
    pub end: [f32; 3],
    pub first_hit_id: u32,
    pub last_hit_id: u32,
    pub bounce: u32,
    pub hit_sky: u32,
    pub hit_diffuse: u32,
}

impl From<&Ray> for GpuRay {
    fn from(r: &Ray) -> Self {
        Self {
            origin: r.origin.to_array(),
            direction: r.direction.to_array(),
            start: r.start.to_array(),
            end: r.end.to_array(),
            first_hit_id: r.first_hit_id,
            last_hit_id: r.last_hit_id,
            bounce: r.bounce_count,
            hit_sky: r.hit_sky as u32,
            hit_diffuse: r.hit_diffuse as u32,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        }
    }
}

impl From<&GpuRay> for Ray {
    fn from(g: &GpuRay) -> Self {
        Self {
            origin: Vec3::from_array(g.origin),
            direction: Vec3::from_array(g.direction),
            start: Vec3::from_array(g.start),
            end: Vec3::from_array(g.end),
            first_hit_id: g.first_hit_id,
            last_hit_id: g.last_hit_id,
            bounce_count: g.bounce,
            hit_sky: g.hit_sky != 0,
            hit_diffuse: g.hit_diffuse != 0,
        }
    }
}

/// Facet as stored in the facet buffer (96 bytes).
///
/// `id` packs into the tail of `normal`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuFacet {
    pub p1: [f32; 3],
    pub _pad0: u32,
    pub p2: [f32; 3],
    pub _pad1: u32,
    pub p3: [f32; 3],
    pub _pad2: u32,
    pub p4: [f32; 3],
    pub _pad3: u32,
    pub normal: [f32; 3],
    pub id: u32,
    pub specular: u32,
    pub _pad4: [u32; 3],
}

impl From<&Facet> for GpuFacet {
    fn from(f: &Facet) -> Self {
        Self {
            p1: f.p1.to_array(),
            p2: f.p2.to_array(),
            p3: f.p3.to_array(),
            p4: f.p4.to_array(),
            normal: f.normal.to_array(),
            id: f.id,
            specular: f.specular,
            ..Zeroable::zeroed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_sizes_are_16_byte_multiples() {
        assert_eq!(size_of::<TraceUniforms>(), 16);
        assert_eq!(size_of::<GpuRay>(), 80);
        assert_eq!(size_of::<GpuFacet>(), 96);
        assert_eq!(align_of::<GpuRay>(), 4);
    }

    #[test]
    fn test_ray_field_offsets() {
        let ray = GpuRay { first_hit_id: 0xAABB, hit_diffuse: 1, ..Zeroable::zeroed() };
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&ray));
        assert_eq!(words[15], 0xAABB);
        assert_eq!(words[19], 1);
    }

    #[test]
    fn test_facet_id_follows_normal() {
        let facet = Facet {
            id: 9,
            p1: Vec3::X,
            p2: Vec3::Y,
            p3: Vec3::Z,
            p4: crate::geom::P4_SENTINEL,
            normal: Vec3::ONE,
            specular: 3,
        };
        let gpu = GpuFacet::from(&facet);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
        assert_eq!(f32::from_bits(words[12]), -1.0);
        assert_eq!(words[19], 9);
        assert_eq!(words[20], 3);
    }

    #[test]
    fn test_ray_conversion_keeps_flags() {
        let ray = Ray {
            origin: Vec3::new(1.0, 2.0, 3.0),
            bounce_count: 4,
            hit_sky: true,
            ..Default::default()
        };
        let back = Ray::from(&GpuRay::from(&ray));
        assert_eq!(back, ray);
    }
}
