//! Host-side rays.

use glam::Vec3;
use tracing::warn;

/// A simulation ray.
///
/// Only `origin` is set on the host. Every other field is written by the
/// "init" and "trace" kernels and read back after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub start: Vec3,
    pub end: Vec3,
    pub first_hit_id: u32,
    pub last_hit_id: u32,
    pub bounce_count: u32,
    /// Ray escaped the scene.
    pub hit_sky: bool,
    /// Ray terminated on a diffuse surface.
    pub hit_diffuse: bool,
}

impl Ray {
    /// Fresh ray with only the origin set.
    pub fn from_origin(origin: Vec3) -> Self {
        Self { origin, ..Default::default() }
    }
}

/// Build one ray per consecutive `[x, y, z]` group of the point stream.
pub fn build_rays(points: &[f32]) -> Vec<Ray> {
    let chunks = points.chunks_exact(3);
    if !chunks.remainder().is_empty() {
        warn!(
            "Ray stream length {} is not a multiple of 3; dropping {} floats",
            points.len(),
            chunks.remainder().len()
        );
    }

    chunks
        .map(|p| Ray::from_origin(Vec3::new(p[0], p[1], p[2])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rays() {
        let rays = build_rays(&[1.0, 2.0, 3.0, -4.0, 5.5, 6.0, 9.0]);

        assert_eq!(rays.len(), 2);
        assert_eq!(rays[0].origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rays[1].origin, Vec3::new(-4.0, 5.5, 6.0));
        assert_eq!(rays[1], Ray::from_origin(rays[1].origin));
        assert_eq!(rays[0].direction, Vec3::ZERO);
        assert!(!rays[0].hit_sky && !rays[0].hit_diffuse);
    }

    #[test]
    fn test_empty_stream() {
        assert!(build_rays(&[]).is_empty());
    }
}
