//! Result file export.
//!
//! One record per ray, in ray order, no header or footer:
//!
//! | Offset | Type | Field |
//! |--------|------|-------|
//! | 0 | i32 LE | first_hit_id |
//! | 4 | i32 LE | last_hit_id |
//! | 8 | i32 LE | bounce_count |

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::info;

use crate::geom::Ray;
use crate::util::{Error, Result};

/// Size of one record in bytes.
pub const RECORD_SIZE: usize = 12;

/// One exported ray result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitRecord {
    pub first_hit_id: i32,
    pub last_hit_id: i32,
    pub bounce_count: i32,
}

impl From<&Ray> for HitRecord {
    fn from(r: &Ray) -> Self {
        // ids are reinterpreted, so a u32::MAX "no hit" marker reads back as -1
        Self {
            first_hit_id: r.first_hit_id as i32,
            last_hit_id: r.last_hit_id as i32,
            bounce_count: r.bounce_count as i32,
        }
    }
}

/// Write `rays` to `path`, truncating any existing file.
pub fn write_results(path: impl AsRef<Path>, rays: &[Ray]) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);
    write_results_to(&mut writer, rays)?;
    writer.flush()?;

    info!("Exported {} ray results to {}", rays.len(), path.display());
    Ok(())
}

/// Serialize `rays` into any writer.
pub fn write_results_to<W: Write>(writer: &mut W, rays: &[Ray]) -> Result<()> {
    for ray in rays {
        let rec = HitRecord::from(ray);
        writer.write_i32::<LittleEndian>(rec.first_hit_id)?;
        writer.write_i32::<LittleEndian>(rec.last_hit_id)?;
        writer.write_i32::<LittleEndian>(rec.bounce_count)?;
    }
    Ok(())
}

/// Read a result file back.
pub fn read_results(path: impl AsRef<Path>) -> Result<Vec<HitRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::asset(path, e))?;
    let len = file.metadata()?.len() as usize;
    if len % RECORD_SIZE != 0 {
        return Err(Error::format(format!(
            "{}: {} bytes is not a whole number of {}-byte records",
            path.display(),
            len,
            RECORD_SIZE
        )));
    }
    read_results_from(BufReader::new(file), len / RECORD_SIZE)
}

/// Read `count` records from any reader.
pub fn read_results_from<R: Read>(mut reader: R, count: usize) -> Result<Vec<HitRecord>> {
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(HitRecord {
            first_hit_id: reader.read_i32::<LittleEndian>()?,
            last_hit_id: reader.read_i32::<LittleEndian>()?,
            bounce_count: reader.read_i32::<LittleEndian>()?,
        });
    }
    Ok(records)
}

/// Aggregate view of a traced ray set.
///
/// Sky and diffuse counts are only known from full rays, not from an
/// exported file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultSummary {
    pub rays: usize,
    pub hit_sky: Option<usize>,
    pub hit_diffuse: Option<usize>,
    pub bounced: usize,
    pub max_bounce: u32,
    pub mean_bounce: f64,
}

impl ResultSummary {
    pub fn from_rays(rays: &[Ray]) -> Self {
        let mut summary = Self::from_bounces(rays.iter().map(|r| r.bounce_count));
        summary.hit_sky = Some(rays.iter().filter(|r| r.hit_sky).count());
        summary.hit_diffuse = Some(rays.iter().filter(|r| r.hit_diffuse).count());
        summary
    }

    pub fn from_records(records: &[HitRecord]) -> Self {
        Self::from_bounces(records.iter().map(|r| r.bounce_count.max(0) as u32))
    }

    fn from_bounces(bounces: impl Iterator<Item = u32>) -> Self {
        let mut summary = Self::default();
        let mut total = 0u64;
        for b in bounces {
            summary.rays += 1;
            total += u64::from(b);
            if b > 0 {
                summary.bounced += 1;
            }
            summary.max_bounce = summary.max_bounce.max(b);
        }
        if summary.rays > 0 {
            summary.mean_bounce = total as f64 / summary.rays as f64;
        }
        summary
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rays, {} bounced (max {}, mean {:.2})",
            self.rays, self.bounced, self.max_bounce, self.mean_bounce
        )?;
        if let Some(sky) = self.hit_sky {
            write!(f, ", {sky} hit sky")?;
        }
        if let Some(diffuse) = self.hit_diffuse {
            write!(f, ", {diffuse} ended diffuse")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ray(first: u32, last: u32, bounce: u32) -> Ray {
        Ray {
            first_hit_id: first,
            last_hit_id: last,
            bounce_count: bounce,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_layout() {
        let mut buf = Vec::new();
        write_results_to(&mut buf, &[ray(1, 2, 3)]).unwrap();
        assert_eq!(buf, [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]);
    }

    #[test]
    fn test_no_hit_reads_back_negative() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.bin");
        write_results(&path, &[ray(u32::MAX, 4, 0)]).unwrap();

        let records = read_results(&path).unwrap();
        assert_eq!(records, [HitRecord { first_hit_id: -1, last_hit_id: 4, bounce_count: 0 }]);
    }

    #[test]
    fn test_partial_record_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [0u8; 13]).unwrap();
        assert!(matches!(read_results(&path), Err(Error::FormatMismatch(_))));
    }

    #[test]
    fn test_summary() {
        let mut rays = vec![ray(0, 0, 0), ray(1, 2, 2), ray(3, 3, 1)];
        rays[0].hit_sky = true;
        rays[2].hit_diffuse = true;

        let s = ResultSummary::from_rays(&rays);
        assert_eq!(s.rays, 3);
        assert_eq!(s.bounced, 2);
        assert_eq!(s.max_bounce, 2);
        assert!((s.mean_bounce - 1.0).abs() < 1e-9);
        assert_eq!(s.hit_sky, Some(1));
        assert_eq!(s.hit_diffuse, Some(1));

        let records: Vec<HitRecord> = rays.iter().map(HitRecord::from).collect();
        let r = ResultSummary::from_records(&records);
        assert_eq!(r.bounced, 2);
        assert_eq!(r.hit_sky, None);
    }
}
