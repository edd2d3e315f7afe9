//! Raw binary asset loading.
//!
//! Assets are headerless arrays of fixed-size elements; the element count is
//! inferred from the file length. Nothing here interprets the values.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytemuck::Pod;
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Read a raw asset into a typed flat array using memory mapping.
pub fn load_typed<T: Pod>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    load_typed_opts(path, true)
}

/// Read a raw asset into a typed flat array, optionally memory-mapped.
///
/// Trailing bytes that do not form a whole element are dropped with a
/// warning. A missing or unreadable file is an [`Error::AssetRead`].
pub fn load_typed_opts<T: Pod>(path: impl AsRef<Path>, use_mmap: bool) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::asset(path, e))?;

    let data = if use_mmap {
        let size = file.metadata().map_err(|e| Error::asset(path, e))?.len();
        if size == 0 {
            // Zero-length mappings are rejected on some platforms
            collect_elements(path, &[])
        } else {
            // Safety: the mapping is read-only and copied out before returning
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::asset(path, e))?;
            collect_elements(path, &mmap)
        }
    } else {
        let mut bytes = Vec::new();
        (&file).read_to_end(&mut bytes).map_err(|e| Error::asset(path, e))?;
        collect_elements(path, &bytes)
    };

    debug!("Loaded {} elements of {} from {}", data.len(), std::any::type_name::<T>(), path.display());
    Ok(data)
}

/// Copy the whole elements of `bytes` out, sized by the bytes actually read.
fn collect_elements<T: Pod>(path: &Path, bytes: &[u8]) -> Vec<T> {
    if bytes.is_empty() {
        warn!("Asset {} is empty", path.display());
        return Vec::new();
    }

    let elem = std::mem::size_of::<T>();
    let whole = bytes.len() - bytes.len() % elem;
    if whole != bytes.len() {
        warn!(
            "Asset {} is {} bytes, not a multiple of {}; dropping {} trailing bytes",
            path.display(),
            bytes.len(),
            elem,
            bytes.len() - whole
        );
    }
    bytemuck::pod_collect_to_vec::<u8, T>(&bytes[..whole])
}
