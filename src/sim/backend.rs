//! Compute backend capability.
//!
//! The simulation core never runs intersection math itself. It talks to a
//! [`ComputeBackend`] that owns the device buffers and the two kernels and
//! only knows them by binding slot and [`Kernel`] name.

use std::fmt;

use super::layout::TraceUniforms;
use crate::util::Result;

/// Stable binding slots shared by both kernels (bind group 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `TraceUniforms`, uniform buffer
    Uniforms,
    /// `array<Ray>`, read-write storage
    Rays,
    /// `array<Facet>`, read-only storage
    Facets,
}

impl Slot {
    #[inline]
    pub const fn binding(self) -> u32 {
        match self {
            Slot::Uniforms => 0,
            Slot::Rays => 1,
            Slot::Facets => 2,
        }
    }
}

/// The two named kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Populates direction/start/end of every ray from the origin uniform.
    Init,
    /// Intersects every ray with the facets, writing hit ids and bounces.
    Trace,
}

impl Kernel {
    pub const ALL: [Kernel; 2] = [Kernel::Init, Kernel::Trace];

    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Init => "init",
            Kernel::Trace => "trace",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// External compute collaborator.
///
/// Contract:
/// - buffer lengths are fixed by `create_buffer`; `write_buffer` with a
///   different length is an error;
/// - `dispatch` runs one parallel pass of `invocations` threads and does
///   not return before the pass has completed on the device;
/// - `wait_idle` is the completion barrier used before every host
///   read or write of a buffer.
pub trait ComputeBackend {
    /// Allocate the buffer bound at `slot` and fill it with `contents`.
    fn create_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()>;

    /// Overwrite the whole buffer bound at `slot`.
    fn write_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()>;

    /// Blocking copy of the buffer bound at `slot` to host memory.
    fn read_buffer(&mut self, slot: Slot) -> Result<Vec<u8>>;

    /// Run `kernel` once over `invocations` rays with the given uniforms.
    fn dispatch(&mut self, kernel: Kernel, uniforms: &TraceUniforms, invocations: u32) -> Result<()>;

    /// Block until no work is in flight.
    fn wait_idle(&mut self) -> Result<()>;
}

impl<T: ComputeBackend + ?Sized> ComputeBackend for Box<T> {
    fn create_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        (**self).create_buffer(slot, contents)
    }

    fn write_buffer(&mut self, slot: Slot, contents: &[u8]) -> Result<()> {
        (**self).write_buffer(slot, contents)
    }

    fn read_buffer(&mut self, slot: Slot) -> Result<Vec<u8>> {
        (**self).read_buffer(slot)
    }

    fn dispatch(&mut self, kernel: Kernel, uniforms: &TraceUniforms, invocations: u32) -> Result<()> {
        (**self).dispatch(kernel, uniforms, invocations)
    }

    fn wait_idle(&mut self) -> Result<()> {
        (**self).wait_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_are_stable() {
        assert_eq!(Slot::Uniforms.binding(), 0);
        assert_eq!(Slot::Rays.binding(), 1);
        assert_eq!(Slot::Facets.binding(), 2);
    }

    #[test]
    fn test_kernel_names() {
        let names: Vec<_> = Kernel::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["init", "trace"]);
    }
}
