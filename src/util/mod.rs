//! Shared utility types.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
