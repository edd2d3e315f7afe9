//! Error types for the simulation core.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene loading and pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Asset file is missing or unreadable
    #[error("Cannot read asset {path}: {source}")]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stream or buffer length does not match what the consumer expects
    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    /// Decoded vertex index points past the vertex arena
    #[error("Vertex index {index} out of range (vertex count: {vertex_count})")]
    IndexRange { index: i64, vertex_count: usize },

    /// Operation is not valid in the current pipeline state
    #[error("Cannot {op} while pipeline is {state}")]
    PipelineState { op: &'static str, state: &'static str },

    /// Compute backend failure (adapter, device, shader, mapping)
    #[error("Compute backend error: {0}")]
    Backend(String),

    /// Unrecognised driver command
    #[error("Unknown command: {0}")]
    Command(String),

    /// Invalid settings
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a format mismatch error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::FormatMismatch(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Wrap an I/O error raised while reading an asset.
    pub fn asset(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::AssetRead { path: path.into(), source }
    }
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::IndexRange { index: 7, vertex_count: 3 };
        assert!(e.to_string().contains("7"));
        assert!(e.to_string().contains("3"));

        let e = Error::PipelineState { op: "trace", state: "idle" };
        assert_eq!(e.to_string(), "Cannot trace while pipeline is idle");
    }

    #[test]
    fn test_asset_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::asset("assets/geometry/indices.uint", io_err);
        assert!(matches!(err, Error::AssetRead { .. }));
        assert!(err.to_string().contains("indices.uint"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
