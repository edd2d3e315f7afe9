//! Scene geometry decoding.
//!
//! - [`vertex`] - Vertex arena parsing
//! - [`fan`] - Fan-encoded index stream state machine
//! - [`indexer`] - Corrected index list and per-vertex normals
//! - [`facet`] - Facet extraction for the trace kernel
//! - [`ray`] - Initial ray array

pub mod fan;
pub mod facet;
pub mod indexer;
pub mod ray;
pub mod vertex;

pub use fan::{decode_fans, Fan, FanDecoder, SENTINEL};
pub use facet::{extract_facets, Facet, P4_SENTINEL};
pub use indexer::{facet_normal, index, IndexedGeometry};
pub use ray::{build_rays, Ray};
pub use vertex::{parse_vertices, Vertex, COLD_COLOR, HOT_COLOR, HOT_THRESHOLD};
