//! Fan-encoded index stream decoding.
//!
//! The index stream is a flat run of 1-based vertex references. Every
//! primitive occupies four slots: three corners, then either a fourth corner
//! (quad) or [`SENTINEL`] (triangle). Both the indexer and the facet
//! extractor walk the stream through [`FanDecoder`] so they always agree on
//! primitive boundaries.

use tracing::warn;

use crate::util::{Error, Result};

/// Reserved index value terminating a fan as a triangle.
pub const SENTINEL: u32 = u32::MAX;

/// A decoded primitive with 0-based vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fan {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Fan {
    /// Corner indices in stream order.
    pub fn corners(&self) -> &[u32] {
        match self {
            Fan::Triangle(c) => c.as_slice(),
            Fan::Quad(c) => c.as_slice(),
        }
    }

    /// The first three corners.
    #[inline]
    pub fn primary(&self) -> [u32; 3] {
        let c = self.corners();
        [c[0], c[1], c[2]]
    }

    /// Triangles covering the primitive: `(v0, v1, v2)` and, for quads,
    /// `(v0, v2, v3)`.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> {
        let second = match *self {
            Fan::Triangle(_) => None,
            Fan::Quad([a, _, c, d]) => Some([a, c, d]),
        };
        std::iter::once(self.primary()).chain(second)
    }

    #[inline]
    pub fn is_quad(&self) -> bool {
        matches!(self, Fan::Quad(_))
    }
}

/// State of the decoder between raw values.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Collecting the first three corners.
    Corners { filled: usize, corners: [u32; 3] },
    /// Three corners read, waiting for the fourth value.
    Closing([u32; 3]),
}

impl State {
    const START: Self = State::Corners { filled: 0, corners: [0; 3] };
}

/// Iterator over the primitives of a raw index stream.
///
/// Yields `Err` once (and then stops) on an index outside `0..vertex_count`
/// or a raw value of zero. A trailing fan without its fourth value is
/// dropped with a warning.
pub struct FanDecoder<'a> {
    stream: &'a [u32],
    pos: usize,
    vertex_count: usize,
    state: State,
}

impl<'a> FanDecoder<'a> {
    pub fn new(stream: &'a [u32], vertex_count: usize) -> Self {
        Self {
            stream,
            pos: 0,
            vertex_count,
            state: State::START,
        }
    }

    /// Convert a raw 1-based value to a checked 0-based index.
    fn decode(&self, raw: u32) -> Result<u32> {
        let index = raw as i64 - 1;
        if index < 0 || index as usize >= self.vertex_count {
            return Err(Error::IndexRange { index, vertex_count: self.vertex_count });
        }
        Ok(index as u32)
    }

    fn fail(&mut self, err: Error) -> Option<Result<Fan>> {
        self.pos = self.stream.len();
        self.state = State::START;
        Some(Err(err))
    }
}

impl Iterator for FanDecoder<'_> {
    type Item = Result<Fan>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&raw) = self.stream.get(self.pos) {
            self.pos += 1;

            match self.state {
                State::Corners { filled, mut corners } => {
                    corners[filled] = match self.decode(raw) {
                        Ok(index) => index,
                        Err(e) => return self.fail(e),
                    };
                    self.state = if filled == 2 {
                        State::Closing(corners)
                    } else {
                        State::Corners { filled: filled + 1, corners }
                    };
                }
                State::Closing([a, b, c]) => {
                    self.state = State::START;
                    if raw == SENTINEL {
                        return Some(Ok(Fan::Triangle([a, b, c])));
                    }
                    return match self.decode(raw) {
                        Ok(d) => Some(Ok(Fan::Quad([a, b, c, d]))),
                        Err(e) => self.fail(e),
                    };
                }
            }
        }

        let pending = match self.state {
            State::Corners { filled, .. } => filled,
            State::Closing(_) => 3,
        };
        if pending > 0 {
            warn!("Index stream ends inside a fan; dropping {} trailing values", pending);
            self.state = State::START;
        }
        None
    }
}

/// Decode a whole stream, stopping at the first invalid index.
pub fn decode_fans(stream: &[u32], vertex_count: usize) -> Result<Vec<Fan>> {
    FanDecoder::new(stream, vertex_count).collect()
}
