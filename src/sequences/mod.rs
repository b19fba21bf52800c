//! Sequence codecs and the on-disk sequence file container.
//!
//! A sequence file is a flat concatenation of encoded monotone sequences
//! followed by a fixed-size footer. Sequences are addressed by the byte
//! offset at which they were appended; the codec is chosen statically.

pub mod ef;
pub mod file;
pub mod plain;

pub use ef::EfSequence;
pub use file::{SequenceFile, SequenceFileBuilder};
pub use plain::PlainSequence;

use crate::base::{NodeId, Result};

/// Footer layout: five codec parameter bytes, then universe, number of
/// sequences, number of elements and construction time as fixed 64 bit
/// little-endian integers.
pub const FOOTER_SIZE: usize = 5 + 4 * 8;

/// Codec tuning bytes persisted in the footer. The current codecs do not
/// consume them, but they are carried so the format stays stable when a
/// parameterized codec is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecParams(pub [u8; 5]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Exclusive upper bound on the encoded values
    pub universe: u64,
    pub params: CodecParams,
}

impl Options {
    pub fn new(universe: u64) -> Self {
        Options {
            universe,
            params: CodecParams::default(),
        }
    }
}

/// Cursor over one encoded sequence.
///
/// Values are monotone. The cursor is exhausted when `position() == size()`;
/// past the end, `docid()` keeps reporting the last value. An empty sequence
/// reports `docid() == 0`, so callers must check `size()` first.
pub trait Enumerator {
    fn size(&self) -> usize;

    fn position(&self) -> usize;

    fn docid(&self) -> NodeId;

    fn next(&mut self);

    /// Advances to the first value greater than or equal to `lower_bound`,
    /// never moving backwards
    fn next_geq(&mut self, lower_bound: NodeId);

    fn move_to(&mut self, position: usize);

    fn reset(&mut self) {
        self.move_to(0);
    }
}

/// A stateless sequence codec
pub trait SequenceCodec {
    type Enumerator<'a>: Enumerator + 'a;

    /// Appends the encoding of `values` to `out`
    fn serialize(out: &mut Vec<u8>, opts: &Options, values: &[NodeId]) -> Result<()>;

    /// Decodes the sequence starting at the beginning of `data`; trailing
    /// bytes belonging to other sequences are ignored
    fn enumerator<'a>(data: &'a [u8], opts: &Options) -> Result<Self::Enumerator<'a>>;
}
