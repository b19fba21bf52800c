//! Elias-Fano codec for the postings and the auxiliary index arrays

use sucds::{EliasFano, EliasFanoBuilder, Searial};

use crate::base::{Error, NodeId, Result};

use super::{Enumerator, Options, SequenceCodec};

fn codec_error(e: impl ToString) -> Error {
    Error::Codec {
        detail: e.to_string(),
    }
}

/// Quasi-succinct encoding of a non-decreasing sequence. The serialized
/// blob is self describing, so no length prefix is needed.
pub struct EfSequence;

impl SequenceCodec for EfSequence {
    type Enumerator<'a> = EfEnumerator;

    fn serialize(out: &mut Vec<u8>, opts: &Options, values: &[NodeId]) -> Result<()> {
        if values.is_empty() {
            return Err(Error::Codec {
                detail: "cannot encode an empty sequence".to_string(),
            });
        }
        let mut builder =
            EliasFanoBuilder::new(opts.universe as usize, values.len()).map_err(codec_error)?;
        for &value in values {
            builder.push(value as usize).map_err(codec_error)?;
        }
        builder
            .build()
            .serialize_into(&mut *out)
            .map_err(codec_error)?;
        Ok(())
    }

    fn enumerator<'a>(data: &'a [u8], _opts: &Options) -> Result<EfEnumerator> {
        let ef = EliasFano::deserialize_from(data).map_err(codec_error)?;
        let values: Vec<NodeId> = ef.iter(0).map(|x| x as NodeId).collect();
        Ok(EfEnumerator { values, pos: 0 })
    }
}

/// Cursor over a decoded Elias-Fano sequence
pub struct EfEnumerator {
    values: Vec<NodeId>,
    pos: usize,
}

impl Enumerator for EfEnumerator {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn docid(&self) -> NodeId {
        if self.values.is_empty() {
            return 0;
        }
        self.values[self.pos.min(self.values.len() - 1)]
    }

    fn next(&mut self) {
        if self.pos < self.values.len() {
            self.pos += 1;
        }
    }

    fn next_geq(&mut self, lower_bound: NodeId) {
        let skipped = self.values[self.pos..].partition_point(|&v| v < lower_bound);
        self.pos += skipped;
    }

    fn move_to(&mut self, position: usize) {
        self.pos = position.min(self.values.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let values: Vec<NodeId> = vec![0, 3, 3, 9, 21, 22, 95];
        let mut out = Vec::new();
        EfSequence::serialize(&mut out, &Options::new(96), &values).unwrap();

        let mut en = EfSequence::enumerator(&out, &Options::new(96)).unwrap();
        assert_eq!(en.size(), values.len());
        let mut decoded = Vec::new();
        while en.position() < en.size() {
            decoded.push(en.docid());
            en.next();
        }
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_next_geq_over_duplicates() {
        let values: Vec<NodeId> = vec![2, 5, 5, 5, 8];
        let mut out = Vec::new();
        EfSequence::serialize(&mut out, &Options::new(9), &values).unwrap();

        let mut en = EfSequence::enumerator(&out, &Options::new(9)).unwrap();
        en.next_geq(5);
        assert_eq!((en.position(), en.docid()), (1, 5));
        en.next_geq(6);
        assert_eq!((en.position(), en.docid()), (4, 8));
        en.next_geq(9);
        assert_eq!(en.position(), en.size());
    }

    #[test]
    fn test_empty_rejected() {
        let mut out = Vec::new();
        assert!(EfSequence::serialize(&mut out, &Options::new(10), &[]).is_err());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut out = Vec::new();
        EfSequence::serialize(&mut out, &Options::new(50), &[1, 4, 40]).unwrap();
        out.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let en = EfSequence::enumerator(&out, &Options::new(50)).unwrap();
        assert_eq!(en.size(), 3);
    }
}
