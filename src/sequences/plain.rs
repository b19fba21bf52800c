//! Uncompressed fixed-width codec, mostly useful as a baseline and for
//! short auxiliary sequences.

use crate::base::{Error, NodeId, Result};
use crate::coding::{decode_fixed64, put_fixed64};

use super::{Enumerator, Options, SequenceCodec};

/// Layout: `[n][v0]..[v(n-1)]`, all fixed 64 bit little endian
pub struct PlainSequence;

impl SequenceCodec for PlainSequence {
    type Enumerator<'a> = PlainEnumerator<'a>;

    fn serialize(out: &mut Vec<u8>, _opts: &Options, values: &[NodeId]) -> Result<()> {
        put_fixed64(out, values.len() as u64);
        for &value in values {
            put_fixed64(out, value);
        }
        Ok(())
    }

    fn enumerator<'a>(data: &'a [u8], _opts: &Options) -> Result<PlainEnumerator<'a>> {
        if data.len() < 8 {
            return Err(Error::Codec {
                detail: format!("plain sequence header needs 8 bytes, got {}", data.len()),
            });
        }
        let n = decode_fixed64(data) as usize;
        let end = n
            .checked_mul(8)
            .and_then(|bytes| bytes.checked_add(8))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::Codec {
                detail: format!("plain sequence of {} values exceeds {} bytes", n, data.len()),
            })?;
        Ok(PlainEnumerator {
            data: &data[8..end],
            n,
            pos: 0,
        })
    }
}

pub struct PlainEnumerator<'a> {
    data: &'a [u8],
    n: usize,
    pos: usize,
}

impl PlainEnumerator<'_> {
    fn value_at(&self, index: usize) -> NodeId {
        decode_fixed64(&self.data[index * 8..])
    }
}

impl Enumerator for PlainEnumerator<'_> {
    fn size(&self) -> usize {
        self.n
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn docid(&self) -> NodeId {
        if self.n == 0 {
            return 0;
        }
        self.value_at(self.pos.min(self.n - 1))
    }

    fn next(&mut self) {
        if self.pos < self.n {
            self.pos += 1;
        }
    }

    fn next_geq(&mut self, lower_bound: NodeId) {
        let mut lo = self.pos;
        let mut hi = self.n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.value_at(mid) < lower_bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        self.pos = lo;
    }

    fn move_to(&mut self, position: usize) {
        self.pos = position.min(self.n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[NodeId]) -> Vec<u8> {
        let mut out = Vec::new();
        PlainSequence::serialize(&mut out, &Options::new(100), values).unwrap();
        out
    }

    #[test]
    fn test_roundtrip() {
        let data = encode(&[3, 7, 11, 42]);
        let mut en = PlainSequence::enumerator(&data, &Options::new(100)).unwrap();

        assert_eq!(en.size(), 4);
        let mut decoded = Vec::new();
        while en.position() < en.size() {
            decoded.push(en.docid());
            en.next();
        }
        assert_eq!(decoded, vec![3, 7, 11, 42]);
        // Saturates past the end
        assert_eq!(en.docid(), 42);
    }

    #[test]
    fn test_next_geq() {
        let data = encode(&[3, 7, 11, 42]);
        let mut en = PlainSequence::enumerator(&data, &Options::new(100)).unwrap();

        en.next_geq(7);
        assert_eq!((en.position(), en.docid()), (1, 7));
        en.next_geq(8);
        assert_eq!((en.position(), en.docid()), (2, 11));
        en.next_geq(100);
        assert_eq!(en.position(), en.size());

        en.reset();
        assert_eq!((en.position(), en.docid()), (0, 3));
        en.move_to(3);
        assert_eq!(en.docid(), 42);
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = encode(&[3, 7, 11]);
        data.truncate(20);
        assert!(PlainSequence::enumerator(&data, &Options::new(100)).is_err());
    }
}
