//! Fixed-width little-endian integer coding used by the sequence files

use byteorder::{ByteOrder, LittleEndian};

pub fn put_fixed64(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Reads a `u64` from the first 8 bytes of `data`
pub fn decode_fixed64(data: &[u8]) -> u64 {
    LittleEndian::read_u64(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed64_roundtrip() {
        let mut out = Vec::new();
        put_fixed64(&mut out, 0);
        put_fixed64(&mut out, 0x0123_4567_89ab_cdef);
        put_fixed64(&mut out, u64::MAX);

        assert_eq!(out.len(), 24);
        assert_eq!(decode_fixed64(&out[0..]), 0);
        assert_eq!(decode_fixed64(&out[8..]), 0x0123_4567_89ab_cdef);
        assert_eq!(decode_fixed64(&out[16..]), u64::MAX);
    }
}
