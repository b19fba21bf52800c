//! Static range-maximum structure over a bucket of scores.
//!
//! Built once per bucket and frozen into the side file as `[n][v0..vn-1]`
//! (fixed 64 bit little endian); the lookup table is rebuilt when the
//! bucket is mapped back. Ties resolve to the leftmost position, which the
//! ranked cursors rely on.

use std::io::Write;

use crate::base::{Error, Result};
use crate::coding::{decode_fixed64, put_fixed64};

pub struct RmqTree {
    values: Vec<u64>,
    // table[k][i] is the argmax position over [i, i + 2^k - 1]
    table: Vec<Vec<u32>>,
}

impl RmqTree {
    pub fn new(values: Vec<u64>) -> Self {
        let n = values.len();
        let mut table: Vec<Vec<u32>> = vec![(0..n as u32).collect()];

        let mut k = 0usize;
        while (1usize << (k + 1)) <= n {
            let width = 1usize << k;
            let prev = &table[k];
            let size = n - (width << 1) + 1;
            let mut level = Vec::with_capacity(size);
            for i in 0..size {
                level.push(Self::better(&values, prev[i], prev[i + width]));
            }
            table.push(level);
            k += 1;
        }

        RmqTree { values, table }
    }

    fn better(values: &[u64], left: u32, right: u32) -> u32 {
        if values[right as usize] > values[left as usize] {
            right
        } else {
            left
        }
    }

    /// Position of the maximum over the inclusive range `[a, b]`; on ties
    /// the leftmost position wins
    pub fn rmq(&self, a: usize, b: usize) -> usize {
        assert!(
            a <= b && b < self.values.len(),
            "invalid range {}..={} for {} values",
            a,
            b,
            self.values.len()
        );
        let span = b - a + 1;
        let k = (usize::BITS - 1 - span.leading_zeros()) as usize;
        let width = 1usize << k;
        Self::better(&self.values, self.table[k][a], self.table[k][b + 1 - width]) as usize
    }

    pub fn value(&self, position: usize) -> u64 {
        self.values[position]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn freeze(&self, out: &mut dyn Write) -> Result<()> {
        let mut encoded = Vec::with_capacity(8 + self.values.len() * 8);
        put_fixed64(&mut encoded, self.values.len() as u64);
        for &value in &self.values {
            put_fixed64(&mut encoded, value);
        }
        out.write_all(&encoded)?;
        Ok(())
    }

    /// Rebuilds a frozen tree from the start of `data`, returning the tree
    /// and the number of bytes it occupied
    pub fn read_from(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 8 {
            return Err(Error::Codec {
                detail: format!("frozen tree header needs 8 bytes, got {}", data.len()),
            });
        }
        let n = decode_fixed64(data) as usize;
        let end = n
            .checked_mul(8)
            .and_then(|bytes| bytes.checked_add(8))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::Codec {
                detail: format!("frozen tree of {} values exceeds {} bytes", n, data.len()),
            })?;

        let values = (0..n).map(|i| decode_fixed64(&data[8 + i * 8..])).collect();
        Ok((RmqTree::new(values), end))
    }
}
