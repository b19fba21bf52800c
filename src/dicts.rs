//! Sorted string dictionary mapping external node labels to dense ids.
//!
//! Labels are stored one per line in sorted order; the id of a label is
//! its line number.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::base::Result;

/// Smallest byte string strictly greater than every string with this
/// prefix, or `None` when no such bound exists
pub fn successor_of(prefix: &str) -> Option<Vec<u8>> {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(&last) = bytes.last() {
        if last == 0xFF {
            bytes.pop();
        } else {
            *bytes.last_mut().unwrap() = last + 1;
            return Some(bytes);
        }
    }
    None
}

/// Label lookup over a dense id space
pub trait PrefixDictionary {
    /// Half-open id range of the labels starting with `prefix`
    fn prefix_search(&self, prefix: &str) -> Option<(u64, u64)>;

    /// Id of an exact label
    fn rank(&self, key: &str) -> Option<u64>;

    /// Label of id `i`
    fn select(&self, i: u64) -> Option<&str>;
}

/// In-memory sorted array of labels with rank and select access
pub struct StrArray {
    strings: Vec<String>,
}

impl StrArray {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut strings = Vec::new();
        for line in reader.lines() {
            strings.push(line?);
        }
        debug_assert!(strings.windows(2).all(|w| w[0] < w[1]));
        Ok(StrArray { strings })
    }

    /// Writes sorted `keys` to `path` and keeps them in memory
    pub fn build<S: Into<String>>(keys: Vec<S>, path: &Path) -> Result<Self> {
        let mut strings: Vec<String> = keys.into_iter().map(Into::into).collect();
        strings.sort_unstable();
        strings.dedup();

        let mut writer = BufWriter::new(File::create(path)?);
        for key in &strings {
            writer.write_all(key.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(StrArray { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl PrefixDictionary for StrArray {
    fn prefix_search(&self, prefix: &str) -> Option<(u64, u64)> {
        let left = self
            .strings
            .partition_point(|s| s.as_bytes() < prefix.as_bytes());
        if left == self.strings.len() || !self.strings[left].starts_with(prefix) {
            return None;
        }

        let right = match successor_of(prefix) {
            Some(bound) => self
                .strings
                .partition_point(|s| s.as_bytes() < bound.as_slice()),
            None => self.strings.len(),
        };
        Some((left as u64, right as u64))
    }

    fn rank(&self, key: &str) -> Option<u64> {
        self.strings
            .binary_search_by(|s| s.as_str().cmp(key))
            .ok()
            .map(|i| i as u64)
    }

    fn select(&self, i: u64) -> Option<&str> {
        self.strings.get(i as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    fn sample() -> (TempDir, StrArray) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels");
        let array = StrArray::build(
            vec!["ab", "abc", "abd", "b", "ba", "bb", "c"],
            &path,
        )
        .unwrap();
        (dir, array)
    }

    #[test]
    fn test_rank_select() {
        let (_dir, array) = sample();
        assert_eq!(array.len(), 7);
        assert_eq!(array.rank("abc"), Some(1));
        assert_eq!(array.rank("abe"), None);
        assert_eq!(array.select(3), Some("b"));
        assert_eq!(array.select(7), None);
    }

    #[test]
    fn test_prefix_search() {
        let (_dir, array) = sample();
        assert_eq!(array.prefix_search("ab"), Some((0, 3)));
        assert_eq!(array.prefix_search("b"), Some((3, 6)));
        assert_eq!(array.prefix_search("c"), Some((6, 7)));
        assert_eq!(array.prefix_search("d"), None);
        assert_eq!(array.prefix_search("abcd"), None);
    }

    #[test]
    fn test_successor() {
        assert_eq!(successor_of("ab"), Some(b"ac".to_vec()));
        assert_eq!(successor_of("a\u{7F}"), Some(b"a\x80".to_vec()));
        assert_eq!(successor_of(""), None);
    }

    #[test]
    fn test_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels");
        StrArray::build(vec!["x", "y", "z"], &path).unwrap();

        let array = StrArray::open(&path).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.rank("y"), Some(1));
        assert_eq!(array.prefix_search("z"), Some((2, 3)));
    }
}
