//! Graph indexes over a postings sequence file.
//!
//! An index is three files sharing a base path: `.pos` holds the encoded
//! adjacency lists, `.off` the byte offset of each list and `.deg` the
//! cumulative degree array. The ranked variant adds `.rnk` plus the
//! bucketed range-maximum side structure (`rmq.doc`, `rmq.deg`, `.rmq`).
//!
//! Cumulative degrees are persisted inflated by `i + 1` so that the array
//! stays strictly increasing and Elias-Fano encodable; the in-memory
//! directory always carries the true values.

pub mod neighbors;
pub mod rmq_buckets;
pub mod simple;
pub mod topk;

pub use neighbors::{neighbors, neighbors_at, FriendsAtK};
pub use rmq_buckets::{RmqSequences, RmqSequencesBuilder};
pub use simple::{SimpleIndex, SimpleIndexBuilder};
pub use topk::{RankedIndex, RmqCursor, TopkIndex, TopkIndexBuilder};

use std::path::{Path, PathBuf};

use crate::base::{Error, NodeId, Result};
use crate::sequences::{
    EfSequence, Enumerator, Options, SequenceFile, SequenceFileBuilder,
};

/// Per-node directory entry: where the adjacency list starts, the
/// cumulative degree up to and including this node, and the node's rank
/// when the index is ranked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub docid: NodeId,
    pub offset: u64,
    pub cdf_degree: u64,
    pub score: u64,
}

/// Read interface shared by the plain and the ranked index
pub trait GraphIndex {
    type Enumerator<'a>: Enumerator + 'a
    where
        Self: 'a;

    /// Offset of the adjacency list of `docid`, or `None` when the node
    /// has no outgoing edges
    fn get_offset(&self, docid: NodeId) -> Option<u64>;

    fn degree(&self, docid: NodeId) -> u64;

    /// Cursor over the adjacency list written at `offset`
    fn sequence_at(&self, offset: u64) -> Result<Self::Enumerator<'_>>;

    fn num_docs(&self) -> u64;

    fn num_elements(&self) -> u64;

    fn opts(&self) -> &Options;
}

/// `<path><suffix>`, e.g. `graph` and `.pos` become `graph.pos`
pub(crate) fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Reads a whole single-sequence Elias-Fano side file into memory
pub(crate) fn read_ef_array(path: &Path, in_memory: bool) -> Result<Vec<u64>> {
    let file = SequenceFile::<EfSequence>::open(path, in_memory)?;
    if file.num_sequences() == 0 {
        return Ok(Vec::new());
    }

    let mut en = file.sequence_at(0)?;
    let mut values = Vec::with_capacity(en.size());
    while en.position() < en.size() {
        values.push(en.docid());
        en.next();
    }
    Ok(values)
}

pub(crate) fn write_ef_array(path: &Path, values: &[u64]) -> Result<()> {
    let universe = values.last().map_or(0, |last| last + 1);
    let mut builder = SequenceFileBuilder::<EfSequence>::create(path, Options::new(universe))?;
    if !values.is_empty() {
        builder.append(values)?;
    }
    builder.commit()
}

/// Decodes the `.off` and `.deg` files into the in-memory directory
pub(crate) fn read_directory(path: &Path, in_memory: bool) -> Result<Vec<NodeInfo>> {
    let offsets = read_ef_array(&suffixed(path, ".off"), in_memory)?;
    let degrees = read_ef_array(&suffixed(path, ".deg"), in_memory)?;

    if offsets.len() != degrees.len() {
        return Err(Error::corruption(
            suffixed(path, ".deg"),
            format!(
                "{} degrees but {} offsets",
                degrees.len(),
                offsets.len()
            ),
        ));
    }

    Ok(offsets
        .into_iter()
        .zip(degrees)
        .enumerate()
        .map(|(i, (offset, stored_cdf))| NodeInfo {
            docid: i as NodeId,
            offset,
            cdf_degree: stored_cdf - 1 - i as u64,
            score: 0,
        })
        .collect())
}

/// Degree of `docid`, zero past the end of the directory
pub(crate) fn degree_of(docs: &[NodeInfo], docid: NodeId) -> u64 {
    let i = docid as usize;
    if i >= docs.len() {
        0
    } else if i == 0 {
        docs[0].cdf_degree
    } else {
        docs[i].cdf_degree - docs[i - 1].cdf_degree
    }
}

/// Builder-side directory bookkeeping shared by both index variants.
/// Nodes must be appended in increasing order; skipped nodes inherit the
/// previous offset and a degree of zero.
pub(crate) struct DirectoryArrays {
    pub offsets: Vec<u64>,
    pub cdf_degrees: Vec<u64>,
    last_docid: u64,
    last_offset: u64,
    cdf_degree: u64,
}

impl DirectoryArrays {
    pub fn new() -> Self {
        DirectoryArrays {
            offsets: Vec::new(),
            cdf_degrees: Vec::new(),
            last_docid: 0,
            last_offset: 0,
            cdf_degree: 0,
        }
    }

    /// Registers the list of `docid`, written at `offset` with
    /// `num_elements` entries
    pub fn append(&mut self, docid: NodeId, offset: u64, num_elements: u64) {
        debug_assert!(offset > self.last_offset || offset == 0);
        assert!(
            docid >= self.last_docid,
            "node {} appended after node {}",
            docid,
            self.last_docid
        );

        while self.last_docid < docid {
            self.last_docid += 1;
            self.cdf_degree += 1;
            self.offsets.push(self.last_offset);
            self.cdf_degrees.push(self.cdf_degree);
        }

        self.last_docid = docid + 1;
        self.last_offset = offset;
        self.cdf_degree += num_elements + 1;
        self.offsets.push(offset);
        self.cdf_degrees.push(self.cdf_degree);
    }

    /// Extends the arrays with empty nodes up to `universe`
    pub fn pad_to(&mut self, universe: u64) {
        while self.last_docid < universe {
            self.last_docid += 1;
            self.cdf_degree += 1;
            self.offsets.push(self.last_offset);
            self.cdf_degrees.push(self.cdf_degree);
        }
    }

    /// True cumulative degree of node `i`, undoing the inflation
    pub fn true_cdf(&self, i: usize) -> u64 {
        self.cdf_degrees[i] - 1 - i as u64
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_ef_array(&suffixed(path, ".off"), &self.offsets)?;
        write_ef_array(&suffixed(path, ".deg"), &self.cdf_degrees)
    }
}
