//! Score-bucketed side structure of the ranked index.
//!
//! Neighbor scores are accumulated in postings order and cut into buckets
//! of roughly `rmq_bucket_size` scores; each bucket is frozen as one
//! range-maximum tree. Two Elias-Fano arrays locate a node inside the
//! arena: `rmq.doc` maps a node to its tree and `rmq.deg` records the
//! cumulative degree at which each bucket starts. Both arrays may contain
//! duplicates, so they are stored shifted by `prev + 1`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::base::{Error, NodeId, Result};
use crate::rmq::RmqTree;
use crate::utils::buffer::open_buffer;

use super::{read_ef_array, suffixed, write_ef_array};

pub struct RmqSequences {
    docid_to_tree: Vec<u64>,
    bucket_cdf: Vec<u64>,
    trees: Vec<RmqTree>,
}

fn decode_duplicates(mut values: Vec<u64>) -> Vec<u64> {
    let mut prev = 0;
    for value in values.iter_mut() {
        let encoded = *value;
        *value = encoded - prev - 1;
        prev = encoded;
    }
    values
}

fn encode_duplicates(values: &mut [u64]) {
    let mut prev = 0;
    for value in values.iter_mut() {
        *value += prev + 1;
        prev = *value;
    }
}

impl RmqSequences {
    pub fn open(path: &Path, in_memory: bool) -> Result<Self> {
        let docid_to_tree =
            decode_duplicates(read_ef_array(&suffixed(path, "rmq.doc"), in_memory)?);
        let bucket_cdf = decode_duplicates(read_ef_array(&suffixed(path, "rmq.deg"), in_memory)?);

        let trees_path = suffixed(path, ".rmq");
        let buffer = open_buffer(&trees_path, in_memory)?;

        let mut trees = Vec::new();
        let mut at = 0;
        while at < buffer.len() {
            let data = buffer.slice(at, buffer.len())?;
            let (tree, read) = RmqTree::read_from(data).map_err(|e| match e {
                Error::Codec { detail } => Error::corruption(&trees_path, detail),
                other => other,
            })?;
            trees.push(tree);
            at += read;
        }

        debug!(
            "opened rmq buckets {}: trees={} nodes={}",
            trees_path.display(),
            trees.len(),
            docid_to_tree.len()
        );

        Ok(RmqSequences {
            docid_to_tree,
            bucket_cdf,
            trees,
        })
    }

    /// Index of the tree holding the scores of `docid`
    pub fn tree_index(&self, docid: NodeId) -> u64 {
        self.docid_to_tree[docid as usize]
    }

    /// Cumulative degree at which bucket `index` starts
    pub fn bucket_start_cdf(&self, index: u64) -> u64 {
        self.bucket_cdf[index as usize]
    }

    pub fn tree(&self, index: u64) -> &RmqTree {
        &self.trees[index as usize]
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

pub struct RmqSequencesBuilder {
    path: PathBuf,
    bucket_size: usize,
    docid_to_tree: Vec<u64>,
    bucket_cdf: Vec<u64>,
    trees: Vec<RmqTree>,
    scores: Vec<u64>,
}

impl RmqSequencesBuilder {
    pub fn new(path: &Path, bucket_size: usize) -> Self {
        RmqSequencesBuilder {
            path: path.to_path_buf(),
            bucket_size,
            docid_to_tree: Vec::new(),
            // Leading entry so that bucket_cdf[i] is the cumulative degree
            // at the start of bucket i
            bucket_cdf: vec![0],
            trees: Vec::new(),
            scores: Vec::new(),
        }
    }

    /// Appends the neighbor scores of the next node; `cdf_degree` is the
    /// cumulative degree up to and including that node. Nodes must be
    /// appended for every docid, empty lists included.
    pub fn append(&mut self, cdf_degree: u64, scores: &[u64]) {
        self.scores.extend_from_slice(scores);
        self.docid_to_tree.push(self.trees.len() as u64);

        if self.scores.len() >= self.bucket_size {
            self.bucket_cdf.push(cdf_degree);
            self.trees
                .push(RmqTree::new(std::mem::take(&mut self.scores)));
        }
    }

    pub fn commit(mut self) -> Result<RmqSequences> {
        if !self.scores.is_empty() {
            self.trees
                .push(RmqTree::new(std::mem::take(&mut self.scores)));
        }

        let mut encoded = self.docid_to_tree.clone();
        encode_duplicates(&mut encoded);
        write_ef_array(&suffixed(&self.path, "rmq.doc"), &encoded)?;

        let mut encoded = self.bucket_cdf.clone();
        encode_duplicates(&mut encoded);
        write_ef_array(&suffixed(&self.path, "rmq.deg"), &encoded)?;

        let file = File::create(suffixed(&self.path, ".rmq"))?;
        let mut out = BufWriter::new(file);
        for tree in &self.trees {
            tree.freeze(&mut out)?;
        }
        out.flush()?;

        Ok(RmqSequences {
            docid_to_tree: self.docid_to_tree,
            bucket_cdf: self.bucket_cdf,
            trees: self.trees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn test_bucketing_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph");

        let mut builder = RmqSequencesBuilder::new(&path, 4);
        // cdf after each node: 3, 3, 6, 8
        builder.append(3, &[5, 1, 9]);
        builder.append(3, &[]);
        builder.append(6, &[2, 7, 4]);
        builder.append(8, &[8, 3]);
        let built = builder.commit().unwrap();

        // First bucket closes after node 2 (6 scores), the trailing two
        // scores are flushed on commit
        assert_eq!(built.num_trees(), 2);
        assert_eq!(built.tree_index(0), 0);
        assert_eq!(built.tree_index(1), 0);
        assert_eq!(built.tree_index(2), 0);
        assert_eq!(built.tree_index(3), 1);
        assert_eq!(built.bucket_start_cdf(0), 0);
        assert_eq!(built.bucket_start_cdf(1), 6);

        assert_eq!(built.tree(0).len(), 6);
        assert_eq!(built.tree(0).rmq(0, 5), 2);
        assert_eq!(built.tree(1).len(), 2);
        assert_eq!(built.tree(1).rmq(0, 1), 0);

        let reopened = RmqSequences::open(&path, true).unwrap();
        assert_eq!(reopened.num_trees(), 2);
        assert_eq!(reopened.tree_index(3), 1);
        assert_eq!(reopened.bucket_start_cdf(1), 6);
        assert_eq!(reopened.tree(0).rmq(3, 5), 4);
    }
}
