//! The ranked graph index and its score-ordered cursor.
//!
//! On top of the plain directory, the ranked index persists the global
//! ranking (`.rnk`, stored cumulatively) and the bucketed range-maximum
//! side structure. [`RmqCursor`] walks an adjacency list restricted to a
//! position range and yields neighbors by descending rank without
//! decoding the whole range.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::base::{Error, NodeId, Result};
use crate::config::Configuration;
use crate::containers::{pop_heap, push_heap, Compare};
use crate::rmq::RmqTree;
use crate::sequences::{Enumerator, Options, SequenceCodec, SequenceFile, SequenceFileBuilder};

use super::rmq_buckets::{RmqSequences, RmqSequencesBuilder};
use super::{degree_of, read_directory, read_ef_array, suffixed, write_ef_array};
use super::{DirectoryArrays, GraphIndex, NodeInfo};

/// A [`GraphIndex`] whose nodes carry a global rank, with a cursor that
/// enumerates a list range by descending rank
pub trait RankedIndex: GraphIndex {
    fn rank(&self, docid: NodeId) -> u64;

    /// Wraps `en`, the enumerator of the adjacency list of `docid`, into
    /// a rank-ordered cursor
    fn rmq_cursor<'a>(
        &'a self,
        docid: NodeId,
        en: Self::Enumerator<'a>,
    ) -> RmqCursor<'a, Self::Enumerator<'a>>;
}

pub struct TopkIndex<S: SequenceCodec> {
    docs: Vec<NodeInfo>,
    postings: SequenceFile<S>,
    rmq: RmqSequences,
    scan_threshold: u64,
}

impl<S: SequenceCodec> TopkIndex<S> {
    pub fn open(path: &Path, in_memory: bool, config: &Configuration) -> Result<Self> {
        let postings = SequenceFile::<S>::open(&suffixed(path, ".pos"), in_memory)?;
        let mut docs = read_directory(path, in_memory)?;

        let rnk_path = suffixed(path, ".rnk");
        let stored_ranks = read_ef_array(&rnk_path, in_memory)?;
        if stored_ranks.len() != docs.len() {
            return Err(Error::corruption(
                &rnk_path,
                format!("{} ranks for {} nodes", stored_ranks.len(), docs.len()),
            ));
        }

        let mut prev = 0;
        for (info, &stored) in docs.iter_mut().zip(&stored_ranks) {
            info.score = stored - prev;
            prev = stored + 1;
        }

        let rmq = RmqSequences::open(path, in_memory)?;

        info!(
            "opened ranked index {}: docs={} elements={} trees={}",
            path.display(),
            docs.len(),
            postings.num_elements(),
            rmq.num_trees()
        );

        Ok(TopkIndex {
            docs,
            postings,
            rmq,
            scan_threshold: config.topk_scan_threshold,
        })
    }

    pub fn docs(&self) -> &[NodeInfo] {
        &self.docs
    }

    pub fn construction_time_microsec(&self) -> u64 {
        self.postings.construction_time_microsec()
    }
}

impl<S: SequenceCodec> GraphIndex for TopkIndex<S> {
    type Enumerator<'a> = S::Enumerator<'a>
    where
        Self: 'a;

    fn get_offset(&self, docid: NodeId) -> Option<u64> {
        let info = self.docs.get(docid as usize)?;
        if self.degree(docid) > 0 {
            Some(info.offset)
        } else {
            None
        }
    }

    fn degree(&self, docid: NodeId) -> u64 {
        degree_of(&self.docs, docid)
    }

    fn sequence_at(&self, offset: u64) -> Result<Self::Enumerator<'_>> {
        self.postings.sequence_at(offset)
    }

    fn num_docs(&self) -> u64 {
        self.docs.len() as u64
    }

    fn num_elements(&self) -> u64 {
        self.postings.num_elements()
    }

    fn opts(&self) -> &Options {
        self.postings.opts()
    }
}

impl<S: SequenceCodec> RankedIndex for TopkIndex<S> {
    fn rank(&self, docid: NodeId) -> u64 {
        self.docs[docid as usize].score
    }

    fn rmq_cursor<'a>(
        &'a self,
        docid: NodeId,
        en: Self::Enumerator<'a>,
    ) -> RmqCursor<'a, Self::Enumerator<'a>> {
        let tree_index = self.rmq.tree_index(docid);
        let cdf = if docid == 0 {
            0
        } else {
            self.docs[docid as usize - 1].cdf_degree
        };

        RmqCursor {
            docid,
            en,
            threshold: self.scan_threshold,
            tree: self.rmq.tree(tree_index),
            docs: &self.docs,
            start_offset: cdf - self.rmq.bucket_start_cdf(tree_index),
            q: Vec::new(),
            cur: RankedEntry::default(),
            sorted: false,
        }
    }
}

/// One entry yielded by a [`RmqCursor`]: the neighbor, its rank and its
/// position in the adjacency list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RankedEntry {
    pub docid: NodeId,
    pub score: u64,
    pub pos: u64,
}

// docid, score, position, and the subrange the entry is the maximum of
type QueueElement = (NodeId, u64, u64, u64, u64);

struct ScorePosOrder;

impl Compare<QueueElement> for ScorePosOrder {
    fn less(&self, a: &QueueElement, b: &QueueElement) -> bool {
        a.1 < b.1 || (a.1 == b.1 && a.2 > b.2)
    }
}

/// Rank-descending traversal of a position range of one adjacency list.
///
/// Short ranges are decoded outright; longer ones are split top-down
/// through the bucket's range-maximum tree, so only the entries actually
/// consumed are decoded.
pub struct RmqCursor<'a, E: Enumerator> {
    docid: NodeId,
    en: E,
    threshold: u64,
    tree: &'a RmqTree,
    docs: &'a [NodeInfo],
    start_offset: u64,
    q: Vec<QueueElement>,
    cur: RankedEntry,
    sorted: bool,
}

impl<'a, E: Enumerator> RmqCursor<'a, E> {
    /// Starts the traversal over positions `[a, b]` of the list
    pub fn rmq(&mut self, a: u64, b: u64) {
        self.q.clear();
        self.sorted = false;

        if b - a + 1 <= self.threshold {
            self.extract_all_in(a, b);
        } else {
            self.push_range_top(a, b);
        }
    }

    /// Advances to the next entry by descending score; the entry is then
    /// available through [`value`](Self::value)
    pub fn next(&mut self) -> bool {
        let element = if self.sorted {
            self.q.pop()
        } else {
            pop_heap(&mut self.q, &ScorePosOrder)
        };

        let Some((docid, score, pos, a, b)) = element else {
            return false;
        };
        self.cur = RankedEntry { docid, score, pos };

        if self.sorted {
            return true;
        }

        if pos != a {
            self.push_range_top(a, pos - 1);
        }
        if pos != b {
            self.push_range_top(pos + 1, b);
        }
        true
    }

    fn push_range_top(&mut self, a: u64, b: u64) {
        let pos = self.tree.rmq(
            (self.start_offset + a) as usize,
            (self.start_offset + b) as usize,
        ) as u64
            - self.start_offset;

        self.en.move_to(pos as usize);
        let docid = self.en.docid();
        let score = self.docs[docid as usize].score;

        push_heap(&mut self.q, (docid, score, pos, a, b), &ScorePosOrder);
    }

    fn extract_all_in(&mut self, a: u64, b: u64) {
        self.en.move_to(a as usize);

        for pos in a..=b {
            let docid = self.en.docid();
            let score = self.docs[docid as usize].score;
            self.q.push((docid, score, pos, pos, pos));
            self.en.next();
        }

        // Same order the heap pops in: score, ties by lower position
        self.q
            .sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.2.cmp(&a.2)));
        self.sorted = true;
    }

    pub fn value(&self) -> RankedEntry {
        self.cur
    }

    pub fn size(&self) -> usize {
        self.en.size()
    }

    /// The node whose adjacency list this cursor traverses
    pub fn docid(&self) -> NodeId {
        self.docid
    }
}

/// Like [`SimpleIndexBuilder`](super::SimpleIndexBuilder), plus the global
/// ranking. `commit` additionally writes `.rnk` and runs a second pass
/// over the sealed postings to build the score buckets.
pub struct TopkIndexBuilder<S: SequenceCodec> {
    path: PathBuf,
    postings: SequenceFileBuilder<S>,
    arrays: DirectoryArrays,
    ranking: Vec<u64>,
    config: Configuration,
}

impl<S: SequenceCodec> TopkIndexBuilder<S> {
    pub fn create(
        path: &Path,
        opts: Options,
        ranking: Vec<u64>,
        config: &Configuration,
    ) -> Result<Self> {
        assert_eq!(
            ranking.len() as u64,
            opts.universe,
            "one rank per node is required"
        );

        Ok(TopkIndexBuilder {
            path: path.to_path_buf(),
            postings: SequenceFileBuilder::create(&suffixed(path, ".pos"), opts)?,
            arrays: DirectoryArrays::new(),
            ranking,
            config: config.clone(),
        })
    }

    pub fn opts(&self) -> &Options {
        self.postings.opts()
    }

    pub fn append(&mut self, docid: NodeId, values: &[NodeId]) -> Result<()> {
        let offset = self.postings.append(values)?;
        self.arrays.append(docid, offset, values.len() as u64);
        Ok(())
    }

    pub fn append_encoded(
        &mut self,
        docid: NodeId,
        encoded: &[u8],
        num_elements: u64,
    ) -> Result<()> {
        let offset = self.postings.append_encoded(encoded, num_elements)?;
        self.arrays.append(docid, offset, num_elements);
        Ok(())
    }

    pub fn commit(self, in_memory: bool) -> Result<TopkIndex<S>> {
        let TopkIndexBuilder {
            path,
            postings,
            mut arrays,
            ranking,
            config,
        } = self;

        arrays.pad_to(postings.opts().universe);
        postings.commit()?;
        arrays.write(&path)?;

        let mut cumulative = ranking.clone();
        for i in 1..cumulative.len() {
            cumulative[i] += cumulative[i - 1] + 1;
        }
        write_ef_array(&suffixed(&path, ".rnk"), &cumulative)?;

        build_score_buckets::<S>(&path, &arrays, &ranking, &config)?;

        TopkIndex::open(&path, in_memory, &config)
    }
}

/// Second construction pass: re-reads every adjacency list from the
/// sealed postings file and feeds the neighbor ranks to the bucket
/// builder.
fn build_score_buckets<S: SequenceCodec>(
    path: &Path,
    arrays: &DirectoryArrays,
    ranking: &[u64],
    config: &Configuration,
) -> Result<()> {
    let postings = SequenceFile::<S>::open(&suffixed(path, ".pos"), true)?;
    let mut builder = RmqSequencesBuilder::new(path, config.rmq_bucket_size);

    let progress = ProgressBar::new(arrays.offsets.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .progress_chars("=> "),
    );

    let mut prev_cdf = 0;
    let mut scores = Vec::new();

    for i in 0..arrays.offsets.len() {
        let cdf = arrays.true_cdf(i);
        scores.clear();

        if cdf > prev_cdf {
            let mut en = postings.sequence_at(arrays.offsets[i])?;
            while en.position() < en.size() {
                scores.push(ranking[en.docid() as usize]);
                en.next();
            }
        }

        builder.append(cdf, &scores);
        prev_cdf = cdf;
        progress.inc(1);
    }
    progress.finish();

    builder.commit()?;
    Ok(())
}
