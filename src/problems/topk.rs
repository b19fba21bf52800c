//! Ranked top-k schemes over the hopping neighborhood.
//!
//! All variants agree on the answer: the k best ranked nodes of the query
//! range reachable in two hops, ordered by descending rank and then by
//! descending docid. They differ in how much work they can skip:
//!
//! * `topk-hopping` scans every list in the neighborhood;
//! * `topk-hopping-wand` processes lists by decreasing rank upper bound
//!   and stops once no list can improve the heap;
//! * `topk-hopping-rmq` pulls entries rank-first through the ranked
//!   cursors, never decoding past the k-th result;
//! * `topk-hopping-rmq-wand` routes long lists through the cursors and
//!   short ones through WAND.

use std::cmp::Ordering;

use log::warn;

use crate::base::{NodeId, Rank, Result};
use crate::config::Configuration;
use crate::containers::{Compare, ReinsertablePriorityQueue, UniqueFixedPriorityQueue};
use crate::index::{GraphIndex, RankedIndex, RmqCursor};
use crate::sequences::Enumerator;

use super::Scheme;

pub type RankedNode = (NodeId, Rank);

/// Orders candidates by rank, breaking ties by docid; the resulting heap
/// pops by descending rank, then descending docid
struct RankOrder;

impl Compare<RankedNode> for RankOrder {
    fn less(&self, a: &RankedNode, b: &RankedNode) -> bool {
        if a.1 == b.1 {
            a.0 < b.0
        } else {
            a.1 < b.1
        }
    }
}

type TopkHeap = UniqueFixedPriorityQueue<RankedNode, RankOrder>;

/// Orders ranked cursors by their current entry, mirroring [`RankOrder`]
struct CursorOrder;

impl<'a, E: Enumerator> Compare<RmqCursor<'a, E>> for CursorOrder {
    fn less(&self, a: &RmqCursor<'a, E>, b: &RmqCursor<'a, E>) -> bool {
        let (a, b) = (a.value(), b.value());
        if a.score == b.score {
            a.docid < b.docid
        } else {
            a.score < b.score
        }
    }
}

/// Highest neighbor rank per node, the static bound the WAND variants
/// prune with
pub fn compute_wand_bounds<I: GraphIndex>(index: &I, ranking: &[u64]) -> Result<Vec<u64>> {
    let mut bounds = vec![0u64; index.num_docs() as usize];

    for docid in 0..index.num_docs() {
        let Some(offset) = index.get_offset(docid) else {
            continue;
        };
        let mut en = index.sequence_at(offset)?;
        let mut best = 0;
        while en.position() < en.size() {
            best = best.max(ranking[en.docid() as usize]);
            en.next();
        }
        bounds[docid as usize] = best;
    }
    Ok(bounds)
}

pub struct Solver<'a, I> {
    index: &'a I,
    ranking: &'a [u64],
    wand: &'a [u64],
    k: usize,
    rmq_wand_threshold: u64,
}

impl<'a, I: GraphIndex> Solver<'a, I> {
    pub fn new(
        index: &'a I,
        ranking: &'a [u64],
        wand: &'a [u64],
        k: usize,
        config: &Configuration,
    ) -> Self {
        assert!(k > 0);
        Solver {
            index,
            ranking,
            wand,
            k,
            rmq_wand_threshold: config.rmq_wand_threshold,
        }
    }

    /// Schemes available on any index; panics on one that needs the
    /// range-maximum side structure
    pub fn solve(&self, scheme: Scheme, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        match scheme {
            Scheme::TopkHopping => self.solve_hopping(docid, l, r),
            Scheme::TopkHoppingWand => self.solve_hopping_wand(docid, l, r),
            other => panic!("scheme {} needs a ranked index", other.name()),
        }
    }

    fn new_heap(&self, docid: NodeId) -> TopkHeap {
        // The query node itself never belongs to the answer
        UniqueFixedPriorityQueue::new(self.k, (docid, self.ranking[docid as usize]), RankOrder)
    }

    fn drain(mut heap: TopkHeap) -> Vec<NodeId> {
        let mut result = Vec::new();
        while let Some((docid, _)) = heap.pop() {
            result.push(docid);
        }
        result
    }

    fn solve_hopping(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let Some(offset) = self.index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut heap = self.new_heap(docid);
        self.accumulate(docid, l, r, &mut heap);

        let mut en = self.index.sequence_at(offset)?;
        while en.position() < en.size() {
            self.accumulate(en.docid(), l, r, &mut heap);
            en.next();
        }

        Ok(Self::drain(heap))
    }

    fn solve_hopping_wand(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let Some(offset) = self.index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut heap = self.new_heap(docid);

        let mut candidates: Vec<RankedNode> = vec![(docid, self.wand[docid as usize])];
        let mut en = self.index.sequence_at(offset)?;
        while en.position() < en.size() {
            let friend = en.docid();
            candidates.push((friend, self.wand[friend as usize]));
            en.next();
        }
        candidates.sort_unstable_by(|a, b| b.1.cmp(&a.1));

        for &(candidate, bound) in &candidates {
            if heap.full() && bound < heap.minimum().map_or(0, |min| min.1) {
                break;
            }
            self.accumulate(candidate, l, r, &mut heap);
        }

        Ok(Self::drain(heap))
    }

    /// List of `docid` at `offset`; an unreadable list contributes
    /// nothing to the query instead of failing it
    fn list_at(&self, docid: NodeId, offset: u64) -> Option<I::Enumerator<'a>> {
        match self.index.sequence_at(offset) {
            Ok(en) => Some(en),
            Err(err) => {
                warn!("skipping the unreadable list of node {}: {}", docid, err);
                None
            }
        }
    }

    /// Pushes every list entry in `[l, r)` of `docid`'s list on the heap
    fn accumulate(&self, docid: NodeId, l: NodeId, r: NodeId, heap: &mut TopkHeap) {
        let Some(offset) = self.index.get_offset(docid) else {
            return;
        };
        let Some(mut en) = self.list_at(docid, offset) else {
            return;
        };

        if en.docid() < l {
            en.next_geq(l);
        }
        if en.position() == en.size() || en.docid() < l || en.docid() >= r {
            return;
        }

        while en.position() < en.size() {
            let candidate = en.docid();
            if candidate >= r {
                break;
            }
            heap.push((candidate, self.ranking[candidate as usize]));
            en.next();
        }
    }
}

type CursorHeap<'a, I> =
    ReinsertablePriorityQueue<RmqCursor<'a, <I as GraphIndex>::Enumerator<'a>>, CursorOrder>;

impl<'a, I: RankedIndex> Solver<'a, I> {
    /// All ranked schemes, including the cursor based ones
    pub fn solve_ranked(
        &self,
        scheme: Scheme,
        docid: NodeId,
        l: NodeId,
        r: NodeId,
    ) -> Result<Vec<NodeId>> {
        match scheme {
            Scheme::TopkHopping | Scheme::TopkHoppingWand => self.solve(scheme, docid, l, r),
            Scheme::TopkHoppingRmq => self.solve_hopping_rmq(docid, l, r),
            Scheme::TopkHoppingRmqWand => self.solve_hopping_rmq_wand(docid, l, r),
            other => panic!("scheme {} is not ranked", other.name()),
        }
    }

    fn solve_hopping_rmq(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let index = self.index;
        let Some(offset) = index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut heap: CursorHeap<'a, I> = ReinsertablePriorityQueue::new(CursorOrder);
        self.push_cursor(docid, l, r, &mut heap);

        let mut en = index.sequence_at(offset)?;
        while en.position() < en.size() {
            self.push_cursor(en.docid(), l, r, &mut heap);
            en.next();
        }

        let mut result = Vec::with_capacity(self.k);
        self.drain_cursors(docid, &mut heap, &mut result);
        Ok(result)
    }

    fn solve_hopping_rmq_wand(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let index = self.index;
        let Some(offset) = index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut rmq_heap: CursorHeap<'a, I> = ReinsertablePriorityQueue::new(CursorOrder);
        let mut wand_heap = self.new_heap(docid);
        let mut candidates: Vec<RankedNode> = Vec::new();

        if !self.push_cursor_if_long(docid, l, r, &mut rmq_heap) {
            candidates.push((docid, self.wand[docid as usize]));
        }

        let mut en = index.sequence_at(offset)?;
        while en.position() < en.size() {
            let friend = en.docid();
            if !self.push_cursor_if_long(friend, l, r, &mut rmq_heap) {
                candidates.push((friend, self.wand[friend as usize]));
            }
            en.next();
        }
        candidates.sort_unstable_by(|a, b| b.1.cmp(&a.1));

        let mut result = Vec::with_capacity(2 * self.k);
        let previous = self.drain_cursors(docid, &mut rmq_heap, &mut result);

        // Short lists cannot contribute below the worst rank the cursors
        // already delivered
        let min_rank = match previous {
            Some(last) if result.len() >= self.k => self.ranking[last as usize],
            _ => 0,
        };

        for &(candidate, bound) in &candidates {
            if bound < min_rank
                || (wand_heap.full() && bound < wand_heap.minimum().map_or(0, |min| min.1))
            {
                break;
            }
            self.accumulate(candidate, l, r, &mut wand_heap);
        }

        while let Some((node, _)) = wand_heap.pop() {
            result.push(node);
        }

        result.sort_unstable_by(|a, b| {
            match self.ranking[*b as usize].cmp(&self.ranking[*a as usize]) {
                Ordering::Equal => b.cmp(a),
                ordering => ordering,
            }
        });
        result.dedup();
        result.truncate(self.k);
        Ok(result)
    }

    /// Pops ranked entries from the cursors into `result` until `k` are
    /// collected, returning the last node emitted
    fn drain_cursors(
        &self,
        docid: NodeId,
        heap: &mut CursorHeap<'a, I>,
        result: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        let mut previous = None;

        while result.len() < self.k {
            let Some(cursor) = heap.top_mut() else {
                break;
            };

            let target = cursor.value().docid;
            let has_more = cursor.next();

            if target != docid && previous != Some(target) {
                result.push(target);
                previous = Some(target);
            }

            if has_more {
                heap.reinsert();
            } else {
                heap.pop();
            }
        }
        previous
    }

    fn push_cursor(&self, docid: NodeId, l: NodeId, r: NodeId, heap: &mut CursorHeap<'a, I>) {
        let Some(offset) = self.index.get_offset(docid) else {
            return;
        };
        let Some(en) = self.list_at(docid, offset) else {
            return;
        };
        self.push_cursor_range(docid, l, r, en, heap);
    }

    /// Routes `docid` through a cursor only when its list is long enough;
    /// returns false when the caller should treat it as a WAND candidate
    fn push_cursor_if_long(
        &self,
        docid: NodeId,
        l: NodeId,
        r: NodeId,
        heap: &mut CursorHeap<'a, I>,
    ) -> bool {
        let Some(offset) = self.index.get_offset(docid) else {
            return true;
        };
        let Some(en) = self.list_at(docid, offset) else {
            return true;
        };
        if (en.size() as u64) < self.rmq_wand_threshold {
            return false;
        }
        self.push_cursor_range(docid, l, r, en, heap);
        true
    }

    fn push_cursor_range(
        &self,
        docid: NodeId,
        l: NodeId,
        r: NodeId,
        mut en: I::Enumerator<'a>,
        heap: &mut CursorHeap<'a, I>,
    ) {
        if en.docid() < l {
            en.next_geq(l);
        }
        if en.position() == en.size() || en.docid() < l || en.docid() >= r {
            return;
        }

        let a = en.position() as u64;
        en.next_geq(r);
        let mut b = en.position() as u64;
        if b > a {
            b -= 1;
        }

        let mut cursor = self.index.rmq_cursor(docid, en);
        cursor.rmq(a, b);
        if cursor.next() {
            heap.push(cursor);
        }
    }
}
