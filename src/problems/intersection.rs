//! Unranked intersection schemes: all neighborhood nodes falling in the
//! query range `[l, r)`.
//!
//! The baseline variants answer the same question against an index whose
//! ids were assigned in a different order: `remapping[position] = docid`
//! for the slice variant, `remapping[docid] = position` for the fast one.

use log::warn;

use crate::base::{NodeId, Result};
use crate::index::GraphIndex;
use crate::sequences::Enumerator;

use super::Scheme;

/// All values of `en` falling in `[l, r)`, in list order
pub(crate) fn enumerate_range<E: Enumerator>(
    en: &mut E,
    l: NodeId,
    r: NodeId,
    result: &mut Vec<NodeId>,
) {
    if en.docid() < l {
        en.next_geq(l);
    }
    if en.position() == en.size() || en.docid() < l || en.docid() >= r {
        return;
    }

    while en.position() < en.size() {
        let docid = en.docid();
        if docid >= r {
            return;
        }
        result.push(docid);
        en.next();
    }
}

/// Intersects `en` with the sorted candidate docids in `remapping`,
/// blanking matched candidates so later lists skip them
fn enumerate_candidates<E: Enumerator>(
    en: &mut E,
    remapping: &mut [u64],
    result: &mut Vec<NodeId>,
) {
    for slot in remapping.iter_mut() {
        let candidate = *slot;
        if candidate == u64::MAX || en.docid() > candidate {
            continue;
        }

        en.next_geq(candidate);
        if en.position() == en.size() || en.docid() < candidate {
            return;
        }

        if en.docid() == candidate {
            *slot = u64::MAX;
            result.push(candidate);
        }
    }
}

/// Keeps the values of `en` whose remapped position falls in `[l, r)`
fn enumerate_positions<E: Enumerator>(
    en: &mut E,
    l: NodeId,
    r: NodeId,
    remapping: &[u64],
    result: &mut Vec<NodeId>,
) {
    while en.position() < en.size() {
        let docid = en.docid();
        let position = remapping[docid as usize];
        if l <= position && position < r {
            result.push(docid);
        }
        en.next();
    }
}

pub struct Solver<'a, I: GraphIndex> {
    index: &'a I,
}

impl<'a, I: GraphIndex> Solver<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Solver { index }
    }

    /// Range intersection schemes; panics on a scheme that needs a
    /// remapping or a ranking
    pub fn solve(&self, scheme: Scheme, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        match scheme {
            Scheme::AsIndex => {
                let mut result = Vec::new();
                self.asindex_into(docid, l, r, &mut result);
                Ok(result)
            }
            Scheme::Hopping => self.solve_hopping(docid, l, r),
            Scheme::Coverage => self.solve_coverage(docid, l, r),
            other => panic!("scheme {} is not a range intersection", other.name()),
        }
    }

    /// Baseline schemes against a differently ordered index; `remapping`
    /// holds the sorted candidate docids of the query range and is
    /// consumed in the process
    pub fn solve_baseline(
        &self,
        scheme: Scheme,
        docid: NodeId,
        remapping: &mut [u64],
    ) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        match scheme {
            Scheme::BaselineAsIndex => {
                self.candidates_into(docid, remapping, &mut result);
            }
            Scheme::BaselineHopping => {
                let Some(offset) = self.index.get_offset(docid) else {
                    return Ok(result);
                };

                self.candidates_into(docid, remapping, &mut result);
                let mut en = self.index.sequence_at(offset)?;
                while en.position() < en.size() {
                    self.candidates_into(en.docid(), remapping, &mut result);
                    en.next();
                }

                result.sort_unstable();
                result.dedup();
                result.retain(|&node| node != docid);
            }
            other => panic!("scheme {} is not a baseline", other.name()),
        }
        Ok(result)
    }

    /// Fast baseline schemes; `remapping[docid]` is the position of
    /// `docid` in the other ordering
    pub fn solve_fast_baseline(
        &self,
        scheme: Scheme,
        docid: NodeId,
        l: NodeId,
        r: NodeId,
        remapping: &[u64],
    ) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        match scheme {
            Scheme::FastBaselineAsIndex => {
                self.positions_into(docid, l, r, remapping, &mut result);
            }
            Scheme::FastBaselineHopping => {
                let Some(offset) = self.index.get_offset(docid) else {
                    return Ok(result);
                };

                self.positions_into(docid, l, r, remapping, &mut result);
                let mut en = self.index.sequence_at(offset)?;
                while en.position() < en.size() {
                    self.positions_into(en.docid(), l, r, remapping, &mut result);
                    en.next();
                }

                result.sort_unstable();
                result.dedup();
                result.retain(|&node| node != docid);
            }
            other => panic!("scheme {} is not a fast baseline", other.name()),
        }
        Ok(result)
    }

    fn solve_hopping(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let Some(offset) = self.index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        self.asindex_into(docid, l, r, &mut result);

        let mut en = self.index.sequence_at(offset)?;
        while en.position() < en.size() {
            self.asindex_into(en.docid(), l, r, &mut result);
            en.next();
        }

        result.sort_unstable();
        result.dedup();
        result.retain(|&node| node != docid);
        Ok(result)
    }

    /// Like hopping, but also expands the lists of two-hop neighbors
    fn solve_coverage(&self, docid: NodeId, l: NodeId, r: NodeId) -> Result<Vec<NodeId>> {
        let Some(offset) = self.index.get_offset(docid) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        self.asindex_into(docid, l, r, &mut result);

        let mut en = self.index.sequence_at(offset)?;
        while en.position() < en.size() {
            let friend = en.docid();
            self.asindex_into(friend, l, r, &mut result);

            if let Some(friend_offset) = self.index.get_offset(friend) {
                if let Some(mut friend_en) = self.list_at(friend, friend_offset) {
                    while friend_en.position() < friend_en.size() {
                        self.asindex_into(friend_en.docid(), l, r, &mut result);
                        friend_en.next();
                    }
                }
            }
            en.next();
        }

        result.sort_unstable();
        result.dedup();
        result.retain(|&node| node != docid);
        Ok(result)
    }

    /// List of `docid` at `offset`; an unreadable list contributes
    /// nothing to the query instead of failing it
    fn list_at(&self, docid: NodeId, offset: u64) -> Option<I::Enumerator<'_>> {
        match self.index.sequence_at(offset) {
            Ok(en) => Some(en),
            Err(err) => {
                warn!("skipping the unreadable list of node {}: {}", docid, err);
                None
            }
        }
    }

    fn asindex_into(&self, docid: NodeId, l: NodeId, r: NodeId, result: &mut Vec<NodeId>) {
        if let Some(offset) = self.index.get_offset(docid) {
            if let Some(mut en) = self.list_at(docid, offset) {
                enumerate_range(&mut en, l, r, result);
            }
        }
    }

    fn candidates_into(&self, docid: NodeId, remapping: &mut [u64], result: &mut Vec<NodeId>) {
        if let Some(offset) = self.index.get_offset(docid) {
            if let Some(mut en) = self.list_at(docid, offset) {
                enumerate_candidates(&mut en, remapping, result);
            }
        }
    }

    fn positions_into(
        &self,
        docid: NodeId,
        l: NodeId,
        r: NodeId,
        remapping: &[u64],
        result: &mut Vec<NodeId>,
    ) {
        if let Some(offset) = self.index.get_offset(docid) {
            if let Some(mut en) = self.list_at(docid, offset) {
                enumerate_positions(&mut en, l, r, remapping, result);
            }
        }
    }
}
