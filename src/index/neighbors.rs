//! Neighborhood expansion on top of a [`GraphIndex`]: direct neighbors,
//! k-hop neighborhoods and the batched friends-at-k extraction.

use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::base::{NodeId, Result};
use crate::config::Configuration;
use crate::queues::{Job, JobQueue, OrderedQueue};
use crate::sequences::Enumerator;

use super::GraphIndex;

fn fill<E: Enumerator>(en: &mut E, out: &mut Vec<NodeId>) {
    out.reserve(en.size() - en.position());
    while en.position() < en.size() {
        out.push(en.docid());
        en.next();
    }
}

/// Direct neighbors of `source`, or `None` when it has no outgoing edges
pub fn neighbors<I: GraphIndex>(index: &I, source: NodeId) -> Result<Option<Vec<NodeId>>> {
    let Some(offset) = index.get_offset(source) else {
        return Ok(None);
    };

    let mut en = index.sequence_at(offset)?;
    let mut result = Vec::new();
    fill(&mut en, &mut result);
    Ok(Some(result))
}

/// Nodes reachable from `source` in at most `k` hops, sorted and without
/// `source` itself (`k == 1` keeps the raw adjacency list as is)
pub fn neighbors_at<I: GraphIndex>(
    index: &I,
    source: NodeId,
    k: u32,
) -> Result<Option<Vec<NodeId>>> {
    assert!(k >= 1);

    let Some(offset) = index.get_offset(source) else {
        return Ok(None);
    };

    if k == 1 {
        return neighbors(index, source);
    }

    if k == 2 {
        let mut en = index.sequence_at(offset)?;
        let mut result = Vec::new();
        fill(&mut en, &mut result);

        en.reset();
        while en.position() < en.size() {
            if let Some(friend_offset) = index.get_offset(en.docid()) {
                let mut friend_en = index.sequence_at(friend_offset)?;
                fill(&mut friend_en, &mut result);
            }
            en.next();
        }

        result.sort_unstable();
        result.dedup();
        result.retain(|&node| node != source);
        return Ok(Some(result));
    }

    let mut visited = HashSet::new();
    let mut union = HashSet::new();
    let mut current = VecDeque::new();
    let mut next = VecDeque::new();

    current.push_back(source);

    for _ in 0..k {
        while let Some(node) = current.pop_front() {
            visited.insert(node);

            let Some(offset) = index.get_offset(node) else {
                continue;
            };
            let mut en = index.sequence_at(offset)?;
            while en.position() < en.size() {
                let next_node = en.docid();
                union.insert(next_node);
                if !visited.contains(&next_node) {
                    next.push_back(next_node);
                }
                en.next();
            }
        }
        std::mem::swap(&mut current, &mut next);
    }

    union.remove(&source);
    if union.is_empty() {
        return Ok(None);
    }

    let mut result: Vec<NodeId> = union.into_iter().collect();
    result.sort_unstable();
    Ok(Some(result))
}

/// Merges already sorted lists, dropping `node` and adjacent duplicates
fn merge_sorted_lists(node: NodeId, mut lists: Vec<VecDeque<NodeId>>) -> Vec<NodeId> {
    let mut heads = BinaryHeap::new();
    for (i, list) in lists.iter_mut().enumerate() {
        if let Some(first) = list.pop_front() {
            heads.push(std::cmp::Reverse((first, i)));
        }
    }

    let mut output = Vec::new();
    while let Some(std::cmp::Reverse((value, i))) = heads.pop() {
        if value != node && output.last() != Some(&value) {
            output.push(value);
        }
        if let Some(next) = lists[i].pop_front() {
            heads.push(std::cmp::Reverse((next, i)));
        }
    }
    output
}

struct FriendsJob<I, W: Write> {
    index: Arc<I>,
    out: Arc<Mutex<W>>,
    node: NodeId,
    k: u32,
    histogram: bool,
    rendered: String,
}

impl<I, W> Job for FriendsJob<I, W>
where
    I: GraphIndex + Send + Sync + 'static,
    W: Write + Send + 'static,
{
    fn prepare(&mut self) {
        // One sorted list per visited node; merging keeps the output
        // sorted without an extra pass
        let mut lists: Vec<VecDeque<NodeId>> = Vec::new();

        let mut visited = HashSet::new();
        let mut current = VecDeque::new();
        let mut next = VecDeque::new();

        current.push_back(self.node);

        for _ in 0..self.k {
            while let Some(node) = current.pop_front() {
                visited.insert(node);

                let adjacent = neighbors(self.index.as_ref(), node)
                    .expect("failed to read the index")
                    .unwrap_or_default();

                for &next_node in &adjacent {
                    if !visited.contains(&next_node) {
                        next.push_back(next_node);
                    }
                }
                lists.push(adjacent.into());
            }
            std::mem::swap(&mut current, &mut next);
        }

        let merged = merge_sorted_lists(self.node, lists);

        let mut rendered = String::new();
        if self.histogram {
            rendered.push_str(&format!("{}\t{}\n", self.node, merged.len()));
        } else {
            for value in &merged {
                rendered.push_str(&format!("{}\t{}\n", self.node, value));
            }
        }
        self.rendered = rendered;
    }

    fn commit(&mut self) {
        let mut out = self.out.lock().expect("output writer poisoned");
        out.write_all(self.rendered.as_bytes())
            .expect("failed to write neighborhood");
    }
}

/// Batched k-hop extraction: neighborhoods are expanded on worker threads
/// and written in node order.
pub struct FriendsAtK<I, W: Write> {
    index: Arc<I>,
    out: Arc<Mutex<W>>,
    k: u32,
    histogram: bool,
    queue: OrderedQueue,
}

impl<I, W> FriendsAtK<I, W>
where
    I: GraphIndex + Send + Sync + 'static,
    W: Write + Send + 'static,
{
    pub fn new(index: Arc<I>, k: u32, histogram: bool, out: W, config: &Configuration) -> Self {
        assert!(k >= 1);
        FriendsAtK {
            index,
            out: Arc::new(Mutex::new(out)),
            k,
            histogram,
            queue: OrderedQueue::new(config),
        }
    }

    /// Schedules `node`; `expected_work` is typically its degree
    pub fn process(&mut self, node: NodeId, expected_work: u64) {
        let job = FriendsJob {
            index: Arc::clone(&self.index),
            out: Arc::clone(&self.out),
            node,
            k: self.k,
            histogram: self.histogram,
            rendered: String::new(),
        };
        self.queue.add_job(Box::new(job), expected_work);
    }

    pub fn complete(&mut self) {
        self.queue.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SimpleIndexBuilder;
    use crate::sequences::{EfSequence, Options};
    use temp_dir::TempDir;

    fn scenario_index() -> (TempDir, crate::index::SimpleIndex<EfSequence>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph");

        let mut builder =
            SimpleIndexBuilder::<EfSequence>::create(&path, Options::new(6)).unwrap();
        builder.append(0, &[1, 2, 4, 5]).unwrap();
        builder.append(1, &[2, 3]).unwrap();
        builder.append(2, &[4, 5]).unwrap();
        let index = builder.commit(true).unwrap();
        (dir, index)
    }

    #[test]
    fn test_direct_neighbors() {
        let (_dir, index) = scenario_index();
        assert_eq!(neighbors(&index, 0).unwrap(), Some(vec![1, 2, 4, 5]));
        assert_eq!(neighbors(&index, 2).unwrap(), Some(vec![4, 5]));
        assert_eq!(neighbors(&index, 3).unwrap(), None);
    }

    #[test]
    fn test_two_hops() {
        let (_dir, index) = scenario_index();
        // 1-hop {1, 2, 4, 5} plus 1 -> {2, 3} and 2 -> {4, 5}, minus 0
        assert_eq!(
            neighbors_at(&index, 0, 2).unwrap(),
            Some(vec![1, 2, 3, 4, 5])
        );
        assert_eq!(neighbors_at(&index, 1, 2).unwrap(), Some(vec![2, 3, 4, 5]));
    }

    #[test]
    fn test_bfs_matches_two_hop_union() {
        let (_dir, index) = scenario_index();
        assert_eq!(
            neighbors_at(&index, 0, 3).unwrap(),
            Some(vec![1, 2, 3, 4, 5])
        );
        assert_eq!(neighbors_at(&index, 3, 3).unwrap(), None);
    }

    #[test]
    fn test_merge_sorted_lists() {
        let lists = vec![
            VecDeque::from(vec![1, 4, 9]),
            VecDeque::from(vec![2, 4, 7]),
            VecDeque::from(vec![]),
            VecDeque::from(vec![4, 7]),
        ];
        assert_eq!(merge_sorted_lists(7, lists), vec![1, 2, 4, 9]);
    }

    #[test]
    fn test_friends_at_k_output_order() {
        let (_dir, index) = scenario_index();
        let index = Arc::new(index);

        let config = Configuration {
            worker_threads: 2,
            work_per_thread: 1,
            ..Configuration::default()
        };

        let mut app = FriendsAtK::new(Arc::clone(&index), 2, false, Vec::new(), &config);
        for node in 0..3 {
            app.process(node, index.degree(node));
        }
        app.complete();

        let out = Arc::try_unwrap(app.out).ok().unwrap().into_inner().unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
0\t1\n0\t2\n0\t3\n0\t4\n0\t5\n\
1\t2\n1\t3\n1\t4\n1\t5\n\
2\t4\n2\t5\n";
        assert_eq!(text, expected);
    }
}
