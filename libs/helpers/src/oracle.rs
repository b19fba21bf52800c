//! Brute force reference answers computed straight from the adjacency.

use hop_index::base::NodeId;

use crate::graphs::TestGraph;

fn range_part(graph: &TestGraph, node: NodeId, l: NodeId, r: NodeId, out: &mut Vec<NodeId>) {
    out.extend(
        graph
            .neighbors(node)
            .iter()
            .copied()
            .filter(|&t| l <= t && t < r),
    );
}

/// Values of `source`'s own list in `[l, r)`
pub fn asindex(graph: &TestGraph, source: NodeId, l: NodeId, r: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    range_part(graph, source, l, r, &mut result);
    result
}

/// Union of the lists at distance up to `hops` from `source`, restricted
/// to `[l, r)`, without `source` itself; empty when `source` has no list
pub fn hopping(
    graph: &TestGraph,
    source: NodeId,
    l: NodeId,
    r: NodeId,
    hops: u32,
) -> Vec<NodeId> {
    if graph.neighbors(source).is_empty() {
        return Vec::new();
    }

    let mut frontier = vec![source];
    let mut result = Vec::new();
    for _ in 0..hops {
        let mut next = Vec::new();
        for &node in &frontier {
            range_part(graph, node, l, r, &mut result);
            next.extend_from_slice(graph.neighbors(node));
        }
        frontier = next;
    }

    result.sort_unstable();
    result.dedup();
    result.retain(|&node| node != source);
    result
}

/// The `k` best ranked nodes of the two hop neighborhood, ordered by
/// rank and then docid, both descending
pub fn topk(graph: &TestGraph, source: NodeId, l: NodeId, r: NodeId, k: usize) -> Vec<NodeId> {
    let mut result = hopping(graph, source, l, r, 2);
    result.sort_unstable_by(|a, b| {
        match graph.ranking[*b as usize].cmp(&graph.ranking[*a as usize]) {
            std::cmp::Ordering::Equal => b.cmp(a),
            ordering => ordering,
        }
    });
    result.truncate(k);
    result
}
