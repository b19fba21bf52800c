use std::fmt::Write as _;
use std::io::Cursor;

use rstest::rstest;

use helpers::graphs::TestGraph;
use hop_index::config::Configuration;
use hop_index::graphs::{serialize_graph, ReaderEdgeSource};
use hop_index::index::{GraphIndex, RankedIndex, SimpleIndex, SimpleIndexBuilder, TopkIndex};
use hop_index::sequences::{EfSequence, Enumerator, Options};

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn decode_list<I: GraphIndex>(index: &I, node: u64) -> Vec<u64> {
    let Some(offset) = index.get_offset(node) else {
        return Vec::new();
    };
    let mut en = index.sequence_at(offset).expect("corrupt list");
    let mut values = Vec::new();
    while en.position() < en.size() {
        values.push(en.docid());
        en.next();
    }
    values
}

fn check_lists<I: GraphIndex>(graph: &TestGraph, index: &I) {
    assert_eq!(index.num_docs(), graph.universe);
    let total: u64 = (0..graph.universe).map(|node| index.degree(node)).sum();
    assert_eq!(total, index.num_elements());
    // Out-of-range nodes have no list and a degree of zero
    assert!(index.get_offset(graph.universe).is_none());
    assert_eq!(index.degree(graph.universe + 7), 0);
    for node in 0..graph.universe {
        let expected = graph.neighbors(node);
        assert_eq!(index.degree(node), expected.len() as u64, "node {}", node);
        if expected.is_empty() {
            assert!(index.get_offset(node).is_none(), "node {}", node);
        } else {
            assert_eq!(decode_list(index, node), expected, "node {}", node);
        }
    }
}

#[rstest]
#[case(42, true)]
#[case(42, false)]
#[case(7, false)]
fn test_simple_roundtrip(#[case] seed: u64, #[case] in_memory: bool) {
    init_logger();
    let graph = TestGraph::new(200, 5., Some(seed));
    let index = graph.build_simple();
    check_lists(&graph, &index);

    // Reopen from disk with the requested buffer backing
    let reopened =
        SimpleIndex::<EfSequence>::open(&graph.dir.path().join("simple"), in_memory).unwrap();
    assert_eq!(reopened.num_elements(), index.num_elements());
    check_lists(&graph, &reopened);
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_topk_roundtrip(#[case] in_memory: bool) {
    init_logger();
    let config = Configuration::default();
    let graph = TestGraph::new(150, 4., Some(13));
    let index = graph.build_topk(&config);
    check_lists(&graph, &index);

    let reopened =
        TopkIndex::<EfSequence>::open(&graph.dir.path().join("topk"), in_memory, &config).unwrap();
    check_lists(&graph, &reopened);
    for node in 0..graph.universe {
        assert_eq!(reopened.rank(node), graph.ranking[node as usize]);
    }
}

#[test]
fn test_rebuild_is_byte_identical() {
    init_logger();
    let graph = TestGraph::new(100, 5., Some(5));

    let mut paths = Vec::new();
    for name in ["first", "second"] {
        let path = graph.dir.path().join(name);
        let mut builder =
            SimpleIndexBuilder::<EfSequence>::create(&path, Options::new(graph.universe)).unwrap();
        for node in 0..graph.universe {
            let targets = graph.neighbors(node);
            if !targets.is_empty() {
                builder.append(node, targets).unwrap();
            }
        }
        builder.commit(true).unwrap();
        paths.push(path);
    }

    for suffix in [".pos", ".off", ".deg"] {
        let read = |i: usize| {
            let mut name = paths[i].as_os_str().to_os_string();
            name.push(suffix);
            std::fs::read(name).unwrap()
        };
        let (a, b) = (read(0), read(1));
        // The footer ends with the construction time, which may differ
        assert_eq!(a[..a.len() - 8], b[..b.len() - 8], "{}", suffix);
    }
}

#[test]
fn test_parallel_construction_matches_direct() {
    init_logger();
    let graph = TestGraph::new(300, 6., Some(99));
    let direct = graph.build_simple();

    let mut edges = String::new();
    for node in 0..graph.universe {
        for target in graph.neighbors(node) {
            writeln!(edges, "{}\t{}", node, target).unwrap();
        }
    }

    let path = graph.dir.path().join("streamed");
    let opts = Options::new(graph.universe);
    let builder = SimpleIndexBuilder::<EfSequence>::create(&path, opts).unwrap();
    let config = Configuration {
        worker_threads: 4,
        work_per_thread: 16,
        ..Configuration::default()
    };
    let builder = serialize_graph::<_, EfSequence, _>(
        ReaderEdgeSource::new(Cursor::new(edges)),
        builder,
        opts,
        &config,
    )
    .unwrap();
    let streamed = builder.commit(true).unwrap();

    assert_eq!(streamed.num_elements(), direct.num_elements());
    check_lists(&graph, &streamed);
}
