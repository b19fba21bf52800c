use rstest::rstest;

use helpers::graphs::TestGraph;
use helpers::oracle;
use hop_index::config::Configuration;
use hop_index::problems::topk::compute_wand_bounds;
use hop_index::problems::{intersection, topk, Scheme};

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ranges(universe: u64) -> Vec<(u64, u64)> {
    vec![
        (0, universe),
        (0, universe / 2),
        (universe / 4, 3 * universe / 4),
        (universe - 1, universe),
    ]
}

#[rstest]
#[case(1)]
#[case(23)]
#[case(4242)]
fn test_intersection_schemes_match_oracle(#[case] seed: u64) {
    init_logger();
    let graph = TestGraph::new(120, 5., Some(seed));
    let index = graph.build_simple();
    let solver = intersection::Solver::new(&index);

    for source in 0..graph.universe {
        for &(l, r) in &ranges(graph.universe) {
            assert_eq!(
                solver.solve(Scheme::AsIndex, source, l, r).unwrap(),
                oracle::asindex(&graph, source, l, r),
                "asindex source={} range=[{}, {})",
                source,
                l,
                r
            );
            assert_eq!(
                solver.solve(Scheme::Hopping, source, l, r).unwrap(),
                oracle::hopping(&graph, source, l, r, 2),
                "hopping source={} range=[{}, {})",
                source,
                l,
                r
            );
            assert_eq!(
                solver.solve(Scheme::Coverage, source, l, r).unwrap(),
                oracle::hopping(&graph, source, l, r, 3),
                "coverage source={} range=[{}, {})",
                source,
                l,
                r
            );
        }
    }
}

#[rstest]
#[case(5)]
#[case(77)]
fn test_baselines_match_hopping(#[case] seed: u64) {
    init_logger();
    let graph = TestGraph::new(100, 5., Some(seed));
    let index = graph.build_simple();
    let solver = intersection::Solver::new(&index);

    // Under the identity ordering every baseline answers the same
    // question as its plain counterpart
    let identity: Vec<u64> = (0..graph.universe).collect();
    for source in 0..graph.universe {
        for &(l, r) in &ranges(graph.universe) {
            let mut expected = oracle::hopping(&graph, source, l, r, 2);

            let mut candidates: Vec<u64> = (l..r).collect();
            let mut observed = solver
                .solve_baseline(Scheme::BaselineHopping, source, &mut candidates)
                .unwrap();
            observed.sort_unstable();
            expected.sort_unstable();
            assert_eq!(observed, expected, "baseline source={}", source);

            let mut observed = solver
                .solve_fast_baseline(Scheme::FastBaselineHopping, source, l, r, &identity)
                .unwrap();
            observed.sort_unstable();
            assert_eq!(observed, expected, "fast baseline source={}", source);
        }
    }
}

/// Thresholds chosen so every cursor code path gets exercised: a scan
/// threshold of 0 forces tree descent, a large one forces the sorted
/// scan, and the wand threshold splits lists between cursors and
/// accumulation.
#[rstest]
#[case(0, 0)]
#[case(0, 4)]
#[case(1_000_000, 0)]
#[case(4, 6)]
fn test_ranked_schemes_match_oracle(#[case] scan_threshold: u64, #[case] wand_threshold: u64) {
    init_logger();
    let config = Configuration {
        topk_scan_threshold: scan_threshold,
        rmq_wand_threshold: wand_threshold,
        // Small buckets so queries cross several trees
        rmq_bucket_size: 32,
        ..Configuration::default()
    };

    let graph = TestGraph::new(80, 6., Some(31));
    let index = graph.build_topk(&config);
    let wand = compute_wand_bounds(&index, &graph.ranking).unwrap();

    let schemes = [
        Scheme::TopkHopping,
        Scheme::TopkHoppingWand,
        Scheme::TopkHoppingRmq,
        Scheme::TopkHoppingRmqWand,
    ];

    for k in [1usize, 2, 5, 10] {
        let solver = topk::Solver::new(&index, &graph.ranking, &wand, k, &config);
        for source in 0..graph.universe {
            for &(l, r) in &ranges(graph.universe) {
                let expected = oracle::topk(&graph, source, l, r, k);
                for scheme in schemes {
                    assert_eq!(
                        solver.solve_ranked(scheme, source, l, r).unwrap(),
                        expected,
                        "{} source={} range=[{}, {}) k={}",
                        scheme.name(),
                        source,
                        l,
                        r,
                        k
                    );
                }
            }
        }
    }
}
