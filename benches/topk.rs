use criterion::{criterion_group, criterion_main, Criterion};

use helpers::graphs::TestGraph;
use hop_index::config::Configuration;
use hop_index::problems::topk::{compute_wand_bounds, Solver};
use hop_index::problems::Scheme;

fn criterion_benchmark(c: &mut Criterion) {
    const UNIVERSE: u64 = 10_000;
    const K: usize = 10;

    let config = Configuration::default();
    let graph = TestGraph::new(UNIVERSE, 30., Some(42));
    let index = graph.build_topk(&config);
    let wand = compute_wand_bounds(&index, &graph.ranking).expect("corrupt index");

    let solver = Solver::new(&index, &graph.ranking, &wand, K, &config);

    let schemes = [
        Scheme::TopkHopping,
        Scheme::TopkHoppingWand,
        Scheme::TopkHoppingRmq,
        Scheme::TopkHoppingRmqWand,
    ];
    for scheme in schemes {
        c.bench_function(scheme.name(), |b| {
            let mut source = 0;
            b.iter(|| {
                source = (source + 1) % UNIVERSE;
                solver
                    .solve_ranked(scheme, source, UNIVERSE / 4, 3 * UNIVERSE / 4)
                    .expect("query failed")
            })
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(500);
    targets = criterion_benchmark
}
criterion_main!(benches);
