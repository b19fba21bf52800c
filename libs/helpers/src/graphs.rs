//! Random graphs with a known adjacency, used to cross check the index
//! against brute force answers.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use temp_dir::TempDir;

use hop_index::base::NodeId;
use hop_index::config::Configuration;
use hop_index::index::{SimpleIndex, SimpleIndexBuilder, TopkIndex, TopkIndexBuilder};
use hop_index::sequences::{EfSequence, Options};

pub struct TestGraph {
    pub dir: TempDir,
    pub universe: u64,
    pub adjacency: HashMap<NodeId, Vec<NodeId>>,
    pub ranking: Vec<u64>,
}

impl TestGraph {
    /// Graph over `universe` nodes with Poisson distributed out degrees
    /// and a random rank permutation
    pub fn new(universe: u64, lambda_degree: f32, seed: Option<u64>) -> Self {
        let dir = TempDir::new().expect("could not create a temporary directory");
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let poi = Poisson::new(lambda_degree).expect("bad degree parameter");
        let mut adjacency = HashMap::new();
        for node in 0..universe {
            let degree = (poi.sample(&mut rng) as usize).min(universe as usize - 1);
            if degree == 0 {
                continue;
            }
            let mut targets =
                rand::seq::index::sample(&mut rng, universe as usize, degree + 1).into_vec();
            targets.retain(|&t| t as u64 != node);
            targets.truncate(degree);
            let mut targets: Vec<NodeId> = targets.into_iter().map(|t| t as u64).collect();
            targets.sort_unstable();
            adjacency.insert(node, targets);
        }

        let mut ranking: Vec<u64> = (0..universe).collect();
        ranking.shuffle(&mut rng);

        TestGraph {
            dir,
            universe,
            adjacency,
            ranking,
        }
    }

    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map_or(&[], |list| list.as_slice())
    }

    pub fn build_simple(&self) -> SimpleIndex<EfSequence> {
        let path = self.dir.path().join("simple");
        let mut builder =
            SimpleIndexBuilder::<EfSequence>::create(&path, Options::new(self.universe))
                .expect("could not create the index");
        for node in 0..self.universe {
            let targets = self.neighbors(node);
            if !targets.is_empty() {
                builder.append(node, targets).expect("append failed");
            }
        }
        builder.commit(true).expect("commit failed")
    }

    pub fn build_topk(&self, config: &Configuration) -> TopkIndex<EfSequence> {
        let path = self.dir.path().join("topk");
        let mut builder = TopkIndexBuilder::<EfSequence>::create(
            &path,
            Options::new(self.universe),
            self.ranking.clone(),
            config,
        )
        .expect("could not create the index");
        for node in 0..self.universe {
            let targets = self.neighbors(node);
            if !targets.is_empty() {
                builder.append(node, targets).expect("append failed");
            }
        }
        builder.commit(true).expect("commit failed")
    }
}
