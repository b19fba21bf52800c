//! Batched query evaluation: queries are solved on worker threads and
//! their results written out in submission order, optionally checked
//! against precomputed answers.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::error;

use crate::base::NodeId;
use crate::config::Configuration;
use crate::queues::{Job, JobQueue, OrderedQueue};

/// One query of a batch: source node and id range, with an optional
/// expected answer to verify against
pub struct QueryRecord {
    pub id: u64,
    pub source: NodeId,
    pub l: NodeId,
    pub r: NodeId,
    pub expected: Option<Vec<NodeId>>,
}

struct QueryJob<F, W> {
    solve: Arc<F>,
    out: Arc<Mutex<W>>,
    mismatches: Arc<AtomicU64>,
    query: QueryRecord,
    rendered: String,
}

impl<F, W> Job for QueryJob<F, W>
where
    F: Fn(&QueryRecord) -> Vec<NodeId> + Send + Sync + 'static,
    W: Write + Send + 'static,
{
    fn prepare(&mut self) {
        let started = Instant::now();
        let result = (self.solve)(&self.query);
        let nanos = started.elapsed().as_nanos();

        if let Some(expected) = &self.query.expected {
            if &result != expected {
                error!(
                    "query {}: got {:?}, expected {:?}",
                    self.query.id, result, expected
                );
                self.mismatches.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.rendered = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            self.query.id,
            self.query.source,
            self.query.l,
            self.query.r,
            result.len(),
            nanos
        );
    }

    fn commit(&mut self) {
        let mut out = self.out.lock().expect("output poisoned");
        out.write_all(self.rendered.as_bytes())
            .expect("failed to write a query result");
    }
}

/// Runs queries through a bounded pool and reports them in the order
/// they were submitted
pub struct BatchRunner<F, W> {
    solve: Arc<F>,
    out: Arc<Mutex<W>>,
    mismatches: Arc<AtomicU64>,
    queue: OrderedQueue,
}

impl<F, W> BatchRunner<F, W>
where
    F: Fn(&QueryRecord) -> Vec<NodeId> + Send + Sync + 'static,
    W: Write + Send + 'static,
{
    pub fn new(solve: F, out: W, config: &Configuration) -> Self {
        BatchRunner {
            solve: Arc::new(solve),
            out: Arc::new(Mutex::new(out)),
            mismatches: Arc::new(AtomicU64::new(0)),
            queue: OrderedQueue::new(config),
        }
    }

    pub fn run(&mut self, query: QueryRecord) {
        // Range width is the best work proxy available before solving
        let work = (query.r.saturating_sub(query.l)).max(1);
        self.queue.add_job(
            Box::new(QueryJob {
                solve: Arc::clone(&self.solve),
                out: Arc::clone(&self.out),
                mismatches: Arc::clone(&self.mismatches),
                query,
                rendered: String::new(),
            }),
            work,
        );
    }

    /// Waits for every pending query; returns how many verified queries
    /// did not match their expected answer
    pub fn complete(&mut self) -> u64 {
        self.queue.complete();
        self.mismatches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(id: u64, source: NodeId, l: NodeId, r: NodeId, expected: Option<Vec<NodeId>>) -> QueryRecord {
        QueryRecord {
            id,
            source,
            l,
            r,
            expected,
        }
    }

    #[test]
    fn test_results_in_submission_order() {
        let config = Configuration {
            worker_threads: 3,
            work_per_thread: 1,
            ..Configuration::default()
        };
        let mut runner = BatchRunner::new(
            |q: &QueryRecord| (q.l..q.r).collect(),
            Vec::new(),
            &config,
        );

        for id in 0..20 {
            runner.run(query(id, 0, 0, id + 1, None));
        }
        assert_eq!(runner.complete(), 0);

        let out = String::from_utf8(
            Arc::try_unwrap(runner.out).ok().unwrap().into_inner().unwrap(),
        )
        .unwrap();
        let ids: Vec<u64> = out
            .lines()
            .map(|line| line.split('\t').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(ids, (0..20).collect::<Vec<u64>>());
    }

    #[test]
    fn test_counts_mismatches() {
        let config = Configuration {
            worker_threads: 2,
            ..Configuration::default()
        };
        let mut runner = BatchRunner::new(
            |q: &QueryRecord| (q.l..q.r).collect(),
            std::io::sink(),
            &config,
        );

        runner.run(query(0, 0, 2, 5, Some(vec![2, 3, 4])));
        runner.run(query(1, 0, 2, 5, Some(vec![2, 3])));
        runner.run(query(2, 0, 0, 1, None));
        assert_eq!(runner.complete(), 1);
    }

    #[test]
    fn test_rendered_fields() {
        let config = Configuration {
            worker_threads: 0,
            ..Configuration::default()
        };
        let mut runner =
            BatchRunner::new(|_: &QueryRecord| vec![7, 8], Vec::new(), &config);
        runner.run(query(3, 9, 1, 4, None));
        runner.complete();

        let out = String::from_utf8(
            Arc::try_unwrap(runner.out).ok().unwrap().into_inner().unwrap(),
        )
        .unwrap();
        let fields: Vec<&str> = out.trim_end().split('\t').collect();
        assert_eq!(&fields[..5], &["3", "9", "1", "4", "2"]);
        assert_eq!(fields.len(), 6);
    }
}
