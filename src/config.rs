//! Runtime configuration, read once from the environment and passed down
//! explicitly to builders, queues and solvers.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Ordered,
    UnorderedSingle,
    UnorderedMulti,
}

impl FromStr for QueueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(QueueKind::Ordered),
            "unordered_single" => Ok(QueueKind::UnorderedSingle),
            "unordered_multi" => Ok(QueueKind::UnorderedMulti),
            other => Err(format!("unknown queue implementation {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Configuration {
    /// Number of worker threads; 0 runs every job inline
    pub worker_threads: usize,
    pub queue_kind: QueueKind,
    /// Amount of expected work accumulated in a batch before a worker is spawned
    pub work_per_thread: u64,
    /// Range length at or below which a ranked cursor decodes the whole
    /// range instead of querying its range-maximum structure
    pub topk_scan_threshold: u64,
    /// Candidate lists shorter than this are resolved by WAND instead of RMQ
    pub rmq_wand_threshold: u64,
    /// Number of scores accumulated in a bucket before its tree is frozen
    pub rmq_bucket_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_kind: QueueKind::Ordered,
            work_per_thread: 1 << 24,
            topk_scan_threshold: 10,
            rmq_wand_threshold: 1000,
            rmq_bucket_size: 1 << 20,
        }
    }
}

impl Configuration {
    pub fn from_env() -> Self {
        let defaults = Configuration::default();
        Configuration {
            worker_threads: env_or("HOP_THREADS", defaults.worker_threads),
            queue_kind: env_or("HOP_QUEUE", defaults.queue_kind),
            work_per_thread: env_or("HOP_WORK_PER_THREAD", defaults.work_per_thread),
            topk_scan_threshold: env_or("HOP_TOPK_SCAN_THRESHOLD", defaults.topk_scan_threshold),
            rmq_wand_threshold: env_or("HOP_RMQ_WAND_THRESHOLD", defaults.rmq_wand_threshold),
            rmq_bucket_size: env_or("HOP_RMQ_BUCKET_SIZE", defaults.rmq_bucket_size),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value.parse().unwrap_or(default),
        _ => default,
    }
}
