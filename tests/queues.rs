use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ntest::timeout;
use rstest::rstest;

use hop_index::config::{Configuration, QueueKind};
use hop_index::queues::{new_queue, Job, JobQueue, OrderedQueue, UnorderedSingleQueue};

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct SleepJob {
    id: u64,
    millis: u64,
    log: Arc<Mutex<Vec<u64>>>,
}

impl Job for SleepJob {
    fn prepare(&mut self) {
        std::thread::sleep(Duration::from_millis(self.millis));
    }

    fn commit(&mut self) {
        self.log.lock().unwrap().push(self.id);
    }
}

struct CountJob {
    counter: Arc<AtomicU64>,
}

impl Job for CountJob {
    fn prepare(&mut self) {}

    fn commit(&mut self) {
        self.counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct TimedJob {
    millis: u64,
    counter: Arc<AtomicU64>,
}

impl Job for TimedJob {
    fn prepare(&mut self) {
        std::thread::sleep(Duration::from_millis(self.millis));
    }

    fn commit(&mut self) {
        self.counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct EagerJob {
    prepared: Arc<AtomicU64>,
}

impl Job for EagerJob {
    fn prepare(&mut self) {
        self.prepared.fetch_add(1, Ordering::Relaxed);
    }

    fn commit(&mut self) {}
}

struct PanicJob;

impl Job for PanicJob {
    fn prepare(&mut self) {
        panic!("boom");
    }

    fn commit(&mut self) {
        unreachable!("a panicked job must never commit");
    }
}

fn config(kind: QueueKind, workers: usize) -> Configuration {
    Configuration {
        worker_threads: workers,
        queue_kind: kind,
        work_per_thread: 1,
        ..Configuration::default()
    }
}

#[rstest]
#[case(QueueKind::Ordered)]
#[case(QueueKind::UnorderedSingle)]
#[case(QueueKind::UnorderedMulti)]
fn test_commits_every_job(#[case] kind: QueueKind) {
    init_logger();
    let counter = Arc::new(AtomicU64::new(0));

    let mut queue = new_queue(&config(kind, 4));
    for _ in 0..200 {
        queue.add_job(
            Box::new(CountJob {
                counter: Arc::clone(&counter),
            }),
            1,
        );
    }
    queue.complete();
    assert_eq!(counter.load(Ordering::Relaxed), 200);

    // complete is idempotent
    queue.complete();
    assert_eq!(counter.load(Ordering::Relaxed), 200);
}

#[rstest]
#[case(QueueKind::Ordered)]
#[case(QueueKind::UnorderedSingle)]
#[case(QueueKind::UnorderedMulti)]
fn test_zero_workers_run_inline(#[case] kind: QueueKind) {
    init_logger();
    let counter = Arc::new(AtomicU64::new(0));

    let mut queue = new_queue(&config(kind, 0));
    for i in 0..10 {
        queue.add_job(
            Box::new(CountJob {
                counter: Arc::clone(&counter),
            }),
            1,
        );
        // Inline queues commit before add_job returns
        assert_eq!(counter.load(Ordering::Relaxed), i + 1);
    }
    queue.complete();
}

#[rstest]
#[case(QueueKind::Ordered)]
#[case(QueueKind::UnorderedSingle)]
#[case(QueueKind::UnorderedMulti)]
fn test_full_batch_dispatches_before_complete(#[case] kind: QueueKind) {
    init_logger();
    let prepared = Arc::new(AtomicU64::new(0));

    // work_per_thread is 1, so a single unit of work fills a batch
    let mut queue = new_queue(&config(kind, 2));
    queue.add_job(
        Box::new(EagerJob {
            prepared: Arc::clone(&prepared),
        }),
        1,
    );

    let started = Instant::now();
    while prepared.load(Ordering::Relaxed) == 0 && started.elapsed() < Duration::from_secs(2) {
        std::thread::yield_now();
    }
    assert_eq!(prepared.load(Ordering::Relaxed), 1, "batch held until complete");
    queue.complete();
}

#[test]
#[timeout(10_000)]
fn test_ordered_commit_order() {
    init_logger();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut queue = OrderedQueue::new(&config(QueueKind::Ordered, 4));
    for id in 0..100 {
        queue.add_job(
            Box::new(SleepJob {
                id,
                millis: (id * 7) % 3,
                log: Arc::clone(&log),
            }),
            1,
        );
    }
    queue.complete();

    assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<u64>>());
}

#[test]
#[timeout(5_000)]
fn test_ordered_prepares_in_parallel() {
    init_logger();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut queue = OrderedQueue::new(&config(QueueKind::Ordered, 4));
    let started = Instant::now();
    for (id, millis) in [(0, 50u64), (1, 60), (2, 50), (3, 60)] {
        queue.add_job(
            Box::new(SleepJob {
                id,
                millis,
                log: Arc::clone(&log),
            }),
            1,
        );
    }
    queue.complete();

    // Four jobs of 50-60ms on four threads must beat their serial time
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
#[timeout(5_000)]
fn test_unordered_wall_clock_is_longest_job() {
    init_logger();
    let counter = Arc::new(AtomicU64::new(0));

    let mut queue = UnorderedSingleQueue::new(&config(QueueKind::UnorderedSingle, 4));
    let started = Instant::now();
    for millis in [10u64, 20, 10, 30] {
        let counter = Arc::clone(&counter);
        queue.add_job(
            Box::new(TimedJob { millis, counter }),
            1,
        );
    }
    queue.complete();

    // Four workers run the 10/20/10/30ms jobs concurrently, so the batch
    // takes about as long as the longest job
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(counter.load(Ordering::Relaxed), 4);
}

#[test]
#[timeout(10_000)]
fn test_unordered_single_survives_panics() {
    init_logger();
    let counter = Arc::new(AtomicU64::new(0));
    let messages = Arc::new(Mutex::new(Vec::new()));

    let mut queue = UnorderedSingleQueue::new(&config(QueueKind::UnorderedSingle, 2));
    let handler_messages = Arc::clone(&messages);
    queue.set_panic_handler(Box::new(move |message| {
        handler_messages.lock().unwrap().push(message.to_string());
    }));

    for i in 0..50 {
        if i == 10 || i == 30 {
            queue.add_job(Box::new(PanicJob), 1);
        } else {
            queue.add_job(
                Box::new(CountJob {
                    counter: Arc::clone(&counter),
                }),
                1,
            );
        }
    }
    queue.complete();

    assert_eq!(counter.load(Ordering::Relaxed), 48);
    assert_eq!(*messages.lock().unwrap(), vec!["boom", "boom"]);
}
