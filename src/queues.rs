//! Job pipelines used to parallelize index construction and batch queries.
//!
//! A [`Job`] splits its work in two phases: `prepare` runs on a worker
//! thread and must not touch shared output state, `commit` applies the
//! side effects. The queue implementations differ in how commits are
//! scheduled; with zero worker threads every queue degenerates to running
//! jobs inline on the caller thread.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use log::{debug, error};

use crate::config::{Configuration, QueueKind};

pub trait Job: Send {
    /// Heavy part of the work; runs concurrently with other prepares
    fn prepare(&mut self);

    /// Applies the result; scheduling guarantees depend on the queue
    fn commit(&mut self);
}

pub trait JobQueue {
    fn add_job(&mut self, job: Box<dyn Job>, expected_work: u64);

    /// Blocks until every added job has committed. Idempotent.
    fn complete(&mut self);
}

pub fn new_queue(config: &Configuration) -> Box<dyn JobQueue> {
    match config.queue_kind {
        QueueKind::Ordered => Box::new(OrderedQueue::new(config)),
        QueueKind::UnorderedSingle => Box::new(UnorderedSingleQueue::new(config)),
        QueueKind::UnorderedMulti => Box::new(UnorderedMultiQueue::new(config)),
    }
}

/// Batches jobs by expected work; each batch is prepared on its own thread
/// and committed by a single background thread, strictly in submission
/// order.
pub struct OrderedQueue {
    max_threads: usize,
    work_per_thread: u64,
    next_batch: Vec<Box<dyn Job>>,
    expected_work: u64,
    preparing: VecDeque<JoinHandle<Vec<Box<dyn Job>>>>,
    committing: Option<JoinHandle<()>>,
}

impl OrderedQueue {
    pub fn new(config: &Configuration) -> Self {
        debug!(
            "ordered queue using {} worker threads ({} work per thread)",
            config.worker_threads, config.work_per_thread
        );
        OrderedQueue {
            max_threads: config.worker_threads,
            work_per_thread: config.work_per_thread,
            next_batch: Vec::new(),
            expected_work: 0,
            preparing: VecDeque::new(),
            committing: None,
        }
    }

    fn spawn_next_batch(&mut self) {
        if self.preparing.len() >= self.max_threads {
            self.commit_oldest();
        }

        let mut batch = std::mem::take(&mut self.next_batch);
        self.expected_work = 0;
        self.preparing.push_back(std::thread::spawn(move || {
            for job in batch.iter_mut() {
                job.prepare();
            }
            batch
        }));
    }

    fn wait_commit(&mut self) {
        if let Some(handle) = self.committing.take() {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }

    fn commit_oldest(&mut self) {
        self.wait_commit();

        if let Some(handle) = self.preparing.pop_front() {
            match handle.join() {
                Ok(mut batch) => {
                    self.committing = Some(std::thread::spawn(move || {
                        for job in batch.iter_mut() {
                            job.commit();
                        }
                    }));
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    }
}

impl JobQueue for OrderedQueue {
    fn add_job(&mut self, mut job: Box<dyn Job>, expected_work: u64) {
        if self.max_threads == 0 {
            job.prepare();
            job.commit();
            return;
        }

        self.next_batch.push(job);
        self.expected_work += expected_work;
        if self.expected_work >= self.work_per_thread {
            self.spawn_next_batch();
        }
    }

    fn complete(&mut self) {
        if !self.next_batch.is_empty() {
            self.spawn_next_batch();
        }
        while !self.preparing.is_empty() {
            self.commit_oldest();
        }
        self.wait_commit();
    }
}

impl Drop for OrderedQueue {
    fn drop(&mut self) {
        self.complete();
    }
}

pub type PanicHandler = Box<dyn Fn(&str) + Send + Sync>;

struct SingleInner {
    tasks: VecDeque<Box<dyn Job>>,
    num_tasks: usize,
    shutdown: bool,
}

struct SingleShared {
    inner: Mutex<SingleInner>,
    task_available: Condvar,
    task_completed: Condvar,
    commit_lock: Mutex<()>,
    panic_handler: Mutex<Option<PanicHandler>>,
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "opaque panic payload"
    }
}

fn single_worker_loop(shared: Arc<SingleShared>) {
    loop {
        let job = {
            let mut inner = shared.inner.lock().unwrap();
            loop {
                if let Some(job) = inner.tasks.pop_front() {
                    break Some(job);
                }
                if inner.shutdown {
                    break None;
                }
                inner = shared.task_available.wait(inner).unwrap();
            }
        };

        let mut job = match job {
            Some(job) => job,
            None => return,
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| job.prepare())).and_then(|_| {
            let _guard = shared.commit_lock.lock().unwrap();
            catch_unwind(AssertUnwindSafe(|| job.commit()))
        });

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            error!("job panicked: {}", message);
            if let Some(handler) = shared.panic_handler.lock().unwrap().as_ref() {
                handler(message);
            }
        }

        let mut inner = shared.inner.lock().unwrap();
        inner.num_tasks = inner.num_tasks.saturating_sub(1);
        drop(inner);
        shared.task_completed.notify_all();
    }
}

/// Fixed worker pool over a shared FIFO; each job is prepared and then
/// committed under a global commit lock, with no ordering guarantee
/// between jobs. A panicking job is reported and dropped, the pool keeps
/// running.
pub struct UnorderedSingleQueue {
    shared: Arc<SingleShared>,
    workers: Vec<JoinHandle<()>>,
}

impl UnorderedSingleQueue {
    pub fn new(config: &Configuration) -> Self {
        debug!(
            "unordered single queue using {} worker threads",
            config.worker_threads
        );

        let shared = Arc::new(SingleShared {
            inner: Mutex::new(SingleInner {
                tasks: VecDeque::new(),
                num_tasks: 0,
                shutdown: false,
            }),
            task_available: Condvar::new(),
            task_completed: Condvar::new(),
            commit_lock: Mutex::new(()),
            panic_handler: Mutex::new(None),
        });

        let workers = (0..config.worker_threads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || single_worker_loop(shared))
            })
            .collect();

        UnorderedSingleQueue { shared, workers }
    }

    /// Called with the panic message whenever a job panics on a worker
    pub fn set_panic_handler(&self, handler: PanicHandler) {
        *self.shared.panic_handler.lock().unwrap() = Some(handler);
    }
}

impl JobQueue for UnorderedSingleQueue {
    fn add_job(&mut self, mut job: Box<dyn Job>, _expected_work: u64) {
        if self.workers.is_empty() {
            job.prepare();
            job.commit();
            return;
        }

        {
            let mut inner = self.shared.inner.lock().unwrap();
            while inner.num_tasks == self.workers.len() {
                inner = self.shared.task_completed.wait(inner).unwrap();
            }
            inner.tasks.push_back(job);
            inner.num_tasks += 1;
        }
        self.shared.task_available.notify_one();
    }

    fn complete(&mut self) {
        let mut inner = self.shared.inner.lock().unwrap();
        while inner.num_tasks > 0 {
            inner = self.shared.task_completed.wait(inner).unwrap();
        }
    }
}

impl Drop for UnorderedSingleQueue {
    fn drop(&mut self) {
        self.complete();
        self.shared.inner.lock().unwrap().shutdown = true;
        self.shared.task_available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

struct MultiState {
    num_tasks: usize,
    running: Vec<bool>,
}

struct MultiShared {
    state: Mutex<MultiState>,
    task_completed: Condvar,
}

struct Slot {
    pending: Vec<Box<dyn Job>>,
    prepared: Option<JoinHandle<Vec<Box<dyn Job>>>>,
}

/// One batch slot per worker; a full batch is prepared on its own thread
/// and committed on the producer thread when the slot is reused or the
/// queue completes. Commit order is not the submission order.
pub struct UnorderedMultiQueue {
    shared: Arc<MultiShared>,
    slots: Vec<Slot>,
    free_slot: Option<usize>,
    expected_work: u64,
    work_per_thread: u64,
}

impl UnorderedMultiQueue {
    pub fn new(config: &Configuration) -> Self {
        debug!(
            "unordered multi queue using {} worker threads ({} work per thread)",
            config.worker_threads, config.work_per_thread
        );

        UnorderedMultiQueue {
            shared: Arc::new(MultiShared {
                state: Mutex::new(MultiState {
                    num_tasks: 0,
                    running: vec![false; config.worker_threads],
                }),
                task_completed: Condvar::new(),
            }),
            slots: (0..config.worker_threads)
                .map(|_| Slot {
                    pending: Vec::new(),
                    prepared: None,
                })
                .collect(),
            free_slot: None,
            expected_work: 0,
            work_per_thread: config.work_per_thread,
        }
    }

    fn find_free_slot(&mut self) -> usize {
        if let Some(slot) = self.free_slot {
            return slot;
        }

        let slot = {
            let mut state = self.shared.state.lock().unwrap();
            while state.num_tasks == self.slots.len() {
                state = self.shared.task_completed.wait(state).unwrap();
            }
            state
                .running
                .iter()
                .position(|&running| !running)
                .expect("a slot must be idle when num_tasks < slots")
        };

        // The slot may still hold the prepared jobs of its previous batch
        self.commit_slot(slot);
        self.free_slot = Some(slot);
        slot
    }

    fn commit_slot(&mut self, slot: usize) {
        if let Some(handle) = self.slots[slot].prepared.take() {
            match handle.join() {
                Ok(mut jobs) => {
                    for job in jobs.iter_mut() {
                        job.commit();
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    }

    fn dispatch(&mut self, slot: usize) {
        let mut batch = std::mem::take(&mut self.slots[slot].pending);
        {
            let mut state = self.shared.state.lock().unwrap();
            state.num_tasks += 1;
            state.running[slot] = true;
        }

        let shared = Arc::clone(&self.shared);
        self.slots[slot].prepared = Some(std::thread::spawn(move || {
            for job in batch.iter_mut() {
                job.prepare();
            }

            let mut state = shared.state.lock().unwrap();
            state.num_tasks -= 1;
            state.running[slot] = false;
            drop(state);
            shared.task_completed.notify_all();

            batch
        }));

        self.expected_work = 0;
        self.free_slot = None;
    }
}

impl JobQueue for UnorderedMultiQueue {
    fn add_job(&mut self, mut job: Box<dyn Job>, expected_work: u64) {
        if self.slots.is_empty() {
            job.prepare();
            job.commit();
            return;
        }

        let slot = self.find_free_slot();
        self.slots[slot].pending.push(job);
        self.expected_work += expected_work;

        if self.expected_work >= self.work_per_thread {
            self.dispatch(slot);
        }
    }

    fn complete(&mut self) {
        if let Some(slot) = self.free_slot {
            if !self.slots[slot].pending.is_empty() {
                self.dispatch(slot);
            }
        }

        {
            let mut state = self.shared.state.lock().unwrap();
            while state.num_tasks > 0 {
                state = self.shared.task_completed.wait(state).unwrap();
            }
        }

        for slot in 0..self.slots.len() {
            self.commit_slot(slot);
        }
    }
}

impl Drop for UnorderedMultiQueue {
    fn drop(&mut self) {
        self.complete();
    }
}
