//! Single-threaded cooperative delayed-task queue.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// Bound on waiting for the worker to confirm a stop request.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

type OnceTask = Box<dyn FnOnce() + Send>;

/// A repeating job returns the delay until its next run, or `None` to
/// stop rescheduling itself.
type RepeatingTask = Box<dyn FnMut() -> Option<Duration> + Send>;

enum Job {
    Once(OnceTask),
    Repeating(RepeatingTask),
}

struct Entry {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed so the BinaryHeap pops the earliest due time first.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    cv: Condvar,
}

/// A queue executing posted tasks on one owned worker thread.
///
/// Tasks run strictly one at a time in due-time order. Repeating tasks
/// re-arm themselves cooperatively by returning their next delay.
/// Stopping is a posted request: the caller blocks, bounded, until the
/// worker confirms it has wound down.
pub struct TaskQueue {
    shared: Arc<Shared>,
    done_rx: Receiver<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Spawn the worker thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            cv: Condvar::new(),
        });

        let (done_tx, done_rx) = bounded(1);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || {
            run_worker(&worker_shared);
            let _ = done_tx.send(());
        });

        Self {
            shared,
            done_rx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Post a task for immediate execution.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.post_delayed(Duration::ZERO, task);
    }

    /// Post a task to run after `delay`.
    pub fn post_delayed(&self, delay: Duration, task: impl FnOnce() + Send + 'static) {
        self.push(delay, Job::Once(Box::new(task)));
    }

    /// Post a self-rescheduling task. Each run returns the delay until
    /// the next, or `None` to stop.
    pub fn post_repeating(
        &self,
        initial_delay: Duration,
        task: impl FnMut() -> Option<Duration> + Send + 'static,
    ) {
        self.push(initial_delay, Job::Repeating(Box::new(task)));
    }

    fn push(&self, delay: Duration, job: Job) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            debug!("Task posted after shutdown, dropping");
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry {
            due: Instant::now() + delay,
            seq,
            job,
        });
        drop(state);
        self.shared.cv.notify_one();
    }

    /// Request shutdown and wait for the worker to confirm, bounded by
    /// `timeout`. Returns whether the worker stopped in time.
    pub fn stop(&self, timeout: Duration) -> bool {
        if self.worker.lock().is_none() {
            return true;
        }

        self.shared.state.lock().shutdown = true;
        self.shared.cv.notify_all();

        if self.done_rx.recv_timeout(timeout).is_err() {
            warn!(?timeout, "Task queue did not confirm stop in time");
            return false;
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        true
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.stop(STOP_TIMEOUT);
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let mut state = shared.state.lock();
        if state.shutdown {
            break;
        }

        let now = Instant::now();
        match state.heap.peek().map(|e| e.due) {
            None => {
                shared.cv.wait(&mut state);
            }
            Some(due) if due > now => {
                shared.cv.wait_for(&mut state, due - now);
            }
            Some(_) => {
                if let Some(entry) = state.heap.pop() {
                    let seq = entry.seq;
                    drop(state);
                    match entry.job {
                        Job::Once(task) => task(),
                        Job::Repeating(mut task) => {
                            if let Some(delay) = task() {
                                let mut state = shared.state.lock();
                                if !state.shutdown {
                                    state.heap.push(Entry {
                                        due: Instant::now() + delay,
                                        seq,
                                        job: Job::Repeating(task),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    debug!("Task queue worker stopped");
}
