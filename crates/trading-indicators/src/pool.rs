//! Fixed-size worker pool.
//!
//! Workers drain a shared FIFO guarded by a mutex and sleep on a condition
//! variable while it is empty. Dropping the pool raises the stop flag, wakes
//! every worker and joins them; jobs already queued still run first.

use std::collections::VecDeque;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};
use trading_core::IndicatorError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    stop: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Jobs never run under the lock, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a job submitted with [`WorkerPool::submit`].
pub struct TaskHandle<T> {
    result: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the job finishes.
    ///
    /// Fails if the job panicked.
    pub fn wait(self) -> Result<T, IndicatorError> {
        self.result
            .recv()
            .map_err(|_| IndicatorError::WorkerPool("task panicked before completing".to_string()))
    }
}

/// Pool of long-lived worker threads owned by one indicator engine.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self, IndicatorError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stop: false,
            }),
            available: Condvar::new(),
        });

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(threads.max(1)),
        };
        for id in 0..threads.max(1) {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("indicator-worker-{id}"))
                .spawn(move || worker_loop(&shared, id))
                .map_err(|e| IndicatorError::WorkerPool(e.to_string()))?;
            pool.workers.push(handle);
        }

        debug!(threads = pool.workers.len(), "started indicator worker pool");
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job without waiting for it.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.lock().jobs.push_back(Box::new(job));
        self.shared.available.notify_one();
    }

    /// Queue a job and return a handle to its result.
    pub fn submit<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.execute(move || {
            let _ = tx.send(job());
        });
        TaskHandle { result: rx }
    }

    /// Run `f` once per range on the pool and collect the results in range
    /// order.
    pub fn map_ranges<T, F>(&self, ranges: Vec<Range<usize>>, f: Arc<F>) -> Result<Vec<T>, IndicatorError>
    where
        T: Send + 'static,
        F: Fn(Range<usize>) -> T + Send + Sync + 'static,
    {
        let handles: Vec<TaskHandle<T>> = ranges
            .into_iter()
            .map(|range| {
                let f = Arc::clone(&f);
                self.submit(move || f(range))
            })
            .collect();

        handles.into_iter().map(TaskHandle::wait).collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.lock().stop = true;
        self.shared.available.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("indicator worker exited with a panic");
            }
        }
    }
}

fn worker_loop(shared: &Shared, id: usize) {
    loop {
        let job = {
            let mut queue = shared.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break Some(job);
                }
                if queue.stop {
                    break None;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        match job {
            Some(job) => {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(worker = id, "indicator task panicked");
                }
            }
            None => break,
        }
    }
}

/// Split `0..len` into consecutive ranges of at most `chunk` elements.
pub(crate) fn chunk_ranges(len: usize, chunk: usize) -> Vec<Range<usize>> {
    let chunk = chunk.max(1);
    (0..len)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_submit_returns_result() {
        let pool = WorkerPool::new(2).unwrap();

        let handle = pool.submit(|| 6 * 7);

        assert_eq!(handle.wait().unwrap(), 42);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_map_ranges_preserves_order() {
        let pool = WorkerPool::new(4).unwrap();
        let data: Arc<Vec<u64>> = Arc::new((0..10_000).collect());

        let ranges = chunk_ranges(data.len(), 999);
        let sums = pool
            .map_ranges(ranges.clone(), {
                let data = Arc::clone(&data);
                Arc::new(move |r: Range<usize>| data[r].iter().sum::<u64>())
            })
            .unwrap();

        assert_eq!(sums.len(), ranges.len());
        let expected: Vec<u64> = ranges.iter().map(|r| data[r.clone()].iter().sum()).collect();
        assert_eq!(sums, expected);
    }

    #[test]
    fn test_panicking_task_reports_error_and_pool_survives() {
        let pool = WorkerPool::new(1).unwrap();

        let failed = pool.submit(|| -> u32 { panic!("boom") });
        assert!(matches!(failed.wait(), Err(IndicatorError::WorkerPool(_))));

        assert_eq!(pool.submit(|| 1u32).wait().unwrap(), 1);
    }

    #[test]
    fn test_drop_runs_queued_jobs_and_joins() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(3).unwrap();
            for _ in 0..100 {
                let counter = Arc::clone(&counter);
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }

        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_chunk_ranges() {
        assert_eq!(chunk_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(3, 0), vec![0..1, 1..2, 2..3]);
    }
}
