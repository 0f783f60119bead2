use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::debug;

use crate::error::{ParseError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Number of workers a pool gets when none is requested: half the logical cores, at least one
#[must_use]
pub fn default_pool_size() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// A fixed-size pool of worker threads
///
/// Tasks are queued with [`WorkerPool::submit`] and run by whichever worker is free.
/// Every task answers on its own [`TaskHandle`], so results can be collected in
/// submission order no matter in which order the tasks finish.
///
/// Dropping the pool closes the task queue and joins every worker, so all queued
/// tasks have run by the time `drop` returns.
///
/// # Examples
///
/// ```rust
/// use pairflag::parallel::WorkerPool;
///
/// let mut pool = WorkerPool::new(2);
/// let handles: Vec<_> = (0..4u64).map(|i| pool.submit(move || i * i)).collect();
/// let squares: Vec<u64> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// ```
pub struct WorkerPool {
    /// Sending half of the task queue (taken on drop to close the queue)
    sender: Option<Sender<Job>>,

    /// Worker thread handles
    handles: Vec<JoinHandle<()>>,

    /// Index given to the next submitted task
    next_task: usize,
}
impl WorkerPool {
    /// Spawns a pool of `num_threads` workers
    ///
    /// A `num_threads` of zero uses [`default_pool_size`].
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            default_pool_size()
        } else {
            num_threads
        };

        let (sender, receiver) = unbounded::<Job>();
        let handles = (0..num_threads)
            .map(|_| {
                let receiver = receiver.clone();
                thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })
            })
            .collect();

        debug!("started worker pool with {num_threads} threads");
        Self {
            sender: Some(sender),
            handles,
            next_task: 0,
        }
    }

    /// Number of worker threads
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    /// Queues a task and returns the handle its result will arrive on
    pub fn submit<T, F>(&mut self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let index = self.next_task;
        self.next_task += 1;

        let (tx, rx) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task)).ok();
            // the handle may have been dropped without waiting
            let _ = tx.send(outcome);
        });

        if let Some(sender) = &self.sender {
            // workers only exit once the sender is gone, so the queue is open here
            let _ = sender.send(job);
        }
        TaskHandle { index, rx }
    }
}
impl Drop for WorkerPool {
    fn drop(&mut self) {
        // close the queue, then let the workers drain it
        drop(self.sender.take());
        for handle in self.handles.drain(..) {
            // tasks are unwound inside the job, a worker itself never panics
            let _ = handle.join();
        }
        debug!("worker pool shut down after {} tasks", self.next_task);
    }
}

/// The pending result of a task submitted to a [`WorkerPool`]
pub struct TaskHandle<T> {
    index: usize,
    rx: Receiver<Option<T>>,
}
impl<T> TaskHandle<T> {
    /// Submission index of the task within its pool
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Blocks until the task has run and returns its output
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::WorkerPanicked`] if the task panicked.
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(Some(output)) => Ok(output),
            Ok(None) | Err(_) => Err(ParseError::WorkerPanicked(self.index).into()),
        }
    }
}

#[cfg(test)]
mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_pool_size_is_positive() {
        assert!(default_pool_size() >= 1);
        assert_eq!(WorkerPool::new(0).num_threads(), default_pool_size());
    }

    #[test]
    fn test_results_in_submission_order() {
        let mut pool = WorkerPool::new(4);
        // earlier tasks sleep longer so they finish last
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(5 * (8 - i)));
                    i
                })
            })
            .collect();
        let out: Vec<u64> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(out, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_runs_all_queued_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut pool = WorkerPool::new(2);
            for _ in 0..20 {
                let counter = Arc::clone(&counter);
                pool.submit(move || counter.fetch_add(1, Ordering::Relaxed));
            }
        }
        assert_eq!(counter.load(Ordering::Relaxed), 20);
    }

    #[test]
    fn test_panicking_task_is_reported() {
        let mut pool = WorkerPool::new(1);
        let bad = pool.submit(|| -> u8 { panic!("boom") });
        let good = pool.submit(|| 7u8);
        assert_eq!(bad.index(), 0);
        assert!(matches!(
            bad.wait(),
            Err(crate::Error::ParseError(ParseError::WorkerPanicked(0)))
        ));
        // the worker survives the panic
        assert_eq!(good.wait().unwrap(), 7);
    }
}
