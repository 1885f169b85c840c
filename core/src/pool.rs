use crate::error::PoolError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of long-lived threads draining one shared FIFO queue.
///
/// Each job runs on exactly one worker. `shutdown` stops accepting jobs,
/// lets the workers finish everything already queued, then joins them.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }
        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for n in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("reelsearch-worker-{n}"))
                .spawn(move || run_worker(n, receiver))
                .map_err(|err| PoolError::Spawn(err.to_string()))?;
            workers.push(handle);
        }
        tracing::debug!(size, "worker pool started");
        Ok(Self { sender: Mutex::new(Some(sender)), workers: Mutex::new(workers), size })
    }

    pub fn size(&self) -> usize { self.size }

    /// Queue `job` and return immediately.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(PoolError::ShutDown)?;
        sender.send(Box::new(job)).map_err(|_| PoolError::ShutDown)
    }

    /// Reject new jobs, drain the queue, and join every worker.
    ///
    /// Must not be called from inside a job: the calling worker would wait on itself.
    pub fn shutdown(&self) {
        // dropping the only sender disconnects the channel once it is empty
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::debug!(size = self.size, "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(n: usize, receiver: Receiver<Job>) {
    for job in receiver.iter() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!(worker = n, "job panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn rejects_zero_size() {
        assert_eq!(WorkerPool::new(0).err(), Some(PoolError::InvalidSize));
    }

    #[test]
    fn single_worker_runs_jobs_in_order() {
        let pool = WorkerPool::new(1).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..20 {
            let seen = seen.clone();
            pool.submit(move || seen.lock().push(i)).unwrap();
        }
        pool.shutdown();
        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn shutdown_drains_queued_jobs() {
        let pool = WorkerPool::new(3).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..30 {
            let done = done.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let pool = WorkerPool::new(2).unwrap();
        pool.shutdown();
        assert_eq!(pool.submit(|| {}), Err(PoolError::ShutDown));
        // second shutdown is a no-op
        pool.shutdown();
    }

    #[test]
    fn panicking_job_does_not_stop_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        pool.submit(|| panic!("boom")).unwrap();
        let counter = done.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        drop(pool);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
