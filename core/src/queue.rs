//! Fixed pool of worker threads draining one FIFO of tasks.
//!
//! Every submitted task bumps a pending counter that only drops once the task
//! has finished, successfully or not. `await_idle` waits for that counter to
//! reach zero, which includes tasks submitted by other tasks while waiting.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const DEFAULT_THREADS: usize = 5;

type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

#[derive(Default)]
struct Tasks {
    queue: VecDeque<Task>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    tasks: Mutex<Tasks>,
    available: Condvar,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Shared {
    fn submit(&self, task: Task) {
        let mut tasks = self.tasks.lock();
        if tasks.shutdown {
            tracing::warn!("task submitted after shutdown, dropping it");
            return;
        }
        // count before enqueueing so a waiter never sees zero in between
        *self.pending.lock() += 1;
        tasks.queue.push_back(task);
        self.available.notify_one();
    }

    fn await_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            tracing::trace!(pending = *pending, "waiting for tasks to finish");
            self.idle.wait(&mut pending);
        }
    }

    fn stop(&self) {
        self.tasks.lock().shutdown = true;
        self.available.notify_all();
    }

    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Next task, or `None` once shutdown was requested and the queue is empty.
    fn next(&self) -> Option<Task> {
        let mut tasks = self.tasks.lock();
        loop {
            if let Some(task) = tasks.queue.pop_front() {
                return Some(task);
            }
            if tasks.shutdown {
                return None;
            }
            self.available.wait(&mut tasks);
        }
    }
}

/// Decrements pending when dropped, whatever way the task ended.
struct PendingGuard<'a>(&'a Shared);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

fn work(name: &str, shared: &Shared) {
    while let Some(task) = shared.next() {
        let _pending = PendingGuard(shared);
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(worker = name, error = %format!("{err:#}"), "task failed"),
            Err(_) => tracing::warn!(worker = name, "task panicked"),
        }
    }
    tracing::debug!(worker = name, "worker terminating");
}

/// Cloneable handle for submitting work, usable from inside tasks.
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.shared.submit(Box::new(task));
    }

    /// Must not be called from a worker of the same queue.
    pub fn await_idle(&self) {
        self.shared.await_idle();
    }

    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }
}

pub struct TaskQueue {
    spawner: Spawner,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Starts `threads` workers; zero is treated as one.
    pub fn new(threads: usize) -> Self {
        let shared = Arc::new(Shared::default());
        let threads = threads.max(1);
        let workers = (0..threads)
            .map(|i| {
                let shared = Arc::clone(&shared);
                let name = format!("worker-{i}");
                thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || work(&name, &shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        tracing::debug!(threads, "task queue started");
        Self { spawner: Spawner { shared }, workers: Mutex::new(workers) }
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.spawner.submit(task);
    }

    pub fn await_idle(&self) {
        self.spawner.await_idle();
    }

    /// Asks workers to exit once the queue drains. Does not block.
    pub fn stop(&self) {
        tracing::debug!("task queue shutting down");
        self.spawner.shared.stop();
    }

    /// Waits for all work, stops, and joins every worker. Submissions made
    /// after this are dropped.
    pub fn stop_and_wait(&self) {
        self.await_idle();
        self.stop();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::debug!("all worker threads terminated");
    }

    pub fn pending(&self) -> usize {
        self.spawner.pending()
    }

    /// Tasks submitted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.spawner.shared.tasks.lock().queue.len()
    }

    /// Number of worker threads still owned by the queue.
    pub fn size(&self) -> usize {
        self.workers.lock().len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_THREADS)
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.stop_and_wait();
    }
}
