//! Thread management utilities.
//!
//! This crate provides:
//! - Named worker threads
//! - A fixed-size worker pool over a bounded queue that runs overflow on the caller
//! - Panic handling utilities

#![warn(missing_docs)]

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Pool errors.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool size must be positive.
    #[error("worker pool size must be greater than 0")]
    ZeroWorkers,

    /// Queue capacity must be positive.
    #[error("worker queue capacity must be greater than 0")]
    ZeroCapacity,

    /// The OS refused to spawn a worker.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A named worker thread that is joined explicitly.
pub struct ManagedThread {
    handle: JoinHandle<()>,
    name: String,
}

impl ManagedThread {
    /// Spawn a new named thread.
    pub fn spawn<F>(name: impl Into<String>, f: F) -> Result<Self, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new().name(name.clone()).spawn(f)?;
        Ok(Self { handle, name })
    }

    /// Wait for the thread to complete.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }

    /// Get the thread name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Terminate,
}

/// Where a submitted task ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Queued for a worker.
    Queued,
    /// The queue was full or closed; the task already ran on the calling thread.
    CallerRan,
}

/// A fixed-size worker pool over a bounded queue.
///
/// When the queue is full, [`BoundedPool::execute`] runs the task on the
/// calling thread instead of dropping it.
pub struct BoundedPool {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    workers: Mutex<Vec<ManagedThread>>,
    closed: AtomicBool,
    capacity: usize,
}

impl BoundedPool {
    /// Create a pool with `size` workers and room for `capacity` queued tasks.
    pub fn new(name: &str, size: usize, capacity: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        let (sender, receiver) = crossbeam_channel::bounded::<Message>(capacity);

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let rx = receiver.clone();
            workers.push(ManagedThread::spawn(format!("{}-{}", name, i), move || {
                worker_loop(rx)
            })?);
        }
        debug!(pool = name, size, capacity, "worker pool started");

        Ok(Self {
            sender,
            receiver,
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
            capacity,
        })
    }

    /// Submit a task. Runs it inline when the queue is full or the pool is shut down.
    pub fn execute<F>(&self, f: F) -> Execution
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            f();
            return Execution::CallerRan;
        }

        match self.sender.try_send(Message::Run(Box::new(f))) {
            Ok(()) => {
                if self.closed.load(Ordering::SeqCst) {
                    // Shutdown finished between the check above and the send.
                    self.run_leftovers();
                }
                Execution::Queued
            }
            Err(err) => {
                if matches!(err, TrySendError::Full(_)) {
                    debug!(capacity = self.capacity, "worker queue saturated, running task on caller");
                }
                if let Message::Run(task) = err.into_inner() {
                    task();
                }
                Execution::CallerRan
            }
        }
    }

    /// Number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// Maximum number of queued tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if the pool has been shut down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drain queued tasks and wait for every worker to exit.
    ///
    /// Later submissions run on the caller. Calling this twice is a no-op.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for _ in 0..workers.len() {
            // Queued after pending work, so every worker drains before it stops.
            if self.sender.send(Message::Terminate).is_err() {
                break;
            }
        }
        for worker in workers {
            let name = worker.name().to_string();
            if worker.join().is_err() {
                warn!(worker = %name, "worker thread panicked during shutdown");
            }
        }

        // Anything that slipped in while the workers were stopping.
        self.run_leftovers();
    }

    fn run_leftovers(&self) {
        while let Ok(message) = self.receiver.try_recv() {
            if let Message::Run(task) = message {
                task();
            }
        }
    }
}

impl Drop for BoundedPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(rx: Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(task) => {
                if let Err(e) = catch_panic(std::panic::AssertUnwindSafe(task)) {
                    warn!(panic = %e, "pool task panicked");
                }
            }
            Message::Terminate => break,
        }
    }
}

/// Catch panics and convert to Result.
pub fn catch_panic<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    std::panic::catch_unwind(f).map_err(|e| panic_message(e.as_ref()))
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
