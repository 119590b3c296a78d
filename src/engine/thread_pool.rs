// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-size worker pool, the default executor.
//!
//! # Architecture Overview
//!
//! Tasks go through a single `mpsc` channel whose receiver is shared by the
//! workers behind a mutex: whichever idle worker takes the lock first runs the
//! next task. There is no work stealing and no priority; the kernel already
//! guarantees that one node is never in more than one task at a time, so a plain
//! FIFO is enough.
//!
//! # Shutdown
//!
//! [`ThreadPoolExecutor::shutdown`] drops the sender. Workers finish the tasks
//! already queued and then exit; `execute` returns a `StateViolation` from then
//! on. [`ThreadPoolExecutor::join`] waits for them, skipping the calling thread
//! if it is itself a worker.
//!
//! # Panics
//!
//! Actions that panic are caught by the kernel and turned into node failures.
//! A raw task that panics is caught here and logged, and the worker keeps going.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::DEFAULT_THREAD_NAME;
use crate::errors::FlowError;
use crate::observability::messages::executor::{
    ExecutorCreated, ExecutorShutdown, WorkerPanicked, WorkerStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Executor, Task};

pub struct ThreadPoolExecutor {
    label: &'static str,
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    size: usize,
}

impl ThreadPoolExecutor {
    /// A pool of `workers` threads named `<thread_name>-<n>`.
    pub fn new(workers: usize, thread_name: &str) -> std::io::Result<Self> {
        Self::spawn("thread_pool", workers.max(1), thread_name)
    }

    /// One thread per available core.
    pub fn with_default_size() -> std::io::Result<Self> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(workers, DEFAULT_THREAD_NAME)
    }

    /// A single worker: tasks run one at a time, in submission order.
    pub fn single_thread(thread_name: &str) -> std::io::Result<Self> {
        Self::spawn("single_thread", 1, thread_name)
    }

    fn spawn(label: &'static str, size: usize, thread_name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size);
        for n in 0..size {
            let name = format!("{thread_name}-{n}");
            let receiver = Arc::clone(&receiver);
            let pending = Arc::clone(&pending);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(label, &name, &receiver, &pending))?;
            workers.push(handle);
        }

        ExecutorCreated {
            executor: label,
            workers: size,
        }
        .log();

        Ok(Self {
            label,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            pending,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks submitted but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stops accepting tasks. Queued tasks still run.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            ExecutorShutdown {
                executor: self.label,
                pending: self.pending(),
            }
            .log();
        }
    }

    /// Shuts down and waits for the workers to drain the queue.
    pub fn join(&self) {
        self.shutdown();
        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
    }
}

fn worker_loop(
    label: &'static str,
    name: &str,
    receiver: &Mutex<Receiver<Task>>,
    pending: &AtomicUsize,
) {
    WorkerStarted {
        executor: label,
        worker: name,
    }
    .log();
    loop {
        let next = receiver.lock().recv();
        let Ok(task) = next else {
            break;
        };
        pending.fetch_sub(1, Ordering::SeqCst);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            WorkerPanicked {
                executor: label,
                message: &message,
            }
            .log();
        }
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) -> Result<(), FlowError> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(FlowError::state(self.label, "executor has been shut down"));
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        sender.send(task).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            FlowError::state(self.label, "all workers have exited")
        })
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
