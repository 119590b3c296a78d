// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::errors::FlowError;
use crate::observability::messages::executor::ExecutorShutdown;
use crate::observability::messages::StructuredLog;
use crate::traits::{Executor, Task};

type Notifier = Box<dyn Fn() + Send + Sync>;

/// Queues tasks for a loop owned by someone else.
///
/// Nothing runs until the owner calls [`run_pending`](EventLoopExecutor::run_pending)
/// or [`run_until_idle`](EventLoopExecutor::run_until_idle), so every action executes
/// on the owner's thread. An optional notifier is called after each submission, for
/// waking up a foreign event loop.
#[derive(Default)]
pub struct EventLoopExecutor {
    queue: Mutex<VecDeque<Task>>,
    notifier: Option<Notifier>,
    closed: AtomicBool,
}

impl EventLoopExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier<F>(notifier: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            notifier: Some(Box::new(notifier)),
            ..Self::default()
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs the tasks queued at the time of the call. Tasks they submit wait for
    /// the next call. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Runs until the queue stays empty. Returns the total number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Rejects further submissions. Tasks already queued can still be run.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            ExecutorShutdown {
                executor: self.name(),
                pending: self.pending(),
            }
            .log();
        }
    }
}

impl Executor for EventLoopExecutor {
    fn execute(&self, task: Task) -> Result<(), FlowError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FlowError::state(self.name(), "event loop is closed"));
        }
        self.queue.lock().push_back(task);
        if let Some(notify) = &self.notifier {
            notify();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "event_loop"
    }
}
