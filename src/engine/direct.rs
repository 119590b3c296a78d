// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::errors::FlowError;
use crate::traits::{Executor, Task};

thread_local! {
    /// Tasks submitted while this thread is already running a direct task.
    static PENDING: RefCell<Option<VecDeque<Task>>> = const { RefCell::new(None) };
}

/// Clears the pending queue when the outermost `execute` returns or unwinds.
struct Drain;

impl Drop for Drain {
    fn drop(&mut self) {
        PENDING.with(|pending| pending.borrow_mut().take());
    }
}

/// Runs every task on the calling thread before `execute` returns.
///
/// A post into a port runs the receiving node before `post` returns, which makes
/// graphs fully deterministic. Tasks submitted from inside a running task are
/// queued and run in order once it finishes, so re-fires and long chains run at
/// constant stack depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl DirectExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) -> Result<(), FlowError> {
        let first = PENDING.with(|pending| {
            let mut pending = pending.borrow_mut();
            match pending.as_mut() {
                Some(queue) => {
                    queue.push_back(task);
                    None
                }
                None => {
                    *pending = Some(VecDeque::new());
                    Some(task)
                }
            }
        });
        let Some(first) = first else {
            return Ok(());
        };

        let _drain = Drain;
        first();
        while let Some(next) =
            PENDING.with(|pending| pending.borrow_mut().as_mut().and_then(VecDeque::pop_front))
        {
            next();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_before_returning() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        DirectExecutor::new()
            .execute(Box::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_nested_tasks_run_after_current_task() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer = Arc::clone(&log);
        DirectExecutor::new()
            .execute(Box::new(move || {
                let inner = Arc::clone(&outer);
                DirectExecutor::new()
                    .execute(Box::new(move || inner.lock().push("inner")))
                    .unwrap();
                outer.lock().push("outer");
            }))
            .unwrap();
        assert_eq!(*log.lock(), vec!["outer", "inner"]);

        DirectExecutor::new()
            .execute(Box::new({
                let log = Arc::clone(&log);
                move || log.lock().push("next")
            }))
            .unwrap();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_long_resubmission_chain_completes() {
        fn hop(remaining: usize, count: Arc<Mutex<usize>>) -> Task {
            Box::new(move || {
                *count.lock() += 1;
                if remaining > 0 {
                    DirectExecutor::new()
                        .execute(hop(remaining - 1, count))
                        .unwrap();
                }
            })
        }

        let count = Arc::new(Mutex::new(0));
        DirectExecutor::new()
            .execute(hop(200_000, Arc::clone(&count)))
            .unwrap();
        assert_eq!(*count.lock(), 200_001);
    }
}
