// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Monitor emulation on top of the kernel.
//!
//! A [`Monitor`] is an actor that runs submitted tasks one at a time, so tasks
//! share its state without locking against each other. A task that cannot make
//! progress returns [`Step::Wait`] and is parked; `notify` re-queues the oldest
//! parked task and `notify_all` re-queues all of them, behind any work already
//! queued.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::FlowError;
use crate::node::{Dataflow, Node};
use crate::ports::{Inlet, StreamPort};
use crate::traits::{Action, Flow};

/// Result of one attempt at running a monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Done,
    /// Park the task until the next notify.
    Wait,
}

type TaskFn = Box<dyn FnMut() -> Step + Send>;

struct TaskCell {
    task: Mutex<TaskFn>,
}

#[derive(Clone)]
enum MonitorMsg {
    Run(Arc<TaskCell>),
    Notify,
    NotifyAll,
}

struct MonitorAction {
    input: StreamPort<MonitorMsg>,
    requeue: Inlet<MonitorMsg>,
    parked: VecDeque<Arc<TaskCell>>,
    parked_count: Arc<AtomicUsize>,
}

impl MonitorAction {
    /// A notify that arrives after `close` has nowhere to requeue to, so the
    /// tasks it would have woken are dropped.
    fn requeue(&mut self, count: usize) -> Result<(), FlowError> {
        if self.input.is_closed() {
            let woken = count.min(self.parked.len());
            self.parked.drain(..woken);
            self.parked_count.store(self.parked.len(), Ordering::SeqCst);
            return Ok(());
        }
        for _ in 0..count {
            let Some(task) = self.parked.pop_front() else {
                break;
            };
            self.requeue.post(MonitorMsg::Run(task))?;
        }
        self.parked_count.store(self.parked.len(), Ordering::SeqCst);
        Ok(())
    }
}

impl Action for MonitorAction {
    fn run(&mut self) -> anyhow::Result<Flow> {
        match self.input.consume()? {
            Some(MonitorMsg::Run(cell)) => {
                let step = {
                    let mut task = cell.task.lock();
                    (*task)()
                };
                if step == Step::Wait {
                    self.parked.push_back(cell);
                    self.parked_count.store(self.parked.len(), Ordering::SeqCst);
                }
            }
            Some(MonitorMsg::Notify) => self.requeue(1)?,
            Some(MonitorMsg::NotifyAll) => self.requeue(usize::MAX)?,
            None => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }
}

/// Single-consumer task queue with wait/notify.
pub struct Monitor {
    inlet: Inlet<MonitorMsg>,
    parked: Arc<AtomicUsize>,
    node: Node,
}

impl Monitor {
    pub fn new(dataflow: &Dataflow, name: impl Into<String>) -> Self {
        let builder = dataflow.actor(name);
        let input = builder.primary_stream::<MonitorMsg>("tasks", None);
        let inlet = input.inlet();
        let parked = Arc::new(AtomicUsize::new(0));
        let node = builder.build(MonitorAction {
            requeue: inlet.clone(),
            input,
            parked: VecDeque::new(),
            parked_count: Arc::clone(&parked),
        });
        Self {
            inlet,
            parked,
            node,
        }
    }

    /// Queues `task`; it runs after everything submitted before it.
    pub fn submit<F>(&self, task: F) -> Result<(), FlowError>
    where
        F: FnMut() -> Step + Send + 'static,
    {
        self.inlet.post(MonitorMsg::Run(Arc::new(TaskCell {
            task: Mutex::new(Box::new(task)),
        })))
    }

    pub fn notify(&self) -> Result<(), FlowError> {
        self.inlet.post(MonitorMsg::Notify)
    }

    pub fn notify_all(&self) -> Result<(), FlowError> {
        self.inlet.post(MonitorMsg::NotifyAll)
    }

    /// Tasks currently waiting for a notify.
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    /// Stops accepting tasks; the monitor completes once the queue is drained.
    /// Notifies already queued still run, but the tasks they wake are dropped
    /// along with anything still parked.
    pub fn close(&self) -> Result<(), FlowError> {
        self.inlet.close()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("node", &self.node.name())
            .field("parked", &self.parked())
            .finish()
    }
}
