// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The node scheduling kernel.
//!
//! A node owns a table of readiness slots, one per port (or gated output). Every
//! port transition updates its slot under the node lock and adjusts a counter of
//! still-blocked slots. When the counter reaches zero while the node is `Blocked`,
//! the same critical section moves it to `Running`; that transition is the claim
//! that guarantees at most one in-flight execution of the action. The executor is
//! invoked only after every lock has been released.
//!
//! Lock order is: port lock, then node control lock, then action slot.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{failure, Failure, FlowError};
use crate::node::Dataflow;
use crate::observability::messages::node::{
    ActionPanicked, NodeCompleted, NodeFailed, NodeFired, NodeStopped,
};
use crate::observability::messages::executor::TaskRejected;
use crate::observability::messages::port::SlotTransition;
use crate::observability::messages::StructuredLog;
use crate::outputs::Promise;
use crate::traits::{Action, Completable, Executor, Flow};

/// Lifecycle of a node: `Created → Blocked ⇄ Running → {Completed | Failed}`.
///
/// "Ready" is the instant the blocked counter reaches zero; the kernel moves
/// straight from there to `Running`, so it is never observable as a resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Blocked,
    Running,
    Completed,
    Failed,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Completed | NodeState::Failed)
    }
}

/// One-shot procedure or reusable actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Procedure,
    Actor,
}

/// Outputs registered on a node are terminated along with it.
pub(crate) trait Terminal: Send + Sync {
    fn terminate(&self, failure: Option<&Failure>);
}

/// A stream input whose end, once the action has consumed it, completes an actor.
pub(crate) trait Drainable: Send + Sync {
    fn end_delivered(&self) -> bool;
}

struct Slot {
    name: String,
    ready: bool,
}

struct Control {
    state: NodeState,
    slots: Vec<Slot>,
    blocked: usize,
    stopped: bool,
    firings: u64,
}

pub(crate) struct NodeCore {
    name: String,
    kind: NodeKind,
    executor: Mutex<Arc<dyn Executor>>,
    control: Mutex<Control>,
    action: Mutex<Option<Box<dyn Action>>>,
    outputs: Mutex<Vec<Arc<dyn Terminal>>>,
    primary: Mutex<Option<Arc<dyn Drainable>>>,
    completion: Promise<()>,
    parent: Dataflow,
}

impl NodeCore {
    pub(crate) fn new(name: String, kind: NodeKind, parent: Dataflow) -> Arc<Self> {
        Arc::new(Self {
            completion: Promise::new(format!("{name}.completion")),
            executor: Mutex::new(parent.executor()),
            control: Mutex::new(Control {
                state: NodeState::Created,
                slots: Vec::new(),
                blocked: 0,
                stopped: false,
                firings: 0,
            }),
            action: Mutex::new(None),
            outputs: Mutex::new(Vec::new()),
            primary: Mutex::new(None),
            name,
            kind,
            parent,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn parent(&self) -> &Dataflow {
        &self.parent
    }

    pub(crate) fn set_executor(&self, executor: Arc<dyn Executor>) {
        *self.executor.lock() = executor;
    }

    /// Adds a readiness slot; returns its index.
    pub(crate) fn register_slot(&self, name: &str, ready: bool) -> usize {
        let mut control = self.control.lock();
        if !ready {
            control.blocked += 1;
        }
        control.slots.push(Slot {
            name: name.to_string(),
            ready,
        });
        control.slots.len() - 1
    }

    pub(crate) fn register_output(&self, output: Arc<dyn Terminal>) {
        self.outputs.lock().push(output);
    }

    pub(crate) fn set_primary(&self, input: Arc<dyn Drainable>) {
        *self.primary.lock() = Some(input);
    }

    pub(crate) fn install(&self, action: Box<dyn Action>) {
        *self.action.lock() = Some(action);
    }

    /// Records a slot transition. Returns true if the caller must dispatch the node
    /// once it has released its own lock.
    pub(crate) fn update(&self, index: usize, ready: bool) -> bool {
        let mut control = self.control.lock();
        let Some(slot) = control.slots.get_mut(index) else {
            return false;
        };
        if slot.ready == ready {
            return false;
        }
        slot.ready = ready;
        if ready {
            control.blocked -= 1;
        } else {
            control.blocked += 1;
        }
        SlotTransition {
            node: &self.name,
            port: &control.slots[index].name,
            ready,
            blocked: control.blocked,
        }
        .log();
        Self::claim(&mut control)
    }

    fn claim(control: &mut Control) -> bool {
        if control.state == NodeState::Blocked && control.blocked == 0 && !control.stopped {
            control.state = NodeState::Running;
            control.firings += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn start(self: &Arc<Self>) {
        let fire = {
            let mut control = self.control.lock();
            if control.state != NodeState::Created || control.stopped {
                return;
            }
            control.state = NodeState::Blocked;
            Self::claim(&mut control)
        };
        if fire {
            self.dispatch();
        }
    }

    pub(crate) fn dispatch(self: &Arc<Self>) {
        let core = Arc::clone(self);
        let executor = self.executor.lock().clone();
        if let Err(err) = executor.execute(Box::new(move || core.run())) {
            TaskRejected {
                executor: executor.name(),
                node: &self.name,
                error: &err,
            }
            .log();
            let action = self.action.lock().take();
            self.finish(action, Some(failure(err)));
        }
    }

    fn run(self: Arc<Self>) {
        let Some(mut action) = self.action.lock().take() else {
            return;
        };
        let firing = self.control.lock().firings;
        let fired = NodeFired {
            node: &self.name,
            firing,
        };
        fired.log();
        let span = fired.span("run");
        let _entered = span.enter();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| action.run())) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                ActionPanicked {
                    node: &self.name,
                    message: &message,
                }
                .log();
                Err(anyhow::anyhow!("action of node '{}' panicked: {}", self.name, message))
            }
        };

        match outcome {
            Ok(Flow::Continue) if self.kind == NodeKind::Actor && !self.primary_ended() => {
                self.rearm(action);
            }
            Ok(_) => self.finish(Some(action), None),
            Err(err) => self.finish(Some(action), Some(FlowError::into_failure(err))),
        }
    }

    fn primary_ended(&self) -> bool {
        self.primary
            .lock()
            .as_ref()
            .map(|input| input.end_delivered())
            .unwrap_or(false)
    }

    fn rearm(self: &Arc<Self>, action: Box<dyn Action>) {
        let fire = {
            let mut control = self.control.lock();
            if control.stopped {
                drop(control);
                self.finish(Some(action), None);
                return;
            }
            *self.action.lock() = Some(action);
            control.state = NodeState::Blocked;
            Self::claim(&mut control)
        };
        if fire {
            self.dispatch();
        }
    }

    pub(crate) fn stop(self: &Arc<Self>) {
        let action = {
            let mut control = self.control.lock();
            if control.stopped || control.state.is_terminal() {
                return;
            }
            control.stopped = true;
            NodeStopped {
                node: &self.name,
                state: control.state,
            }
            .log();
            if control.state == NodeState::Running {
                // The run in flight observes the flag when it returns.
                return;
            }
            self.action.lock().take()
        };
        self.finish(action, None);
    }

    fn finish(&self, action: Option<Box<dyn Action>>, failure: Option<Failure>) {
        let firings = {
            let mut control = self.control.lock();
            if control.state.is_terminal() {
                return;
            }
            control.state = if failure.is_some() {
                NodeState::Failed
            } else {
                NodeState::Completed
            };
            control.firings
        };

        if let Some(mut action) = action {
            let hook = panic::catch_unwind(AssertUnwindSafe(|| action.on_complete(failure.as_ref())));
            if let Err(payload) = hook {
                ActionPanicked {
                    node: &self.name,
                    message: &panic_message(payload.as_ref()),
                }
                .log();
            }
        }

        self.primary.lock().take();
        let outputs = std::mem::take(&mut *self.outputs.lock());
        for output in outputs {
            output.terminate(failure.as_ref());
        }

        match &failure {
            None => {
                NodeCompleted {
                    node: &self.name,
                    firings,
                }
                .log();
                let _ = self.completion.complete(());
            }
            Some(f) => {
                NodeFailed {
                    node: &self.name,
                    error: f,
                }
                .log();
                let _ = self.completion.fail(Arc::clone(f));
            }
        }
        self.parent.leave(failure);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle to a built node.
///
/// Cloning the handle does not clone the node. Dropping every handle does not stop
/// it either: a node stays alive while producers can still reach its ports.
#[derive(Clone)]
pub struct Node {
    core: Arc<NodeCore>,
}

impl Node {
    pub(crate) fn from_core(core: Arc<NodeCore>) -> Self {
        Self { core }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> NodeState {
        self.core.control.lock().state
    }

    /// How many times the node has been claimed for execution.
    pub fn firings(&self) -> u64 {
        self.core.control.lock().firings
    }

    /// Number of slots currently blocking the node.
    pub fn blocked_ports(&self) -> usize {
        self.core.control.lock().blocked
    }

    /// Activates a node built with `build_paused`. Later calls are ignored.
    pub fn start(&self) {
        self.core.start();
    }

    /// Cooperative stop: a node that is running finishes its current action first,
    /// then completes without firing again.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Completes with `()` or fails with the action's error.
    pub fn completion(&self) -> Promise<()> {
        self.core.completion.clone()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.core.control.lock();
        let ports: Vec<(&str, bool)> = control
            .slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.ready))
            .collect();
        f.debug_struct("Node")
            .field("name", &self.core.name)
            .field("kind", &self.core.kind)
            .field("state", &control.state)
            .field("blocked", &control.blocked)
            .field("ports", &ports)
            .finish()
    }
}

#[async_trait::async_trait]
impl Completable for Node {
    type Output = ();

    async fn finished(&self) -> Result<(), FlowError> {
        self.core.completion.finished().await
    }

    fn is_done(&self) -> bool {
        self.state().is_terminal()
    }
}
