// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::DEFAULT_REQUEST_WINDOW;
use crate::engine::default_executor;
use crate::errors::{Failure, FlowError};
use crate::node::NodeBuilder;
use crate::observability::messages::node::{DataflowCompleted, DataflowFailed};
use crate::observability::messages::StructuredLog;
use crate::outputs::Promise;
use crate::traits::{Completable, Executor};

/// Defaults applied to stream ports built inside a dataflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDefaults {
    /// Demand an unbounded stream port requests from its upstream output.
    pub request_window: u64,
    /// Capacity given to `NodeBuilder::stream` ports; `None` is unbounded.
    pub default_capacity: Option<usize>,
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self {
            request_window: DEFAULT_REQUEST_WINDOW,
            default_capacity: None,
        }
    }
}

struct GroupState {
    live: usize,
    left_parent: bool,
}

struct DataflowShared {
    name: String,
    executor: Arc<dyn Executor>,
    streams: StreamDefaults,
    state: Mutex<GroupState>,
    completion: Promise<()>,
    parent: Option<Dataflow>,
}

/// A group of nodes (and nested groups) sharing an executor.
///
/// The group counts its live members. It completes when the last member leaves
/// and fails as soon as any member fails; both signals then move on to the
/// parent group. A group that never had members never completes.
#[derive(Clone)]
pub struct Dataflow {
    shared: Arc<DataflowShared>,
}

impl Dataflow {
    /// A root group on the process default executor.
    pub fn new(name: impl Into<String>) -> Self {
        Self::root(name.into(), default_executor(), StreamDefaults::default())
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self::root("root".to_string(), executor, StreamDefaults::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
        streams: StreamDefaults,
    ) -> Self {
        Self::root(name.into(), executor, streams)
    }

    fn root(name: String, executor: Arc<dyn Executor>, streams: StreamDefaults) -> Self {
        Self {
            shared: Arc::new(DataflowShared {
                completion: Promise::new(format!("{name}.completion")),
                name,
                executor,
                streams,
                state: Mutex::new(GroupState {
                    live: 0,
                    left_parent: false,
                }),
                parent: None,
            }),
        }
    }

    /// A nested group inheriting this group's executor and stream defaults.
    pub fn child(&self, name: impl Into<String>) -> Dataflow {
        self.child_with_executor(name, self.executor())
    }

    pub fn child_with_executor(
        &self,
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
    ) -> Dataflow {
        let name = format!("{}/{}", self.shared.name, name.into());
        self.enter();
        Self {
            shared: Arc::new(DataflowShared {
                completion: Promise::new(format!("{name}.completion")),
                name,
                executor,
                streams: self.shared.streams,
                state: Mutex::new(GroupState {
                    live: 0,
                    left_parent: false,
                }),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Starts building a one-shot node in this group.
    pub fn procedure(&self, name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::procedure(self, name)
    }

    /// Starts building a reusable actor in this group.
    pub fn actor(&self, name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::actor(self, name)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.shared.executor)
    }

    pub fn stream_defaults(&self) -> StreamDefaults {
        self.shared.streams
    }

    /// Members that have not yet completed.
    pub fn live(&self) -> usize {
        self.shared.state.lock().live
    }

    pub fn completion(&self) -> Promise<()> {
        self.shared.completion.clone()
    }

    /// Fails the group and, through it, every ancestor.
    pub fn fail(&self, failure: Failure) {
        if self.shared.completion.fail(Arc::clone(&failure)).is_ok() {
            DataflowFailed {
                dataflow: &self.shared.name,
                error: &failure,
            }
            .log();
            if let Some(parent) = &self.shared.parent {
                parent.fail(failure);
            }
        }
    }

    pub(crate) fn enter(&self) {
        self.shared.state.lock().live += 1;
    }

    pub(crate) fn leave(&self, failure: Option<Failure>) {
        if let Some(failure) = failure {
            self.fail(failure);
        }
        let emptied = {
            let mut state = self.shared.state.lock();
            state.live = state.live.saturating_sub(1);
            if state.live == 0 && !state.left_parent {
                state.left_parent = true;
                true
            } else {
                false
            }
        };
        if !emptied {
            return;
        }
        if self.shared.completion.complete(()).is_ok() {
            DataflowCompleted {
                dataflow: &self.shared.name,
            }
            .log();
        }
        if let Some(parent) = &self.shared.parent {
            parent.leave(None);
        }
    }
}

impl fmt::Debug for Dataflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataflow")
            .field("name", &self.shared.name)
            .field("executor", &self.shared.executor.name())
            .field("live", &self.live())
            .field("settled", &self.shared.completion.is_settled())
            .finish()
    }
}

#[async_trait]
impl Completable for Dataflow {
    type Output = ();

    async fn finished(&self) -> Result<(), FlowError> {
        self.shared.completion.get().await
    }

    fn is_done(&self) -> bool {
        self.shared.completion.is_settled()
    }
}
