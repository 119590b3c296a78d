// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for executor lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Executor construction from configuration
//! * Worker thread startup, panics and shutdown
//! * Tasks refused by an executor

use crate::errors::FlowError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An executor was built.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagwood_flow::observability::messages::executor::ExecutorCreated;
///
/// let msg = ExecutorCreated {
///     executor: "thread_pool",
///     workers: 4,
/// };
///
/// assert_eq!(msg.to_string(), "Created thread_pool executor with 4 worker(s)");
/// ```
pub struct ExecutorCreated<'a> {
    pub executor: &'a str,
    pub workers: usize,
}

impl Display for ExecutorCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created {} executor with {} worker(s)",
            self.executor, self.workers
        )
    }
}

impl StructuredLog for ExecutorCreated<'_> {
    fn log(&self) {
        tracing::info!(executor = self.executor, workers = self.workers, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "executor_created",
            span_name = name,
            executor = self.executor,
            workers = self.workers,
        )
    }
}

/// The process default executor was installed explicitly.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DefaultExecutorInstalled<'a> {
    pub executor: &'a str,
}

impl Display for DefaultExecutorInstalled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Installed {} as the default executor", self.executor)
    }
}

impl StructuredLog for DefaultExecutorInstalled<'_> {
    fn log(&self) {
        tracing::info!(executor = self.executor, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("default_executor", span_name = name, executor = self.executor)
    }
}

/// An executor refused a node's task.
///
/// # Log Level
/// `warn!` - The node fails as a consequence
pub struct TaskRejected<'a> {
    pub executor: &'a str,
    pub node: &'a str,
    pub error: &'a FlowError,
}

impl Display for TaskRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Executor {} rejected node '{}': {}",
            self.executor, self.node, self.error
        )
    }
}

impl StructuredLog for TaskRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            executor = self.executor,
            node = self.node,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "task_rejected",
            span_name = name,
            executor = self.executor,
            node = self.node,
        )
    }
}

/// A pool worker thread started.
///
/// # Log Level
/// `trace!` - Worker lifecycle
pub struct WorkerStarted<'a> {
    pub executor: &'a str,
    pub worker: &'a str,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker '{}' of {} started", self.worker, self.executor)
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::trace!(executor = self.executor, worker = self.worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "worker",
            span_name = name,
            executor = self.executor,
            worker = self.worker,
        )
    }
}

/// A task panicked outside the node kernel's own panic handling.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerPanicked<'a> {
    pub executor: &'a str,
    pub message: &'a str,
}

impl Display for WorkerPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task on {} executor panicked: {}",
            self.executor, self.message
        )
    }
}

impl StructuredLog for WorkerPanicked<'_> {
    fn log(&self) {
        tracing::error!(executor = self.executor, panic = self.message, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "worker_panicked",
            span_name = name,
            executor = self.executor,
            panic = self.message,
        )
    }
}

/// An executor stopped accepting work.
///
/// # Log Level
/// `debug!` - Executor lifecycle
pub struct ExecutorShutdown<'a> {
    pub executor: &'a str,
    pub pending: usize,
}

impl Display for ExecutorShutdown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Executor {} shut down with {} pending task(s)",
            self.executor, self.pending
        )
    }
}

impl StructuredLog for ExecutorShutdown<'_> {
    fn log(&self) {
        tracing::debug!(executor = self.executor, pending = self.pending, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "executor_shutdown",
            span_name = name,
            executor = self.executor,
        )
    }
}
