// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::FlowError;

/// A unit of work handed to an executor: one firing of one node.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Pluggable task runner used by the node kernel.
///
/// The kernel only ever calls [`Executor::execute`], always with no port or node
/// lock held, so an implementation is free to run the task inline on the calling
/// thread, on a pool, or on a foreign event loop.
pub trait Executor: Send + Sync {
    /// Run `task` at some point in the future (or right now).
    ///
    /// Returns a `StateViolation` if the executor no longer accepts work.
    fn execute(&self, task: Task) -> Result<(), FlowError>;

    /// Short name used in logs and in config round-trips.
    fn name(&self) -> &'static str;
}
