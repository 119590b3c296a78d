// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for node and dataflow lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * A node being claimed and run by an executor
//! * A node reaching `Completed` or `Failed`
//! * Cooperative stops and action panics
//! * Dataflow groups settling

use crate::errors::{Failure, FlowError};
use crate::node::NodeState;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A node was claimed and its action is about to run.
///
/// # Log Level
/// `debug!` - Kernel transition
pub struct NodeFired<'a> {
    pub node: &'a str,
    pub firing: u64,
}

impl Display for NodeFired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Node '{}' fired (run #{})", self.node, self.firing)
    }
}

impl StructuredLog for NodeFired<'_> {
    fn log(&self) {
        tracing::debug!(node = self.node, firing = self.firing, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_run",
            span_name = name,
            node = self.node,
            firing = self.firing,
        )
    }
}

/// A node completed normally.
///
/// # Log Level
/// `debug!` - Kernel transition
///
/// # Example
/// ```
/// use dagwood_flow::observability::messages::node::NodeCompleted;
///
/// let msg = NodeCompleted {
///     node: "sum",
///     firings: 3,
/// };
///
/// assert_eq!(msg.to_string(), "Node 'sum' completed after 3 run(s)");
/// ```
pub struct NodeCompleted<'a> {
    pub node: &'a str,
    pub firings: u64,
}

impl Display for NodeCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' completed after {} run(s)",
            self.node, self.firings
        )
    }
}

impl StructuredLog for NodeCompleted<'_> {
    fn log(&self) {
        tracing::debug!(node = self.node, firings = self.firings, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_completed",
            span_name = name,
            node = self.node,
            firings = self.firings,
        )
    }
}

/// A node failed; the failure is propagated to its outputs.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct NodeFailed<'a> {
    pub node: &'a str,
    pub error: &'a Failure,
}

impl NodeFailed<'_> {
    /// The action misused a port or output rather than failing on its own terms.
    pub fn is_violation(&self) -> bool {
        self.error
            .downcast_ref::<FlowError>()
            .is_some_and(FlowError::is_violation)
    }
}

impl Display for NodeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.is_violation() {
            write!(f, "Node '{}' failed on a {}", self.node, self.error)
        } else {
            write!(f, "Node '{}' failed: {}", self.node, self.error)
        }
    }
}

impl StructuredLog for NodeFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node = self.node,
            error = %self.error,
            violation = self.is_violation(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "node_failed",
            span_name = name,
            node = self.node,
            error = %self.error,
            violation = self.is_violation(),
        )
    }
}

/// `stop()` was called on a live node.
///
/// # Log Level
/// `debug!` - Kernel transition
pub struct NodeStopped<'a> {
    pub node: &'a str,
    pub state: NodeState,
}

impl Display for NodeStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Node '{}' stopped while {:?}", self.node, self.state)
    }
}

impl StructuredLog for NodeStopped<'_> {
    fn log(&self) {
        tracing::debug!(node = self.node, state = ?self.state, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "node_stopped",
            span_name = name,
            node = self.node,
            state = ?self.state,
        )
    }
}

/// An action (or its completion hook) panicked.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ActionPanicked<'a> {
    pub node: &'a str,
    pub message: &'a str,
}

impl Display for ActionPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Action of node '{}' panicked: {}", self.node, self.message)
    }
}

impl StructuredLog for ActionPanicked<'_> {
    fn log(&self) {
        tracing::error!(node = self.node, panic = self.message, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "action_panicked",
            span_name = name,
            node = self.node,
            panic = self.message,
        )
    }
}

/// Every member of a dataflow group has completed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DataflowCompleted<'a> {
    pub dataflow: &'a str,
}

impl Display for DataflowCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dataflow '{}' completed", self.dataflow)
    }
}

impl StructuredLog for DataflowCompleted<'_> {
    fn log(&self) {
        tracing::info!(dataflow = self.dataflow, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("dataflow_completed", span_name = name, dataflow = self.dataflow)
    }
}

/// A dataflow group failed because of a member.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DataflowFailed<'a> {
    pub dataflow: &'a str,
    pub error: &'a Failure,
}

impl Display for DataflowFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dataflow '{}' failed: {}", self.dataflow, self.error)
    }
}

impl StructuredLog for DataflowFailed<'_> {
    fn log(&self) {
        tracing::error!(dataflow = self.dataflow, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "dataflow_failed",
            span_name = name,
            dataflow = self.dataflow,
            error = %self.error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::failure;

    #[test]
    fn test_failure_messages_include_cause() {
        let error = failure(anyhow::anyhow!("division by zero"));
        let msg = NodeFailed {
            node: "ratio",
            error: &error,
        };
        assert_eq!(msg.to_string(), "Node 'ratio' failed: division by zero");

        let msg = DataflowFailed {
            dataflow: "root/stage",
            error: &error,
        };
        assert_eq!(msg.to_string(), "Dataflow 'root/stage' failed: division by zero");
    }

    #[test]
    fn test_violation_failures_are_flagged() {
        let error = failure(FlowError::capacity("sum.a", "port already holds a value"));
        let msg = NodeFailed {
            node: "sum",
            error: &error,
        };
        assert!(msg.is_violation());
        assert_eq!(
            msg.to_string(),
            "Node 'sum' failed on a capacity violation on 'sum.a': port already holds a value"
        );

        let error = failure(anyhow::anyhow!("division by zero"));
        let msg = NodeFailed {
            node: "ratio",
            error: &error,
        };
        assert!(!msg.is_violation());
    }

    #[test]
    fn test_stopped_message_names_state() {
        let msg = NodeStopped {
            node: "ticker",
            state: NodeState::Blocked,
        };
        assert_eq!(msg.to_string(), "Node 'ticker' stopped while Blocked");
    }
}
