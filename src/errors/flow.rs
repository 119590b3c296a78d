// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kernel error taxonomy.
//!
//! Violations (`CapacityViolation`, `StateViolation`, `ProtocolViolation`) are wiring
//! bugs and are returned synchronously to the offending caller. Action failures are
//! never returned to a caller: the kernel converts them into a [`Failure`] that
//! travels through the failed node's outputs, and a downstream node observes it as
//! [`FlowError::Upstream`] when it consumes the affected port.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A terminal error flowing through the graph.
///
/// Shared, because one failure is replayed to every subscriber of a distributor.
pub type Failure = Arc<anyhow::Error>;

/// Wrap any error into a [`Failure`].
pub fn failure<E>(error: E) -> Failure
where
    E: Into<anyhow::Error>,
{
    Arc::new(error.into())
}

/// Errors raised by ports, distributors, executors and blocking waits.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// Posting beyond a port's declared storage, e.g. a second value into an
    /// unconsumed scalar port.
    #[error("capacity violation on '{target}': {reason}")]
    CapacityViolation { target: String, reason: String },

    /// Operating on something already terminal, or on a port in the wrong state.
    #[error("state violation on '{target}': {reason}")]
    StateViolation { target: String, reason: String },

    /// Breaking the demand or permit protocol.
    #[error("protocol violation on '{target}': {reason}")]
    ProtocolViolation { target: String, reason: String },

    /// A failure signal received from upstream.
    #[error("upstream failure: {0}")]
    Upstream(Failure),

    /// A blocking wait gave up.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FlowError {
    pub fn capacity(target: impl Into<String>, reason: impl Into<String>) -> Self {
        FlowError::CapacityViolation {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn state(target: impl Into<String>, reason: impl Into<String>) -> Self {
        FlowError::StateViolation {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn protocol(target: impl Into<String>, reason: impl Into<String>) -> Self {
        FlowError::ProtocolViolation {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// True for the three synchronous violation kinds.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            FlowError::CapacityViolation { .. }
                | FlowError::StateViolation { .. }
                | FlowError::ProtocolViolation { .. }
        )
    }

    /// Convert an action's error into the failure that is propagated downstream.
    ///
    /// An `Upstream` error bubbling out of an action through `?` keeps the original
    /// failure instead of being wrapped again.
    pub fn into_failure(error: anyhow::Error) -> Failure {
        match error.downcast_ref::<FlowError>() {
            Some(FlowError::Upstream(original)) => Arc::clone(original),
            _ => Arc::new(error),
        }
    }
}
