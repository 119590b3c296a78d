// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for port readiness and distributor delivery.

use crate::errors::FlowError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A readiness slot on a node changed.
///
/// # Log Level
/// `trace!` - Emitted on every port transition
pub struct SlotTransition<'a> {
    pub node: &'a str,
    pub port: &'a str,
    pub ready: bool,
    pub blocked: usize,
}

impl Display for SlotTransition<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let state = if self.ready { "ready" } else { "blocked" };
        write!(
            f,
            "Port '{}.{}' is {} ({} slot(s) still blocked)",
            self.node, self.port, state, self.blocked
        )
    }
}

impl StructuredLog for SlotTransition<'_> {
    fn log(&self) {
        tracing::trace!(
            node = self.node,
            port = self.port,
            ready = self.ready,
            blocked = self.blocked,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "slot_transition",
            span_name = name,
            node = self.node,
            port = self.port,
            ready = self.ready,
        )
    }
}

/// A subscriber rejected a delivered item.
///
/// # Log Level
/// `warn!` - The item is lost for that subscriber
///
/// # Example
/// ```
/// use dagwood_flow::errors::FlowError;
/// use dagwood_flow::observability::messages::port::DeliveryFailed;
///
/// let error = FlowError::capacity("sink.input", "stream is at capacity (1)");
/// let msg = DeliveryFailed {
///     distributor: "source.out",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct DeliveryFailed<'a> {
    pub distributor: &'a str,
    pub error: &'a FlowError,
}

impl Display for DeliveryFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Delivery from '{}' was rejected: {}",
            self.distributor, self.error
        )
    }
}

impl StructuredLog for DeliveryFailed<'_> {
    fn log(&self) {
        tracing::warn!(distributor = self.distributor, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "delivery_failed",
            span_name = name,
            distributor = self.distributor,
            error = %self.error,
        )
    }
}

/// A promise or stream output reached its terminal state.
///
/// # Log Level
/// `debug!` - Distributor transition
pub struct OutputSettled<'a> {
    pub distributor: &'a str,
    pub outcome: &'a str,
    pub subscribers: usize,
}

impl Display for OutputSettled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Output '{}' settled as {}, notifying {} subscriber(s)",
            self.distributor, self.outcome, self.subscribers
        )
    }
}

impl StructuredLog for OutputSettled<'_> {
    fn log(&self) {
        tracing::debug!(
            distributor = self.distributor,
            outcome = self.outcome,
            subscribers = self.subscribers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "output_settled",
            span_name = name,
            distributor = self.distributor,
            outcome = self.outcome,
        )
    }
}
