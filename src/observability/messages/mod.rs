// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it with its fields at the right level.
//!
//! # Organization
//!
//! * `node` - node firing, completion, failure and dataflow group events
//! * `port` - readiness transitions and distributor delivery
//! * `executor` - task submission, worker lifecycle and default executor setup
//! * `config` - configuration loading and validation
//!
//! # Usage Pattern
//!
//! ```rust
//! use dagwood_flow::observability::messages::node::NodeCompleted;
//! use dagwood_flow::observability::messages::StructuredLog;
//!
//! let msg = NodeCompleted {
//!     node: "sum",
//!     firings: 1,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod config;
pub mod executor;
pub mod node;
pub mod port;

/// Emits a message as a structured tracing event, or opens a span carrying its fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
