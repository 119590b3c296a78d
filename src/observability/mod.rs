// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostics go through message structs in [`messages`] instead of ad-hoc
//! format strings. Each message type implements `Display` and
//! [`messages::StructuredLog`], so the kernel logs one typed value per event and
//! subscribers receive the same fields regardless of call site.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::node` - node firing, completion and failure, dataflow groups
//! * `messages::port` - slot transitions and distributor delivery
//! * `messages::executor` - executor construction, workers, rejected tasks
//! * `messages::config` - configuration files loaded or rejected
//!
//! Kernel transitions log at `debug!` or `trace!`; failures at `error!`.

pub mod messages;
