// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Nodes, the groups they live in, and the monitor built from them.

mod builder;
mod dataflow;
mod kernel;
mod monitor;

pub use builder::NodeBuilder;
pub use dataflow::{Dataflow, StreamDefaults};
pub use kernel::{Node, NodeKind, NodeState};
pub use monitor::{Monitor, Step};

pub(crate) use kernel::{Drainable, NodeCore, Terminal};
