// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // config + runtime builder
pub mod engine;     // executors
pub mod errors;     // error handling
pub mod node;       // node kernel, dataflow groups, monitor
pub mod observability;
pub mod outputs;    // promise + stream distributors
pub mod ports;      // input ports and their inlets
pub mod traits;     // unified abstractions
