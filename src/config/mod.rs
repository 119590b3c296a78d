// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use consts::{DEFAULT_LOG_FILTER, DEFAULT_REQUEST_WINDOW, DEFAULT_THREAD_NAME};
pub use loader::{
    load_and_validate_config, load_config, ExecutorKind, ExecutorOptions, KernelConfig,
    LoggingOptions, StreamOptions,
};
pub use runtime::RuntimeBuilder;
pub use validation::validate_config;
