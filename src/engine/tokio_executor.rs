// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::runtime::Handle;

use crate::errors::{ConfigError, FlowError};
use crate::traits::{Executor, Task};

/// Spawns each task onto a tokio runtime.
///
/// Actions never block, so they run directly on the runtime's worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running in.
    pub fn current() -> Result<Self, ConfigError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ConfigError::NoTokioRuntime)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) -> Result<(), FlowError> {
        self.handle.spawn(async move { task() });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}
