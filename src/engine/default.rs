// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Arc, OnceLock};

use crate::engine::{DirectExecutor, ThreadPoolExecutor};
use crate::errors::FlowError;
use crate::observability::messages::executor::DefaultExecutorInstalled;
use crate::observability::messages::StructuredLog;
use crate::traits::Executor;

static DEFAULT_EXECUTOR: OnceLock<Arc<dyn Executor>> = OnceLock::new();

/// The process-wide executor used by [`Dataflow::new`](crate::node::Dataflow::new).
///
/// Created on first use as a thread pool sized to the machine, unless one was
/// installed earlier. Falls back to the direct executor if no thread can be spawned.
pub fn default_executor() -> Arc<dyn Executor> {
    Arc::clone(DEFAULT_EXECUTOR.get_or_init(|| match ThreadPoolExecutor::with_default_size() {
        Ok(pool) => Arc::new(pool),
        Err(err) => {
            tracing::warn!(error = %err, "Falling back to direct executor");
            Arc::new(DirectExecutor::new())
        }
    }))
}

/// Sets the process default executor. Only possible before the default has been
/// used or installed; afterwards this is a `StateViolation`.
pub fn install_default_executor(executor: Arc<dyn Executor>) -> Result<(), FlowError> {
    let name = executor.name();
    DEFAULT_EXECUTOR
        .set(executor)
        .map_err(|_| FlowError::state("default executor", "already initialized"))?;
    DefaultExecutorInstalled { executor: name }.log();
    Ok(())
}
