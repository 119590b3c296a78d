// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::{ExecutorKind, KernelConfig};
use crate::engine::{DirectExecutor, ThreadPoolExecutor, TokioExecutor};
use crate::errors::ConfigError;
use crate::observability::messages::executor::ExecutorCreated;
use crate::observability::messages::StructuredLog;
use crate::traits::Executor;

/// Factory for creating executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create the executor selected by `cfg.executor.kind`
    pub fn from_config(cfg: &KernelConfig) -> Result<Arc<dyn Executor>, ConfigError> {
        let options = &cfg.executor;
        let worker_threads = options.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        let executor: Arc<dyn Executor> = match options.kind {
            ExecutorKind::ThreadPool => Arc::new(
                ThreadPoolExecutor::new(worker_threads, &options.thread_name)
                    .map_err(ConfigError::Spawn)?,
            ),
            ExecutorKind::SingleThread => Arc::new(
                ThreadPoolExecutor::single_thread(&options.thread_name)
                    .map_err(ConfigError::Spawn)?,
            ),
            ExecutorKind::Direct => {
                let direct = DirectExecutor::new();
                ExecutorCreated {
                    executor: direct.name(),
                    workers: 0,
                }
                .log();
                Arc::new(direct)
            }
            ExecutorKind::Tokio => {
                let tokio = TokioExecutor::current()?;
                ExecutorCreated {
                    executor: tokio.name(),
                    workers: 0,
                }
                .log();
                Arc::new(tokio)
            }
        };
        Ok(executor)
    }
}
