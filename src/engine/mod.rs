// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Executors: where node actions actually run.

pub mod default;
pub mod direct;
pub mod event_loop;
pub mod factory;
pub mod thread_pool;
pub mod tokio_executor;

pub use default::{default_executor, install_default_executor};
pub use direct::DirectExecutor;
pub use event_loop::EventLoopExecutor;
pub use factory::ExecutorFactory;
pub use thread_pool::ThreadPoolExecutor;
pub use tokio_executor::TokioExecutor;
