// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::FlowError;

/// Something with a terminal outcome that async code can wait for.
///
/// Implemented by [`Promise`](crate::outputs::Promise), [`Node`](crate::node::Node)
/// and [`Dataflow`](crate::node::Dataflow). Waiting never blocks an executor thread.
#[async_trait]
pub trait Completable: Send + Sync {
    type Output: Send;

    /// Resolve once the terminal outcome is known.
    async fn finished(&self) -> Result<Self::Output, FlowError>;

    /// True once the terminal outcome is known.
    fn is_done(&self) -> bool;
}
