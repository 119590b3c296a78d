// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::Failure;

/// What the node should do after a successful run of its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going: an actor re-arms and waits for its ports again.
    /// Procedures complete regardless.
    Continue,
    /// Complete the node now.
    Stop,
}

/// The user-supplied body of a node.
///
/// An action owns the owner-side handles of its node's ports and outputs, and is
/// only ever invoked by the kernel with all of those ports ready. The kernel never
/// runs two invocations of the same action at once.
///
/// Returning an error (or panicking) fails the node; the error then flows to every
/// output registered on the node's builder.
pub trait Action: Send + 'static {
    fn run(&mut self) -> anyhow::Result<Flow>;

    /// Runs exactly once, when the node reaches a terminal state.
    /// `failure` is `None` on normal completion.
    fn on_complete(&mut self, failure: Option<&Failure>) {
        let _ = failure;
    }
}

/// Adapter that turns a closure into an [`Action`].
pub struct FnAction<F> {
    f: F,
}

impl<F> FnAction<F>
where
    F: FnMut() -> anyhow::Result<Flow> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Action for FnAction<F>
where
    F: FnMut() -> anyhow::Result<Flow> + Send + 'static,
{
    fn run(&mut self) -> anyhow::Result<Flow> {
        (self.f)()
    }
}
