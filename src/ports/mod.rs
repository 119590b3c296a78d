// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input ports.
//!
//! Every port has two sides: the owner handle held by its node's action
//! ([`ScalarPort`], [`ConstantPort`], [`StreamPort`], [`PermitPort`]) and a
//! cloneable producer handle ([`Inlet`], [`PermitInlet`]). All transitions run
//! under the port's own lock and report readiness to the owning node from inside
//! it; dispatching the node happens after the lock is released.

mod permit;
mod stream;
mod value;

pub use permit::{PermitInlet, PermitPort};
pub use stream::StreamPort;
pub use value::{ConstantPort, ScalarPort};

use std::fmt;
use std::sync::Arc;

use crate::errors::{Failure, FlowError};
use crate::node::NodeCore;
use crate::outputs::Subscription;
use crate::traits::{Subscriber, Token};

/// A port's readiness slot on its owning node.
pub(crate) struct PortLink {
    core: Arc<NodeCore>,
    index: usize,
}

impl PortLink {
    pub(crate) fn register(core: &Arc<NodeCore>, name: &str, ready: bool) -> Self {
        let index = core.register_slot(name, ready);
        Self {
            core: Arc::clone(core),
            index,
        }
    }

    /// Must be called with the port lock held. Returns the node to dispatch
    /// once that lock has been released.
    pub(crate) fn set_ready(&self, ready: bool) -> Option<Arc<NodeCore>> {
        if self.core.update(self.index, ready) {
            Some(Arc::clone(&self.core))
        } else {
            None
        }
    }

    pub(crate) fn node_name(&self) -> &str {
        self.core.name()
    }
}

pub(crate) fn dispatch(node: Option<Arc<NodeCore>>) {
    if let Some(core) = node {
        core.dispatch();
    }
}

/// Terminal state shared by scalar, constant and stream ports.
#[derive(Clone)]
pub(crate) enum End {
    Open,
    Closed,
    Failed(Failure),
}

impl End {
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, End::Open)
    }
}

/// Producer side of a token port.
pub(crate) trait InletTarget<T>: Send + Sync {
    fn name(&self) -> &str;
    fn post(&self, token: T) -> Result<(), FlowError>;
    fn close(&self) -> Result<(), FlowError>;
    fn fail(&self, failure: Failure) -> Result<(), FlowError>;
    fn attach(&self, subscription: Subscription);
}

/// Cloneable, thread-safe producer handle for a scalar, constant or stream port.
///
/// An inlet is also a [`Subscriber`], so it can be connected to a
/// [`Promise`](crate::outputs::Promise) or a
/// [`StreamOutput`](crate::outputs::StreamOutput) via [`Inlet::subscriber`].
pub struct Inlet<T> {
    target: Arc<dyn InletTarget<T>>,
}

impl<T> Clone for Inlet<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<T: Token> Inlet<T> {
    pub(crate) fn new(target: Arc<dyn InletTarget<T>>) -> Self {
        Self { target }
    }

    pub fn name(&self) -> &str {
        self.target.name()
    }

    pub fn post(&self, token: T) -> Result<(), FlowError> {
        self.target.post(token)
    }

    /// Closing an already closed port is a no-op.
    pub fn close(&self) -> Result<(), FlowError> {
        self.target.close()
    }

    pub fn fail(&self, failure: Failure) -> Result<(), FlowError> {
        self.target.fail(failure)
    }

    pub fn subscriber(&self) -> Arc<dyn Subscriber<T>> {
        Arc::new(self.clone())
    }
}

impl<T: Token> Subscriber<T> for Inlet<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.target.attach(subscription);
    }

    fn on_next(&self, item: T) -> Result<(), FlowError> {
        self.target.post(item)
    }

    fn on_complete(&self) {
        let _ = self.target.close();
    }

    fn on_error(&self, failure: Failure) {
        let _ = self.target.fail(failure);
    }
}

impl<T> fmt::Debug for Inlet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inlet")
            .field("port", &self.target.name())
            .finish()
    }
}
