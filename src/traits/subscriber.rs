// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{Failure, FlowError};
use crate::outputs::{Subscription, UNBOUNDED};

/// Anything that can travel through a port or a distributor.
///
/// `Clone` because distributors replay a terminal value to every subscriber and
/// pushback hands out a copy while retaining the original.
pub trait Token: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Token for T {}

/// Receiving side of the distributor contract.
///
/// Port inlets implement this, so a port can be subscribed directly to a
/// [`Promise`](crate::outputs::Promise) or a [`StreamOutput`](crate::outputs::StreamOutput).
pub trait Subscriber<T>: Send + Sync {
    /// Called by stream outputs before any item is delivered.
    ///
    /// The default grants unbounded demand, which suits subscribers that can absorb
    /// anything they are given.
    fn on_subscribe(&self, subscription: Subscription) {
        let _ = subscription.request(UNBOUNDED);
    }

    fn on_next(&self, item: T) -> Result<(), FlowError>;

    fn on_complete(&self);

    fn on_error(&self, failure: Failure);
}

/// One delivery seen by a [`FnSubscriber`].
#[derive(Debug, Clone)]
pub enum Signal<T> {
    Next(T),
    Complete,
    Error(Failure),
}

/// Closure-backed subscriber.
pub struct FnSubscriber<F> {
    f: F,
}

impl<F> FnSubscriber<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F> Subscriber<T> for FnSubscriber<F>
where
    F: Fn(Signal<T>) + Send + Sync,
{
    fn on_next(&self, item: T) -> Result<(), FlowError> {
        (self.f)(Signal::Next(item));
        Ok(())
    }

    fn on_complete(&self) {
        (self.f)(Signal::Complete);
    }

    fn on_error(&self, failure: Failure) {
        (self.f)(Signal::Error(failure));
    }
}
