// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output distributors: fan values, errors and close signals out to subscribers.
//!
//! - [`Promise`] is one-shot and replays its terminal outcome to late subscribers.
//! - [`StreamOutput`] is multi-shot and only delivers to subscriptions that have
//!   requested demand.

mod promise;
mod stream_output;

pub use promise::{Outcome, Promise};
pub use stream_output::{Delivery, StreamOutput};

use std::fmt;
use std::sync::Weak;

use crate::errors::FlowError;

/// Demand value that is never decremented.
pub const UNBOUNDED: u64 = u64::MAX;

/// Implemented by distributors that track per-subscription demand.
pub(crate) trait DemandTarget: Send + Sync {
    fn request(&self, id: u64, n: u64) -> Result<(), FlowError>;
    fn cancel(&self, id: u64);
}

/// Handle given to a subscriber in `on_subscribe` to signal demand.
///
/// The handle does not keep the distributor alive; once the distributor is gone,
/// requests and cancels are no-ops.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    target: Weak<dyn DemandTarget>,
}

impl Subscription {
    pub(crate) fn new(id: u64, target: Weak<dyn DemandTarget>) -> Self {
        Self { id, target }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask for `n` more items. `request(0)` is a protocol violation.
    pub fn request(&self, n: u64) -> Result<(), FlowError> {
        match self.target.upgrade() {
            Some(target) => target.request(self.id, n),
            None => Ok(()),
        }
    }

    /// Stop receiving items. No terminal signal is delivered afterwards.
    pub fn cancel(&self) {
        if let Some(target) = self.target.upgrade() {
            target.cancel(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}
