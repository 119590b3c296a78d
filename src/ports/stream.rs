// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{Failure, FlowError};
use crate::node::{Drainable, NodeCore};
use crate::outputs::Subscription;
use crate::ports::{dispatch, End, Inlet, InletTarget, PortLink};
use crate::traits::Token;

struct StreamState<T> {
    queue: VecDeque<T>,
    end: End,
    /// Tokens at the head that were pushed back; their demand was already re-requested.
    held: usize,
    /// The end was handed to the owner by a `consume` on the drained queue.
    end_delivered: bool,
    subscription: Option<Subscription>,
}

impl<T> StreamState<T> {
    fn is_ready(&self) -> bool {
        !self.queue.is_empty() || !self.end.is_open()
    }
}

struct StreamCell<T> {
    name: String,
    capacity: Option<usize>,
    window: u64,
    link: PortLink,
    state: Mutex<StreamState<T>>,
}

impl<T: Token> StreamCell<T> {
    fn consume(&self) -> Result<Option<T>, FlowError> {
        let (token, node, refill) = {
            let mut state = self.state.lock();
            let Some(token) = state.queue.pop_front() else {
                let end = state.end.clone();
                state.end_delivered = !end.is_open();
                return match end {
                    End::Closed => Ok(None),
                    End::Failed(failure) => Err(FlowError::Upstream(failure)),
                    End::Open => Err(FlowError::state(&self.name, "consumed while empty")),
                };
            };
            let refill = if state.held > 0 {
                state.held -= 1;
                None
            } else if state.end.is_open() {
                state.subscription.clone()
            } else {
                None
            };
            let node = if state.is_ready() {
                None
            } else {
                self.link.set_ready(false)
            };
            (token, node, refill)
        };
        dispatch(node);
        if let Some(subscription) = refill {
            let _ = subscription.request(1);
        }
        Ok(Some(token))
    }

    fn pushback(&self, token: T) {
        let node = {
            let mut state = self.state.lock();
            state.queue.push_front(token);
            state.held += 1;
            self.link.set_ready(true)
        };
        dispatch(node);
    }

    fn terminate(&self, end: End) -> Result<(), FlowError> {
        let node = {
            let mut state = self.state.lock();
            if !state.end.is_open() {
                return Ok(());
            }
            state.end = end;
            self.link.set_ready(true)
        };
        dispatch(node);
        Ok(())
    }
}

impl<T: Token> InletTarget<T> for StreamCell<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, token: T) -> Result<(), FlowError> {
        let node = {
            let mut state = self.state.lock();
            if !state.end.is_open() {
                return Err(FlowError::state(&self.name, "posted after close"));
            }
            if let Some(capacity) = self.capacity {
                if state.queue.len().saturating_sub(state.held) >= capacity {
                    return Err(FlowError::capacity(
                        &self.name,
                        format!("stream is at capacity ({capacity})"),
                    ));
                }
            }
            state.queue.push_back(token);
            if state.queue.len() == 1 {
                self.link.set_ready(true)
            } else {
                None
            }
        };
        dispatch(node);
        Ok(())
    }

    fn close(&self) -> Result<(), FlowError> {
        self.terminate(End::Closed)
    }

    fn fail(&self, failure: Failure) -> Result<(), FlowError> {
        self.terminate(End::Failed(failure))
    }

    fn attach(&self, subscription: Subscription) {
        let request = {
            let mut state = self.state.lock();
            state.subscription = Some(subscription.clone());
            match self.capacity {
                Some(capacity) => capacity.saturating_sub(state.queue.len()) as u64,
                None => self.window,
            }
        };
        if request > 0 {
            let _ = subscription.request(request);
        }
    }
}

impl<T: Token> Drainable for StreamCell<T> {
    fn end_delivered(&self) -> bool {
        self.state.lock().end_delivered
    }
}

/// Owner side of a FIFO port with an explicit end-of-stream.
///
/// `consume` returns `Ok(None)` once the port is closed and drained, and
/// `Err(FlowError::Upstream)` once it failed and drained.
pub struct StreamPort<T> {
    cell: Arc<StreamCell<T>>,
}

impl<T: Token> StreamPort<T> {
    /// `capacity` of `None` means unbounded; `window` is the demand requested
    /// from an upstream output when unbounded.
    pub(crate) fn attach(
        core: &Arc<NodeCore>,
        name: &str,
        capacity: Option<usize>,
        window: u64,
    ) -> Self {
        Self {
            cell: Arc::new(StreamCell {
                link: PortLink::register(core, name, false),
                name: format!("{}.{}", core.name(), name),
                capacity,
                window: window.max(1),
                state: Mutex::new(StreamState {
                    queue: VecDeque::new(),
                    end: End::Open,
                    held: 0,
                    end_delivered: false,
                    subscription: None,
                }),
            }),
        }
    }

    pub(crate) fn drainable(&self) -> Arc<dyn Drainable> {
        Arc::clone(&self.cell) as Arc<dyn Drainable>
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn capacity(&self) -> Option<usize> {
        self.cell.capacity
    }

    pub fn inlet(&self) -> Inlet<T> {
        Inlet::new(Arc::clone(&self.cell) as Arc<dyn InletTarget<T>>)
    }

    /// The head token, if any.
    pub fn current(&self) -> Option<T> {
        self.cell.state.lock().queue.front().cloned()
    }

    pub fn consume(&self) -> Result<Option<T>, FlowError> {
        self.cell.consume()
    }

    /// Returns a token to the head of the queue for the next run.
    pub fn pushback(&self, token: T) {
        self.cell.pushback(token);
    }

    pub fn len(&self) -> usize {
        self.cell.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ready(&self) -> bool {
        self.cell.state.lock().is_ready()
    }

    pub fn is_closed(&self) -> bool {
        !self.cell.state.lock().end.is_open()
    }

    /// Closed (or failed) with nothing left to consume.
    pub fn is_drained(&self) -> bool {
        let state = self.cell.state.lock();
        state.queue.is_empty() && !state.end.is_open()
    }
}
