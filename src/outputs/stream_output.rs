// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::errors::{Failure, FlowError};
use crate::node::{NodeCore, Terminal};
use crate::observability::messages::port::{DeliveryFailed, OutputSettled};
use crate::observability::messages::StructuredLog;
use crate::outputs::{DemandTarget, Subscription, UNBOUNDED};
use crate::traits::{Subscriber, Token};

/// How a [`StreamOutput`] hands a value to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Every subscriber receives every value; posting needs demand from all of them.
    #[default]
    Broadcast,
    /// Each value goes to exactly one subscriber with demand, rotating fairly.
    RoundRobin,
}

struct Entry<T> {
    id: u64,
    subscriber: Arc<dyn Subscriber<T>>,
    demand: u64,
}

enum Phase {
    Open,
    Closed,
    Failed(Failure),
}

/// Slot on the producing node that mirrors "a post would be accepted right now".
/// Holds the node alive until the output settles.
struct Gate {
    core: Arc<NodeCore>,
    index: usize,
}

struct OutputState<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
    cursor: usize,
    phase: Phase,
    gate: Option<Gate>,
}

impl<T> OutputState<T> {
    fn can_accept(&self, delivery: Delivery) -> bool {
        if !matches!(self.phase, Phase::Open) {
            return false;
        }
        match delivery {
            Delivery::Broadcast => {
                !self.entries.is_empty() && self.entries.iter().all(|e| e.demand > 0)
            }
            Delivery::RoundRobin => self.entries.iter().any(|e| e.demand > 0),
        }
    }
}

struct OutputShared<T> {
    name: String,
    delivery: Delivery,
    state: Mutex<OutputState<T>>,
}

impl<T: Token> OutputShared<T> {
    /// Pushes the current acceptance state into the gate slot. Returns the node to
    /// dispatch if that made it fire.
    fn refresh_gate(&self, state: &OutputState<T>) -> Option<Arc<NodeCore>> {
        let gate = state.gate.as_ref()?;
        if gate.core.update(gate.index, state.can_accept(self.delivery)) {
            Some(Arc::clone(&gate.core))
        } else {
            None
        }
    }
}

impl<T: Token> DemandTarget for OutputShared<T> {
    fn request(&self, id: u64, n: u64) -> Result<(), FlowError> {
        if n == 0 {
            return Err(FlowError::protocol(&self.name, "request(0) is not allowed"));
        }
        let dispatch = {
            let mut state = self.state.lock();
            let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
                return Ok(());
            };
            entry.demand = entry.demand.saturating_add(n);
            self.refresh_gate(&state)
        };
        if let Some(core) = dispatch {
            core.dispatch();
        }
        Ok(())
    }

    fn cancel(&self, id: u64) {
        let dispatch = {
            let mut state = self.state.lock();
            state.entries.retain(|e| e.id != id);
            if state.cursor >= state.entries.len() {
                state.cursor = 0;
            }
            self.refresh_gate(&state)
        };
        if let Some(core) = dispatch {
            core.dispatch();
        }
    }
}

/// Multi-shot distributor with per-subscription demand.
///
/// A post that no subscriber can currently accept is a `ProtocolViolation`
/// returned to the poster. Producers either check [`is_ready`](StreamOutput::is_ready)
/// or build the output as a gated port of their node, which keeps the node from
/// firing until a post would be accepted.
pub struct StreamOutput<T> {
    shared: Arc<OutputShared<T>>,
}

impl<T> Clone for StreamOutput<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Token> StreamOutput<T> {
    pub fn new(name: impl Into<String>, delivery: Delivery) -> Self {
        Self {
            shared: Arc::new(OutputShared {
                name: name.into(),
                delivery,
                state: Mutex::new(OutputState {
                    entries: Vec::new(),
                    next_id: 0,
                    cursor: 0,
                    phase: Phase::Open,
                    gate: None,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn delivery(&self) -> Delivery {
        self.shared.delivery
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// True if a `post` would be accepted right now.
    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().can_accept(self.shared.delivery)
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self.shared.state.lock().phase, Phase::Open)
    }

    /// Adds a subscriber. An open output hands it a [`Subscription`] through
    /// `on_subscribe`; a terminated one replays the terminal signal instead.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) -> Option<Subscription> {
        let joined = {
            let mut state = self.shared.state.lock();
            let terminal = match &state.phase {
                Phase::Open => None,
                Phase::Closed => Some(None),
                Phase::Failed(failure) => Some(Some(Arc::clone(failure))),
            };
            match terminal {
                Some(replay) => Err(replay),
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.entries.push(Entry {
                        id,
                        subscriber: Arc::clone(&subscriber),
                        demand: 0,
                    });
                    Ok((id, self.shared.refresh_gate(&state)))
                }
            }
        };

        match joined {
            Ok((id, dispatch)) => {
                if let Some(core) = dispatch {
                    core.dispatch();
                }
                let shared: Weak<OutputShared<T>> = Arc::downgrade(&self.shared);
                let target: Weak<dyn DemandTarget> = shared;
                let subscription = Subscription::new(id, target);
                subscriber.on_subscribe(subscription.clone());
                Some(subscription)
            }
            Err(None) => {
                subscriber.on_complete();
                None
            }
            Err(Some(failure)) => {
                subscriber.on_error(failure);
                None
            }
        }
    }

    pub fn post(&self, item: T) -> Result<(), FlowError> {
        let (targets, dispatch) = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if !matches!(state.phase, Phase::Open) {
                return Err(FlowError::state(self.name(), "posted after close"));
            }
            let targets: Vec<Arc<dyn Subscriber<T>>> = match self.shared.delivery {
                Delivery::Broadcast => {
                    if state.entries.is_empty() || state.entries.iter().any(|e| e.demand == 0) {
                        return Err(FlowError::protocol(
                            self.name(),
                            "not every subscriber has outstanding demand",
                        ));
                    }
                    state
                        .entries
                        .iter_mut()
                        .map(|entry| {
                            take_demand(entry);
                            Arc::clone(&entry.subscriber)
                        })
                        .collect()
                }
                Delivery::RoundRobin => {
                    let count = state.entries.len();
                    let pick = (0..count)
                        .map(|offset| (state.cursor + offset) % count)
                        .find(|&i| state.entries[i].demand > 0);
                    let Some(index) = pick else {
                        return Err(FlowError::protocol(
                            self.name(),
                            "no subscriber has outstanding demand",
                        ));
                    };
                    state.cursor = (index + 1) % count;
                    let entry = &mut state.entries[index];
                    take_demand(entry);
                    vec![Arc::clone(&entry.subscriber)]
                }
            };
            (targets, self.shared.refresh_gate(state))
        };

        if let Some(core) = dispatch {
            core.dispatch();
        }
        for subscriber in targets {
            if let Err(error) = subscriber.on_next(item.clone()) {
                DeliveryFailed {
                    distributor: self.name(),
                    error: &error,
                }
                .log();
            }
        }
        Ok(())
    }

    /// Closes the output. A second close (or close after fail) is a `StateViolation`.
    pub fn close(&self) -> Result<(), FlowError> {
        let subscribers = self.settle(Phase::Closed)?;
        for subscriber in subscribers {
            subscriber.on_complete();
        }
        Ok(())
    }

    pub fn fail(&self, failure: Failure) -> Result<(), FlowError> {
        let subscribers = self.settle(Phase::Failed(Arc::clone(&failure)))?;
        for subscriber in subscribers {
            subscriber.on_error(Arc::clone(&failure));
        }
        Ok(())
    }

    /// Releasing the gate leaves its slot ready, so a producer blocked on demand
    /// runs once more and can observe [`is_closed`](StreamOutput::is_closed).
    fn settle(&self, phase: Phase) -> Result<Vec<Arc<dyn Subscriber<T>>>, FlowError> {
        let (subscribers, label, dispatch) = {
            let mut state = self.shared.state.lock();
            if !matches!(state.phase, Phase::Open) {
                return Err(FlowError::state(self.name(), "already closed"));
            }
            let label = match phase {
                Phase::Failed(_) => "failed",
                _ => "closed",
            };
            state.phase = phase;
            let dispatch = state
                .gate
                .take()
                .filter(|gate| gate.core.update(gate.index, true))
                .map(|gate| gate.core);
            let subscribers: Vec<_> = state
                .entries
                .drain(..)
                .map(|entry| entry.subscriber)
                .collect();
            (subscribers, label, dispatch)
        };
        if let Some(core) = dispatch {
            core.dispatch();
        }
        OutputSettled {
            distributor: self.name(),
            outcome: label,
            subscribers: subscribers.len(),
        }
        .log();
        Ok(subscribers)
    }

    /// Registers this output as a readiness slot of its producing node.
    pub(crate) fn attach_gate(&self, core: &Arc<NodeCore>, index: usize) {
        self.shared.state.lock().gate = Some(Gate {
            core: Arc::clone(core),
            index,
        });
    }
}

fn take_demand<T>(entry: &mut Entry<T>) {
    if entry.demand != UNBOUNDED {
        entry.demand -= 1;
    }
}

impl<T: Token> Terminal for StreamOutput<T> {
    fn terminate(&self, failure: Option<&Failure>) {
        let _ = match failure {
            None => self.close(),
            Some(failure) => self.fail(Arc::clone(failure)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::failure;
    use crate::traits::{FnSubscriber, Signal};

    /// Records signals and requests `initial` on subscribe.
    struct Recorder {
        initial: u64,
        seen: Mutex<Vec<String>>,
        subscription: Mutex<Option<Subscription>>,
    }

    impl Recorder {
        fn new(initial: u64) -> Arc<Self> {
            Arc::new(Self {
                initial,
                seen: Mutex::new(Vec::new()),
                subscription: Mutex::new(None),
            })
        }

        fn request(&self, n: u64) {
            let subscription = self.subscription.lock().clone();
            subscription.unwrap().request(n).unwrap();
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl Subscriber<i32> for Recorder {
        fn on_subscribe(&self, subscription: Subscription) {
            if self.initial > 0 {
                subscription.request(self.initial).unwrap();
            }
            *self.subscription.lock() = Some(subscription);
        }

        fn on_next(&self, item: i32) -> Result<(), FlowError> {
            self.seen.lock().push(item.to_string());
            Ok(())
        }

        fn on_complete(&self) {
            self.seen.lock().push("complete".into());
        }

        fn on_error(&self, failure: Failure) {
            self.seen.lock().push(format!("error:{failure}"));
        }
    }

    #[test]
    fn test_post_without_demand_is_protocol_violation() {
        let output = StreamOutput::new("numbers", Delivery::Broadcast);
        assert!(matches!(
            output.post(1),
            Err(FlowError::ProtocolViolation { .. })
        ));

        let recorder = Recorder::new(0);
        output.subscribe(recorder.clone());
        assert!(!output.is_ready());
        assert!(output.post(1).is_err());

        recorder.request(1);
        output.post(1).unwrap();
        assert!(output.post(2).is_err());
        assert_eq!(recorder.seen(), vec!["1"]);
    }

    #[test]
    fn test_request_zero_is_rejected() {
        let output: StreamOutput<i32> = StreamOutput::new("numbers", Delivery::Broadcast);
        let recorder = Recorder::new(0);
        let subscription = output.subscribe(recorder).unwrap();
        assert!(matches!(
            subscription.request(0),
            Err(FlowError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_broadcast_needs_every_subscriber() {
        let output = StreamOutput::new("fanout", Delivery::Broadcast);
        let fast = Recorder::new(UNBOUNDED);
        let slow = Recorder::new(1);
        output.subscribe(fast.clone());
        output.subscribe(slow.clone());

        output.post(1).unwrap();
        assert!(!output.is_ready());
        assert!(output.post(2).is_err());

        slow.request(1);
        output.post(2).unwrap();

        assert_eq!(fast.seen(), vec!["1", "2"]);
        assert_eq!(slow.seen(), vec!["1", "2"]);
    }

    #[test]
    fn test_round_robin_rotates_between_subscribers() {
        let output = StreamOutput::new("work", Delivery::RoundRobin);
        let a = Recorder::new(UNBOUNDED);
        let b = Recorder::new(UNBOUNDED);
        output.subscribe(a.clone());
        output.subscribe(b.clone());

        for i in 1..=4 {
            output.post(i).unwrap();
        }

        assert_eq!(a.seen(), vec!["1", "3"]);
        assert_eq!(b.seen(), vec!["2", "4"]);
    }

    #[test]
    fn test_round_robin_skips_subscribers_without_demand() {
        let output = StreamOutput::new("work", Delivery::RoundRobin);
        let idle = Recorder::new(0);
        let busy = Recorder::new(2);
        output.subscribe(idle.clone());
        output.subscribe(busy.clone());

        output.post(1).unwrap();
        output.post(2).unwrap();
        assert!(output.post(3).is_err());

        assert!(idle.seen().is_empty());
        assert_eq!(busy.seen(), vec!["1", "2"]);
    }

    #[test]
    fn test_cancelled_subscription_receives_nothing() {
        let output = StreamOutput::new("numbers", Delivery::RoundRobin);
        let recorder = Recorder::new(UNBOUNDED);
        let subscription = output.subscribe(recorder.clone()).unwrap();
        subscription.cancel();

        assert_eq!(output.subscriber_count(), 0);
        assert!(output.post(1).is_err());
        output.close().unwrap();
        assert!(recorder.seen().is_empty());
    }

    #[test]
    fn test_double_close_is_state_violation() {
        let output: StreamOutput<i32> = StreamOutput::new("numbers", Delivery::Broadcast);
        let recorder = Recorder::new(1);
        output.subscribe(recorder.clone());

        output.close().unwrap();
        assert!(matches!(
            output.close(),
            Err(FlowError::StateViolation { .. })
        ));
        assert!(matches!(
            output.post(1),
            Err(FlowError::StateViolation { .. })
        ));
        assert_eq!(recorder.seen(), vec!["complete"]);
    }

    #[test]
    fn test_late_subscriber_sees_terminal_signal() {
        let output: StreamOutput<i32> = StreamOutput::new("numbers", Delivery::Broadcast);
        output.fail(failure(anyhow::anyhow!("source gone"))).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = output.subscribe(Arc::new(FnSubscriber::new(
            move |signal: Signal<i32>| {
                if let Signal::Error(e) = signal {
                    sink.lock().push(e.to_string());
                }
            },
        )));

        assert!(subscription.is_none());
        assert_eq!(*seen.lock(), vec!["source gone"]);
    }
}
