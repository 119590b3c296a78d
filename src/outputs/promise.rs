// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Condvar, Mutex};
use tokio::sync::oneshot;

use crate::errors::{Failure, FlowError};
use crate::node::Terminal;
use crate::observability::messages::port::{DeliveryFailed, OutputSettled};
use crate::observability::messages::StructuredLog;
use crate::outputs::Subscription;
use crate::traits::{Completable, Subscriber, Token};

/// Terminal state of a [`Promise`].
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Value(T),
    Failed(Failure),
    /// Closed without a value.
    Closed,
}

impl<T> Outcome<T> {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Value(_) => "value",
            Outcome::Failed(_) => "failed",
            Outcome::Closed => "closed",
        }
    }
}

struct PromiseState<T> {
    outcome: Option<Outcome<T>>,
    subscribers: Vec<Arc<dyn Subscriber<T>>>,
    waiters: Vec<oneshot::Sender<Outcome<T>>>,
}

struct PromiseShared<T> {
    name: String,
    state: Mutex<PromiseState<T>>,
    settled: Condvar,
}

/// One-shot distributor.
///
/// Exactly one of [`complete`](Promise::complete), [`fail`](Promise::fail) or
/// [`close`](Promise::close) succeeds; later calls return a `StateViolation` and
/// have no effect on subscribers. The outcome is replayed to anyone subscribing
/// after it settled.
pub struct Promise<T> {
    shared: Arc<PromiseShared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Token> Promise<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(PromiseShared {
                name: name.into(),
                state: Mutex::new(PromiseState {
                    outcome: None,
                    subscribers: Vec::new(),
                    waiters: Vec::new(),
                }),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn complete(&self, value: T) -> Result<(), FlowError> {
        self.settle(Outcome::Value(value))
    }

    pub fn fail(&self, failure: Failure) -> Result<(), FlowError> {
        self.settle(Outcome::Failed(failure))
    }

    pub fn close(&self) -> Result<(), FlowError> {
        self.settle(Outcome::Closed)
    }

    /// Current outcome, if settled.
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.shared.state.lock().outcome.clone()
    }

    pub fn is_settled(&self) -> bool {
        self.shared.state.lock().outcome.is_some()
    }

    /// Registers `subscriber`, or replays the outcome right away if already settled.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let replay = {
            let mut state = self.shared.state.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.subscribers.push(subscriber);
                    return;
                }
            }
        };
        self.deliver(&subscriber, replay);
    }

    /// Blocks the calling thread until the promise settles.
    ///
    /// Not for use inside actions: it would hold an executor thread.
    pub fn wait(&self) -> Result<T, FlowError> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return self.resolve(outcome.clone());
            }
            self.shared.settled.wait(&mut state);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, FlowError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return self.resolve(outcome.clone());
            }
            if self
                .shared
                .settled
                .wait_until(&mut state, deadline)
                .timed_out()
                && state.outcome.is_none()
            {
                return Err(FlowError::Timeout(timeout));
            }
        }
    }

    /// Awaits the outcome without blocking a thread.
    pub async fn get(&self) -> Result<T, FlowError> {
        let receiver = {
            let mut state = self.shared.state.lock();
            if let Some(outcome) = &state.outcome {
                return self.resolve(outcome.clone());
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            receiver
        };
        match receiver.await {
            Ok(outcome) => self.resolve(outcome),
            Err(_) => Err(FlowError::state(
                self.name(),
                "promise dropped before settling",
            )),
        }
    }

    fn settle(&self, outcome: Outcome<T>) -> Result<(), FlowError> {
        let (subscribers, waiters) = {
            let mut state = self.shared.state.lock();
            if let Some(existing) = &state.outcome {
                return Err(FlowError::state(
                    self.name(),
                    format!("already settled ({})", existing.label()),
                ));
            }
            state.outcome = Some(outcome.clone());
            (
                std::mem::take(&mut state.subscribers),
                std::mem::take(&mut state.waiters),
            )
        };
        self.shared.settled.notify_all();

        OutputSettled {
            distributor: self.name(),
            outcome: outcome.label(),
            subscribers: subscribers.len(),
        }
        .log();

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        for subscriber in &subscribers {
            self.deliver(subscriber, outcome.clone());
        }
        Ok(())
    }

    fn deliver(&self, subscriber: &Arc<dyn Subscriber<T>>, outcome: Outcome<T>) {
        match outcome {
            Outcome::Value(value) => {
                if let Err(error) = subscriber.on_next(value) {
                    DeliveryFailed {
                        distributor: self.name(),
                        error: &error,
                    }
                    .log();
                }
                subscriber.on_complete();
            }
            Outcome::Failed(failure) => subscriber.on_error(failure),
            Outcome::Closed => subscriber.on_complete(),
        }
    }

    fn resolve(&self, outcome: Outcome<T>) -> Result<T, FlowError> {
        match outcome {
            Outcome::Value(value) => Ok(value),
            Outcome::Failed(failure) => Err(FlowError::Upstream(failure)),
            Outcome::Closed => Err(FlowError::state(self.name(), "closed without a value")),
        }
    }
}

impl<T: Token> Terminal for Promise<T> {
    fn terminate(&self, failure: Option<&Failure>) {
        // Already settled promises keep their outcome.
        let _ = match failure {
            None => self.close(),
            Some(failure) => self.fail(Arc::clone(failure)),
        };
    }
}

/// A promise can be subscribed to another distributor and takes its first value.
impl<T: Token> Subscriber<T> for Promise<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        let _ = subscription.request(1);
    }

    fn on_next(&self, item: T) -> Result<(), FlowError> {
        self.complete(item)
    }

    fn on_complete(&self) {
        let _ = self.close();
    }

    fn on_error(&self, failure: Failure) {
        let _ = self.fail(failure);
    }
}

#[async_trait]
impl<T: Token> Completable for Promise<T> {
    type Output = T;

    async fn finished(&self) -> Result<T, FlowError> {
        self.get().await
    }

    fn is_done(&self) -> bool {
        self.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::failure;
    use crate::traits::{FnSubscriber, Signal};
    use std::thread;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<dyn Subscriber<i32>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscriber = FnSubscriber::new(move |signal: Signal<i32>| {
            let entry = match signal {
                Signal::Next(v) => format!("next:{v}"),
                Signal::Complete => "complete".to_string(),
                Signal::Error(e) => format!("error:{e}"),
            };
            sink.lock().push(entry);
        });
        (seen, Arc::new(subscriber))
    }

    #[test]
    fn test_value_is_delivered_then_completed() {
        let promise = Promise::new("answer");
        let (seen, subscriber) = recorder();
        promise.subscribe(subscriber);

        promise.complete(42).unwrap();

        assert_eq!(*seen.lock(), vec!["next:42", "complete"]);
    }

    #[test]
    fn test_second_settle_is_rejected_without_effect() {
        let promise = Promise::new("answer");
        let (seen, subscriber) = recorder();
        promise.subscribe(subscriber);

        promise.complete(1).unwrap();
        let err = promise.complete(2).unwrap_err();
        assert!(matches!(err, FlowError::StateViolation { .. }));
        assert!(promise.close().is_err());
        assert!(promise.fail(failure(anyhow::anyhow!("late"))).is_err());

        assert_eq!(*seen.lock(), vec!["next:1", "complete"]);
        assert_eq!(promise.wait().unwrap(), 1);
    }

    #[test]
    fn test_failure_replays_to_late_subscriber() {
        let promise: Promise<i32> = Promise::new("broken");
        promise.fail(failure(anyhow::anyhow!("boom"))).unwrap();

        let (seen, subscriber) = recorder();
        promise.subscribe(subscriber);

        assert_eq!(*seen.lock(), vec!["error:boom"]);
        assert!(matches!(promise.wait(), Err(FlowError::Upstream(_))));
    }

    #[test]
    fn test_closed_promise_has_no_value() {
        let promise: Promise<i32> = Promise::new("empty");
        promise.close().unwrap();
        assert!(matches!(promise.outcome(), Some(Outcome::Closed)));
        assert!(matches!(
            promise.wait(),
            Err(FlowError::StateViolation { .. })
        ));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let promise: Promise<i32> = Promise::new("never");
        let err = promise.wait_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FlowError::Timeout(_)));
    }

    #[test]
    fn test_wait_unblocks_on_other_thread() {
        let promise = Promise::new("later");
        let producer = promise.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.complete(7).unwrap();
        });
        assert_eq!(promise.wait_timeout(Duration::from_secs(5)).unwrap(), 7);
        handle.join().unwrap();
    }

    #[test]
    fn test_terminate_keeps_existing_value() {
        let promise = Promise::new("kept");
        promise.complete(3).unwrap();
        Terminal::terminate(&promise, Some(&failure(anyhow::anyhow!("node failed"))));
        assert_eq!(promise.wait().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_async_get() {
        let promise = Promise::new("async");
        let producer = promise.clone();
        tokio::spawn(async move {
            producer.complete(11).unwrap();
        });
        assert_eq!(promise.get().await.unwrap(), 11);
        assert!(promise.is_done());
    }
}
