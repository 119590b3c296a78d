// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{Failure, FlowError};
use crate::node::NodeCore;
use crate::outputs::Subscription;
use crate::ports::{dispatch, End, Inlet, InletTarget, PortLink};
use crate::traits::Token;

struct ValueState<T> {
    value: Option<T>,
    end: End,
    pushback: bool,
    received: bool,
    subscription: Option<Subscription>,
}

impl<T> ValueState<T> {
    /// A port closed after its value was taken has nothing left to report and
    /// blocks the node like an empty open port.
    fn is_ready(&self) -> bool {
        match self.end {
            End::Open => self.value.is_some(),
            End::Closed => self.value.is_some() || !self.received,
            End::Failed(_) => true,
        }
    }
}

/// Storage for a single-value port. `reusable` distinguishes a constant port
/// (never re-blocks) from a scalar one.
struct ValueCell<T> {
    name: String,
    reusable: bool,
    link: PortLink,
    state: Mutex<ValueState<T>>,
}

impl<T: Token> ValueCell<T> {
    fn attach(core: &Arc<NodeCore>, name: &str, reusable: bool, initial: Option<T>) -> Arc<Self> {
        let label = format!("{}.{}", core.name(), name);
        Arc::new(Self {
            link: PortLink::register(core, name, initial.is_some()),
            name: label,
            reusable,
            state: Mutex::new(ValueState {
                received: initial.is_some(),
                value: initial,
                end: End::Open,
                pushback: false,
                subscription: None,
            }),
        })
    }

    fn current(&self) -> Result<T, FlowError> {
        let state = self.state.lock();
        match (&state.value, &state.end) {
            (Some(value), _) => Ok(value.clone()),
            (None, End::Failed(failure)) => Err(FlowError::Upstream(Arc::clone(failure))),
            (None, End::Closed) => Err(FlowError::state(&self.name, "closed without a value")),
            (None, End::Open) => Err(FlowError::state(&self.name, "port is empty")),
        }
    }

    fn consume(&self) -> Result<T, FlowError> {
        let (value, node, refill) = {
            let mut state = self.state.lock();
            if self.reusable || state.pushback {
                if let Some(value) = state.value.clone() {
                    state.pushback = false;
                    return Ok(value);
                }
                drop(state);
                return self.current();
            }
            let Some(value) = state.value.take() else {
                drop(state);
                return self.current();
            };
            let node = if state.is_ready() {
                None
            } else {
                self.link.set_ready(false)
            };
            let refill = if state.end.is_open() {
                state.subscription.clone()
            } else {
                None
            };
            (value, node, refill)
        };
        dispatch(node);
        if let Some(subscription) = refill {
            let _ = subscription.request(1);
        }
        Ok(value)
    }

    fn pushback(&self) -> Result<(), FlowError> {
        let mut state = self.state.lock();
        if state.value.is_none() {
            return Err(FlowError::state(&self.name, "pushback without a value"));
        }
        if state.pushback {
            return Err(FlowError::state(&self.name, "pushback already requested"));
        }
        state.pushback = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state.lock().is_ready()
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().end.is_open()
    }

    fn terminate(&self, end: End) -> Result<(), FlowError> {
        let node = {
            let mut state = self.state.lock();
            if !state.end.is_open() {
                return Ok(());
            }
            state.end = end;
            self.link.set_ready(state.is_ready())
        };
        dispatch(node);
        Ok(())
    }
}

impl<T: Token> InletTarget<T> for ValueCell<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, token: T) -> Result<(), FlowError> {
        let node = {
            let mut state = self.state.lock();
            if !state.end.is_open() {
                return Err(FlowError::state(&self.name, "posted after close"));
            }
            if state.value.is_some() {
                return Err(FlowError::capacity(&self.name, "port already holds a value"));
            }
            state.value = Some(token);
            state.received = true;
            self.link.set_ready(true)
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
        let wants_value = {
            let mut state = self.state.lock();
            state.subscription = Some(subscription.clone());
            state.value.is_none() && state.end.is_open()
        };
        if wants_value {
            let _ = subscription.request(1);
        }
    }
}

/// Owner side of a port that holds one consumable value.
///
/// Consuming empties the port and blocks the node again, unless
/// [`pushback`](ScalarPort::pushback) was requested first.
pub struct ScalarPort<T> {
    cell: Arc<ValueCell<T>>,
}

impl<T: Token> ScalarPort<T> {
    pub(crate) fn attach(core: &Arc<NodeCore>, name: &str) -> Self {
        Self {
            cell: ValueCell::attach(core, name, false, None),
        }
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn inlet(&self) -> Inlet<T> {
        Inlet::new(Arc::clone(&self.cell) as Arc<dyn InletTarget<T>>)
    }

    /// Peeks at the value without consuming it.
    pub fn current(&self) -> Result<T, FlowError> {
        self.cell.current()
    }

    /// Takes the value. A closed port yields a `StateViolation`, a failed one the
    /// upstream failure.
    pub fn consume(&self) -> Result<T, FlowError> {
        self.cell.consume()
    }

    /// Keep the current value for the next run: the next `consume` returns a copy.
    pub fn pushback(&self) -> Result<(), FlowError> {
        self.cell.pushback()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.is_ready()
    }

    pub fn is_closed(&self) -> bool {
        self.cell.is_closed()
    }
}

/// Owner side of a port holding one reusable value. Once set it never blocks the
/// node again.
pub struct ConstantPort<T> {
    cell: Arc<ValueCell<T>>,
}

impl<T: Token> ConstantPort<T> {
    pub(crate) fn attach(core: &Arc<NodeCore>, name: &str, initial: Option<T>) -> Self {
        Self {
            cell: ValueCell::attach(core, name, true, initial),
        }
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn inlet(&self) -> Inlet<T> {
        Inlet::new(Arc::clone(&self.cell) as Arc<dyn InletTarget<T>>)
    }

    /// A copy of the value.
    pub fn current(&self) -> Result<T, FlowError> {
        self.cell.current()
    }

    /// Same as [`current`](ConstantPort::current); the value stays in place.
    pub fn consume(&self) -> Result<T, FlowError> {
        self.cell.consume()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.is_ready()
    }

    pub fn is_closed(&self) -> bool {
        self.cell.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DirectExecutor;
    use crate::errors::failure;
    use crate::node::Dataflow;

    fn detached_core(name: &str) -> Arc<NodeCore> {
        let dataflow = Dataflow::with_executor(Arc::new(DirectExecutor::new()));
        NodeCore::new(name.to_string(), crate::node::NodeKind::Procedure, dataflow)
    }

    #[test]
    fn test_scalar_post_twice_is_capacity_violation() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        let inlet = port.inlet();

        inlet.post(1).unwrap();
        assert!(matches!(
            inlet.post(2),
            Err(FlowError::CapacityViolation { .. })
        ));
        assert_eq!(port.consume().unwrap(), 1);
        assert!(!port.is_ready());
        inlet.post(2).unwrap();
        assert_eq!(port.consume().unwrap(), 2);
    }

    #[test]
    fn test_scalar_pushback_retains_value() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        port.inlet().post(5).unwrap();

        port.pushback().unwrap();
        assert!(port.pushback().is_err());
        assert_eq!(port.consume().unwrap(), 5);
        assert!(port.is_ready());
        assert_eq!(port.consume().unwrap(), 5);
        assert!(!port.is_ready());
    }

    #[test]
    fn test_scalar_close_makes_port_ready() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        let inlet = port.inlet();

        inlet.close().unwrap();
        inlet.close().unwrap();
        assert!(port.is_ready());
        assert!(port.is_closed());
        assert!(matches!(
            port.consume(),
            Err(FlowError::StateViolation { .. })
        ));
        assert!(matches!(
            inlet.post(1),
            Err(FlowError::StateViolation { .. })
        ));
    }

    #[test]
    fn test_scalar_closed_after_consume_stays_blocked() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        let inlet = port.inlet();
        let node = crate::node::Node::from_core(Arc::clone(&core));

        inlet.post(7).unwrap();
        inlet.close().unwrap();
        assert!(port.is_ready());
        assert_eq!(port.consume().unwrap(), 7);
        assert!(!port.is_ready());
        assert!(port.is_closed());
        assert_eq!(node.blocked_ports(), 1);
    }

    #[test]
    fn test_scalar_closed_after_taken_value_stays_blocked() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        let inlet = port.inlet();

        inlet.post(7).unwrap();
        assert_eq!(port.consume().unwrap(), 7);
        inlet.close().unwrap();
        assert!(!port.is_ready());
        assert!(port.is_closed());
    }

    #[test]
    fn test_scalar_failure_surfaces_as_upstream() {
        let core = detached_core("sum");
        let port: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        port.inlet().fail(failure(anyhow::anyhow!("bad"))).unwrap();
        assert!(matches!(port.consume(), Err(FlowError::Upstream(_))));
    }

    #[test]
    fn test_constant_never_reblocks() {
        let core = detached_core("scale");
        let port = ConstantPort::attach(&core, "factor", Some(3));
        assert!(port.is_ready());
        for _ in 0..3 {
            assert_eq!(port.consume().unwrap(), 3);
        }
        assert!(port.is_ready());
        assert!(matches!(
            port.inlet().post(4),
            Err(FlowError::CapacityViolation { .. })
        ));
    }

    #[test]
    fn test_slot_tracks_readiness() {
        let core = detached_core("sum");
        let a: ScalarPort<i32> = ScalarPort::attach(&core, "a");
        let _b: ScalarPort<i32> = ScalarPort::attach(&core, "b");
        let node = crate::node::Node::from_core(Arc::clone(&core));
        assert_eq!(node.blocked_ports(), 2);

        a.inlet().post(1).unwrap();
        assert_eq!(node.blocked_ports(), 1);
        a.consume().unwrap();
        assert_eq!(node.blocked_ports(), 2);
    }
}
