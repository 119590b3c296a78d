// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::node::{Dataflow, Node, NodeCore, NodeKind, Terminal};
use crate::outputs::{Delivery, Promise, StreamOutput};
use crate::ports::{ConstantPort, PermitPort, ScalarPort, StreamPort};
use crate::traits::{Action, Executor, Flow, FnAction, Token};

/// Assembles a node: declare its ports and outputs, then hand over the action
/// that owns them.
///
/// ```no_run
/// use dagwood_flow::node::Dataflow;
/// use dagwood_flow::traits::Flow;
///
/// let dataflow = Dataflow::new("demo");
/// let builder = dataflow.procedure("sum");
/// let a = builder.scalar::<i64>("a");
/// let b = builder.scalar::<i64>("b");
/// let result = builder.promise::<i64>("result");
/// let (a_in, b_in) = (a.inlet(), b.inlet());
///
/// let out = result.clone();
/// builder.build_fn(move || {
///     out.complete(a.consume()? + b.consume()?)?;
///     Ok(Flow::Stop)
/// });
///
/// a_in.post(1).unwrap();
/// b_in.post(2).unwrap();
/// assert_eq!(result.wait().unwrap(), 3);
/// ```
pub struct NodeBuilder {
    core: Arc<NodeCore>,
}

impl NodeBuilder {
    pub fn procedure(dataflow: &Dataflow, name: impl Into<String>) -> Self {
        Self::new(dataflow, name.into(), NodeKind::Procedure)
    }

    pub fn actor(dataflow: &Dataflow, name: impl Into<String>) -> Self {
        Self::new(dataflow, name.into(), NodeKind::Actor)
    }

    fn new(dataflow: &Dataflow, name: String, kind: NodeKind) -> Self {
        Self {
            core: NodeCore::new(name, kind, dataflow.clone()),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Overrides the executor inherited from the dataflow.
    pub fn executor(&self, executor: Arc<dyn Executor>) -> &Self {
        self.core.set_executor(executor);
        self
    }

    pub fn scalar<T: Token>(&self, name: &str) -> ScalarPort<T> {
        ScalarPort::attach(&self.core, name)
    }

    /// A constant port that blocks until its inlet posts the value once.
    pub fn constant<T: Token>(&self, name: &str) -> ConstantPort<T> {
        ConstantPort::attach(&self.core, name, None)
    }

    pub fn constant_with<T: Token>(&self, name: &str, value: T) -> ConstantPort<T> {
        ConstantPort::attach(&self.core, name, Some(value))
    }

    /// A stream port with the dataflow's default capacity.
    pub fn stream<T: Token>(&self, name: &str) -> StreamPort<T> {
        let defaults = self.core.parent().stream_defaults();
        self.stream_port(name, defaults.default_capacity)
    }

    pub fn bounded_stream<T: Token>(&self, name: &str, capacity: usize) -> StreamPort<T> {
        self.stream_port(name, Some(capacity.max(1)))
    }

    /// A stream port whose close completes the actor once it is drained.
    pub fn primary<T: Token>(&self, name: &str) -> StreamPort<T> {
        let defaults = self.core.parent().stream_defaults();
        self.primary_stream(name, defaults.default_capacity)
    }

    pub fn primary_stream<T: Token>(&self, name: &str, capacity: Option<usize>) -> StreamPort<T> {
        let port = self.stream_port(name, capacity);
        self.core.set_primary(port.drainable());
        port
    }

    fn stream_port<T: Token>(&self, name: &str, capacity: Option<usize>) -> StreamPort<T> {
        let window = self.core.parent().stream_defaults().request_window;
        StreamPort::attach(&self.core, name, capacity, window)
    }

    pub fn permit(&self, name: &str, initial: i64) -> PermitPort {
        PermitPort::attach(&self.core, name, initial)
    }

    /// A promise terminated with the node: closed if still pending on completion,
    /// failed with the node's failure.
    pub fn promise<T: Token>(&self, name: &str) -> Promise<T> {
        let promise = Promise::new(format!("{}.{}", self.core.name(), name));
        self.core
            .register_output(Arc::new(promise.clone()) as Arc<dyn Terminal>);
        promise
    }

    /// A stream output terminated with the node.
    pub fn stream_output<T: Token>(&self, name: &str, delivery: Delivery) -> StreamOutput<T> {
        let output = StreamOutput::new(format!("{}.{}", self.core.name(), name), delivery);
        self.core
            .register_output(Arc::new(output.clone()) as Arc<dyn Terminal>);
        output
    }

    /// A stream output that is also a readiness slot: the node only fires while
    /// a post would be accepted. The output keeps the node alive until it is
    /// closed or failed.
    pub fn gated_stream_output<T: Token>(&self, name: &str, delivery: Delivery) -> StreamOutput<T> {
        let output = self.stream_output(name, delivery);
        let index = self.core.register_slot(name, output.is_ready());
        output.attach_gate(&self.core, index);
        output
    }

    /// Installs `action` and starts the node.
    pub fn build<A: Action>(self, action: A) -> Node {
        let node = self.build_paused(action);
        node.start();
        node
    }

    /// Installs `action` without starting; call [`Node::start`] later.
    pub fn build_paused<A: Action>(self, action: A) -> Node {
        self.core.install(Box::new(action));
        self.core.parent().enter();
        Node::from_core(self.core)
    }

    pub fn build_fn<F>(self, f: F) -> Node
    where
        F: FnMut() -> anyhow::Result<Flow> + Send + 'static,
    {
        self.build(FnAction::new(f))
    }
}
