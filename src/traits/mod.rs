pub mod action;
pub mod completable;
pub mod executor;
pub mod subscriber;

pub use action::{Action, Flow, FnAction};
pub use completable::Completable;
pub use executor::{Executor, Task};
pub use subscriber::{FnSubscriber, Signal, Subscriber, Token};
